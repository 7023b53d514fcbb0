use crate::player::PlayerKind;

/// Player action bound to a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Space
    TogglePlayPause,
    /// Left arrow
    SeekBackward,
    /// Right arrow
    SeekForward,
    /// Up arrow
    VolumeUp,
    /// Down arrow
    VolumeDown,
    /// `f`, video only
    ToggleFullscreen,
}

impl KeyAction {
    /// Action for a `KeyboardEvent.key` value, if the key is bound.
    pub fn from_key(key: &str, kind: PlayerKind) -> Option<Self> {
        match key {
            " " => Some(Self::TogglePlayPause),
            "ArrowLeft" => Some(Self::SeekBackward),
            "ArrowRight" => Some(Self::SeekForward),
            "ArrowUp" => Some(Self::VolumeUp),
            "ArrowDown" => Some(Self::VolumeDown),
            "f" if kind == PlayerKind::Video => Some(Self::ToggleFullscreen),
            _ => None,
        }
    }
}
