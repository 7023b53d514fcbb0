use crate::common::Property;

/// Playback state owned by the player.
///
/// Every field can be read synchronously or watched as a stream; only the
/// crate writes them.
#[derive(Debug, Clone)]
pub struct PlaybackState {
    /// `None` until the backend first reports readiness, then always known
    pub paused: Property<Option<bool>>,
    /// Whether output is muted
    pub muted: Property<bool>,
    /// Whether the player is presented fullscreen
    pub fullscreen: Property<bool>,
    /// Whether the backend is loading or buffering
    pub loading: Property<bool>,
}

impl PlaybackState {
    pub(crate) fn new(muted: bool) -> Self {
        Self {
            paused: Property::new(None),
            muted: Property::new(muted),
            fullscreen: Property::new(false),
            loading: Property::new(true),
        }
    }

    /// Point-in-time copy of every field.
    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            paused: self.paused.get(),
            muted: self.muted.get(),
            fullscreen: self.fullscreen.get(),
            loading: self.loading.get(),
        }
    }
}

/// Plain copy of [`PlaybackState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackSnapshot {
    /// Paused, or `None` before readiness
    pub paused: Option<bool>,
    /// Muted
    pub muted: bool,
    /// Fullscreen
    pub fullscreen: bool,
    /// Loading
    pub loading: bool,
}
