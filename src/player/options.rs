use std::{fmt, str::FromStr};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::dom::Element;

/// Kind of player, deciding defaults and which controls exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlayerKind {
    /// Audio-only player
    Audio,
    /// Video player with fullscreen, poster and big-play support
    #[default]
    Video,
}

impl PlayerKind {
    /// Kind implied by a media element tag, if any.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "audio" => Some(Self::Audio),
            "video" => Some(Self::Video),
            _ => None,
        }
    }

    /// Lowercase name, used in class names.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Video => "video",
        }
    }
}

impl fmt::Display for PlayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlayerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "audio" => Ok(Self::Audio),
            "video" => Ok(Self::Video),
            other => Err(format!("unknown player kind '{other}', expected audio or video")),
        }
    }
}

/// Resolved player options. Computed once at construction and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerOptions {
    /// Start playback once the backend is ready
    pub autoplay: bool,
    /// Render the control bar
    pub controls: bool,
    /// Show the play/pause button
    pub play_pause: bool,
    /// Show the progress slider
    pub progress_bar: bool,
    /// Show the time labels and track time updates
    pub time: bool,
    /// Show the volume button
    pub volume: bool,
    /// Restart from zero when playback ends
    #[serde(rename = "loop")]
    pub loop_playback: bool,
    /// Show the fullscreen button (video only)
    pub fullscreen: bool,
    /// Poster image shown before first start (video only)
    pub poster: Option<String>,
    /// Show the big play button (video only)
    pub big_play: bool,
    /// Hide the control bar during playback (video only)
    pub auto_hide: bool,
    /// Play inline on mobile (video only)
    pub playsinline: bool,
    /// Start muted (video only)
    pub muted: bool,
}

impl PlayerOptions {
    /// Defaults for a player kind.
    pub fn defaults(kind: PlayerKind) -> Self {
        let video = kind == PlayerKind::Video;
        Self {
            autoplay: false,
            controls: true,
            play_pause: true,
            progress_bar: true,
            time: true,
            volume: true,
            loop_playback: false,
            fullscreen: video,
            poster: None,
            big_play: video,
            auto_hide: false,
            playsinline: video,
            muted: false,
        }
    }

    /// Merges kind defaults, caller overrides and the target's attributes.
    ///
    /// A present boolean media attribute enables its option. The target is
    /// only read; [`PlayerOptions::write_attributes`] completes the sync in
    /// the other direction. `muted` and `playsinline` only apply to video.
    pub fn resolve(kind: PlayerKind, overrides: &OptionOverrides, target: &Element) -> Self {
        let mut options = Self::defaults(kind);
        options.apply(kind, overrides);

        options.autoplay |= target.has_attribute("autoplay");
        options.loop_playback |= target.has_attribute("loop");
        if kind == PlayerKind::Video {
            options.muted |= target.has_attribute("muted");
            options.playsinline |= target.has_attribute("playsinline");
        }

        options
    }

    /// Sets the boolean media attribute of every enabled synced option.
    pub fn write_attributes(&self, kind: PlayerKind, target: &Element) {
        let mut enabled = vec![("autoplay", self.autoplay), ("loop", self.loop_playback)];
        if kind == PlayerKind::Video {
            enabled.extend([("muted", self.muted), ("playsinline", self.playsinline)]);
        }

        for (attribute, on) in enabled {
            if on && !target.has_attribute(attribute) {
                target.set_attribute(attribute, "");
            }
        }
    }

    fn apply(&mut self, kind: PlayerKind, overrides: &OptionOverrides) {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if let Some(value) = overrides.$field {
                    self.$field = value;
                })*
            };
        }

        take!(autoplay, controls, play_pause, progress_bar, time, volume, loop_playback);

        if kind == PlayerKind::Video {
            take!(fullscreen, big_play, auto_hide, playsinline, muted);
            if let Some(poster) = &overrides.poster {
                self.poster = Some(poster.clone()).filter(|p| !p.is_empty());
            }
        }
    }
}

/// Caller-supplied option values; unset fields keep the kind default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct OptionOverrides {
    /// Start playback once the backend is ready
    pub autoplay: Option<bool>,
    /// Render the control bar
    pub controls: Option<bool>,
    /// Show the play/pause button
    pub play_pause: Option<bool>,
    /// Show the progress slider
    pub progress_bar: Option<bool>,
    /// Show the time labels and track time updates
    pub time: Option<bool>,
    /// Show the volume button
    pub volume: Option<bool>,
    /// Restart from zero when playback ends
    #[serde(rename = "loop")]
    pub loop_playback: Option<bool>,
    /// Show the fullscreen button (video only)
    pub fullscreen: Option<bool>,
    /// Poster image URL (video only); empty disables the poster
    pub poster: Option<String>,
    /// Show the big play button (video only)
    pub big_play: Option<bool>,
    /// Hide the control bar during playback (video only)
    pub auto_hide: Option<bool>,
    /// Play inline on mobile (video only)
    pub playsinline: Option<bool>,
    /// Start muted (video only)
    pub muted: Option<bool>,
}

impl OptionOverrides {
    /// Returns `self` with every field set in `top` replaced by `top`'s value.
    #[must_use]
    pub fn layered(&self, top: &OptionOverrides) -> Self {
        macro_rules! pick {
            ($($field:ident),*) => {
                Self { $($field: top.$field.clone().or_else(|| self.$field.clone()),)* }
            };
        }

        pick!(
            autoplay,
            controls,
            play_pause,
            progress_bar,
            time,
            volume,
            loop_playback,
            fullscreen,
            poster,
            big_play,
            auto_hide,
            playsinline,
            muted
        )
    }
}
