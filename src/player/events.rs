use std::{
    collections::HashMap,
    fmt,
    str::FromStr,
    sync::{Arc, RwLock},
};

use super::Player;
use crate::common::{read, write};

/// Lifecycle transitions a player reports to its consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Playback started
    Play,
    /// Playback paused
    Pause,
    /// Time display refreshed
    TimeUpdate,
    /// Playback reached the end without looping
    Ended,
    /// Volume or mute state changed
    VolumeChange,
    /// Player went fullscreen
    EnterFullscreen,
    /// Player left fullscreen
    ExitFullscreen,
    /// Loading state toggled
    Progress,
}

impl EventKind {
    /// Every event kind.
    pub const ALL: [EventKind; 8] = [
        Self::Play,
        Self::Pause,
        Self::TimeUpdate,
        Self::Ended,
        Self::VolumeChange,
        Self::EnterFullscreen,
        Self::ExitFullscreen,
        Self::Progress,
    ];

    /// Lowercase event name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Play => "play",
            Self::Pause => "pause",
            Self::TimeUpdate => "timeupdate",
            Self::Ended => "ended",
            Self::VolumeChange => "volumechange",
            Self::EnterFullscreen => "enterfullscreen",
            Self::ExitFullscreen => "exitfullscreen",
            Self::Progress => "progress",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown player event '{s}'"))
    }
}

/// Event delivered to player listeners.
#[derive(Debug, Clone)]
pub struct PlayerEvent {
    /// What happened
    pub kind: EventKind,
    /// Player that emitted the event
    pub player: Player,
}

/// Player event callback.
pub type Listener = Arc<dyn Fn(&PlayerEvent) + Send + Sync>;

/// Listeners per event kind, called in registration order.
#[derive(Default)]
pub(crate) struct EventRegistry {
    listeners: RwLock<HashMap<EventKind, Vec<Listener>>>,
}

impl EventRegistry {
    pub(crate) fn on(&self, kind: EventKind, listener: Listener) {
        write(&self.listeners).entry(kind).or_default().push(listener);
    }

    /// Snapshot of the listeners for `kind`, so callbacks can register more.
    pub(crate) fn listeners(&self, kind: EventKind) -> Vec<Listener> {
        read(&self.listeners)
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn clear(&self) {
        write(&self.listeners).clear();
    }

    pub(crate) fn len(&self) -> usize {
        read(&self.listeners).values().map(Vec::len).sum()
    }
}

impl fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRegistry")
            .field("listeners", &self.len())
            .finish()
    }
}
