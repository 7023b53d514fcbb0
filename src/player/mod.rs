//! Player core.
//!
//! [`Player`] is the single source of truth for playback state. It forwards
//! uniform commands to its provider, turns backend signals into state and
//! control bar updates, and reports lifecycle transitions to listeners
//! registered with [`Player::on`].

pub mod control_bar;
mod error;
mod events;
mod machine;
mod options;
mod state;
mod time;


pub use control_bar::{ControlBar, ControlElements};
pub use error::{PlayerError, Result};
pub use events::{EventKind, Listener, PlayerEvent};
pub use machine::{Player, PlayerInit, WeakPlayer};
pub use options::{OptionOverrides, PlayerKind, PlayerOptions};
pub use state::{PlaybackSnapshot, PlaybackState};
pub use time::format_time;
