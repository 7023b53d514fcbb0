use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::player::{OptionOverrides, PlayerKind};

/// Option overrides applied to every player of a kind.
///
/// Values given to the shell at construction win over these.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(default)]
pub struct PlayerConfig {
    /// Overrides for audio players
    pub audio: OptionOverrides,

    /// Overrides for video players
    pub video: OptionOverrides,
}

impl PlayerConfig {
    /// Overrides configured for `kind`.
    pub fn for_kind(&self, kind: PlayerKind) -> &OptionOverrides {
        match kind {
            PlayerKind::Audio => &self.audio,
            PlayerKind::Video => &self.video,
        }
    }
}
