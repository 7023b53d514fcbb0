use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Per-provider settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Vimeo embed settings
    pub vimeo: VimeoConfig,
}

/// Settings of the Vimeo embed provider.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct VimeoConfig {
    /// Origin of the embedded player; messages from other origins are ignored.
    pub origin: String,

    /// How long a getter waits for its reply, in milliseconds.
    pub reply_timeout_ms: u64,
}

impl Default for VimeoConfig {
    fn default() -> Self {
        Self {
            origin: "https://player.vimeo.com".to_string(),
            reply_timeout_ms: 2000,
        }
    }
}
