use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Tuning of the host shell's keyboard and auto-hide behavior.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct ShellConfig {
    /// Delay before the control bar hides during playback, in milliseconds.
    pub auto_hide_delay_ms: u64,

    /// Seconds skipped by the left and right arrow keys.
    pub seek_step_secs: f64,

    /// Volume change applied by the up and down arrow keys.
    pub volume_step: f64,
}

impl ShellConfig {
    /// Auto-hide delay as a `Duration`.
    pub fn auto_hide_delay(&self) -> Duration {
        Duration::from_millis(self.auto_hide_delay_ms)
    }
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            auto_hide_delay_ms: 3000,
            seek_step_secs: 5.0,
            volume_step: 0.1,
        }
    }
}
