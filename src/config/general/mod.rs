mod log_level;

pub use log_level::{LogFormat, LogLevel};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// General settings affecting the whole process.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(default)]
pub struct GeneralConfig {
    /// Logging level; `RUST_LOG` takes precedence when set.
    pub log_level: LogLevel,

    /// Log output format; `MEDIASHELL_LOG_FORMAT` takes precedence when set.
    pub log_format: LogFormat,
}
