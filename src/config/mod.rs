//! Configuration schema definitions and validation.
//!
//! Defines the configuration file layout: logging, per-kind player option
//! overrides, shell tuning and provider settings. Every section is optional
//! and falls back to its defaults.

mod general;
mod loading;
mod player;
mod providers;
mod shell;

#[cfg(test)]
mod tests;

pub use general::{GeneralConfig, LogFormat, LogLevel};
pub use player::PlayerConfig;
pub use providers::{ProvidersConfig, VimeoConfig};
pub use shell::ShellConfig;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Main configuration structure.
///
/// Represents the complete configuration schema that can be loaded
/// from TOML files. All fields have sensible defaults.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    /// General application settings.
    pub general: GeneralConfig,

    /// Player option overrides per kind.
    pub player: PlayerConfig,

    /// Host shell tuning.
    pub shell: ShellConfig,

    /// Provider settings.
    pub providers: ProvidersConfig,
}
