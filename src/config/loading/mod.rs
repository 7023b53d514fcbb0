mod validation;

use std::{fs, io::ErrorKind, path::Path};

use tracing::{debug, instrument};

use super::Config;
use crate::error::{MediaShellError, Result};

impl Config {
    /// Loads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The configuration file cannot be read
    /// - The TOML content is invalid
    /// - A value fails validation
    #[instrument]
    pub fn load(path: &Path) -> Result<Config> {
        let content =
            fs::read_to_string(path).map_err(|e| MediaShellError::io(&e, path))?;

        let config: Config =
            toml::from_str(&content).map_err(|e| MediaShellError::toml_parse(e, Some(path)))?;
        config.validate()?;

        debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    ///
    /// # Errors
    /// Returns an error for unreadable, malformed or invalid files.
    pub fn load_or_default(path: &Path) -> Result<Config> {
        match fs::metadata(path) {
            Err(error) if error.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no configuration file, using defaults");
                Ok(Config::default())
            }
            _ => Self::load(path),
        }
    }

    /// Parses and validates configuration from a TOML string.
    ///
    /// # Errors
    /// Returns an error for malformed TOML or invalid values.
    pub fn from_toml_str(content: &str) -> Result<Config> {
        let config: Config =
            toml::from_str(content).map_err(|e| MediaShellError::toml_parse(e, None))?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration as TOML.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| MediaShellError::Serialize {
            what: "configuration",
            details: e.to_string(),
        })
    }

    /// JSON schema of the configuration file, pretty printed.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be serialized.
    pub fn json_schema() -> Result<String> {
        let schema = schemars::schema_for!(Config);
        serde_json::to_string_pretty(&schema).map_err(|e| MediaShellError::Serialize {
            what: "configuration schema",
            details: e.to_string(),
        })
    }
}
