use std::{
    fmt, io,
    path::{Path, PathBuf},
    result,
};

use thiserror::Error;

/// Errors raised while loading and validating configuration.
#[derive(Error, Debug)]
pub enum MediaShellError {
    /// Configuration validation error
    #[error("configuration validation failed for '{component}': {details}")]
    ConfigValidation {
        /// Component that failed validation
        component: String,
        /// Validation error details
        details: String,
    },

    /// Configuration field missing or invalid
    #[error("invalid config field '{field}' in {component}: {reason}")]
    InvalidConfigField {
        /// The field that is invalid
        field: String,
        /// Component containing the field
        component: String,
        /// Reason why the field is invalid
        reason: String,
    },

    /// I/O operation error
    #[error("I/O error on '{path}': {details}")]
    IoError {
        /// Path where I/O error occurred
        path: PathBuf,
        /// I/O error details
        details: String,
    },

    /// TOML parsing error with location context
    #[error("failed to parse TOML at '{location}': {details}")]
    TomlParseError {
        /// Location of TOML being parsed (file path or "string")
        location: String,
        /// Parse error details
        details: String,
    },

    /// Schema or config serialization error
    #[error("failed to serialize {what}: {details}")]
    Serialize {
        /// What was being serialized
        what: &'static str,
        /// Serializer error details
        details: String,
    },
}

/// A specialized `Result` type for configuration operations.
pub type Result<T> = result::Result<T, MediaShellError>;

impl MediaShellError {
    /// Creates a TOML parsing error with optional file path context.
    pub fn toml_parse(error: impl fmt::Display, path: Option<&Path>) -> Self {
        let location = match path {
            Some(p) => {
                let clean_path = p.canonicalize().unwrap_or_else(|_| p.to_path_buf());
                clean_path.to_string_lossy().to_string()
            }
            None => "string".to_string(),
        };

        MediaShellError::TomlParseError {
            location,
            details: error.to_string(),
        }
    }

    /// Creates an I/O error carrying the offending path.
    pub fn io(error: &io::Error, path: &Path) -> Self {
        MediaShellError::IoError {
            path: path.to_path_buf(),
            details: error.to_string(),
        }
    }

    /// Creates a field error for `component`.
    pub fn invalid_field(component: &str, field: &str, reason: impl Into<String>) -> Self {
        MediaShellError::InvalidConfigField {
            field: field.to_string(),
            component: component.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_parse_errors_have_string_location() {
        let error = MediaShellError::toml_parse("expected `=`", None);

        assert_eq!(
            error.to_string(),
            "failed to parse TOML at 'string': expected `=`"
        );
    }

    #[test]
    fn field_errors_name_component() {
        let error = MediaShellError::invalid_field("shell", "volume_step", "must be in (0, 1]");

        assert_eq!(
            error.to_string(),
            "invalid config field 'volume_step' in shell: must be in (0, 1]"
        );
    }
}
