use std::env;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LogFormat, LogLevel};

/// Environment variable overriding the configured log format.
pub const LOG_FORMAT_ENV: &str = "MEDIASHELL_LOG_FORMAT";

/// Initialize tracing for the application
///
/// Uses the RUST_LOG environment variable if set, otherwise `level`.
/// Output is pretty or JSON according to `format`, unless
/// MEDIASHELL_LOG_FORMAT says otherwise.
///
/// # Errors
/// Returns error if tracing subscriber initialization fails
pub fn init(level: LogLevel, format: LogFormat) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    let format = resolve_format(env::var(LOG_FORMAT_ENV).ok().as_deref(), format);

    let registry = tracing_subscriber::registry().with(env_filter);

    match format {
        LogFormat::Json => {
            registry
                .with(fmt::layer().json().with_target(true).with_level(true))
                .try_init()?;
        }
        LogFormat::Pretty => {
            registry
                .with(
                    fmt::layer()
                        .pretty()
                        .with_target(true)
                        .with_level(true)
                        .with_thread_ids(true)
                        .with_thread_names(true),
                )
                .try_init()?;
        }
    }

    Ok(())
}

fn resolve_format(env_value: Option<&str>, configured: LogFormat) -> LogFormat {
    match env_value {
        Some("json") => LogFormat::Json,
        Some("pretty") => LogFormat::Pretty,
        _ => configured,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_format_wins_when_recognized() {
        assert_eq!(resolve_format(Some("json"), LogFormat::Pretty), LogFormat::Json);
        assert_eq!(resolve_format(Some("pretty"), LogFormat::Json), LogFormat::Pretty);
        assert_eq!(resolve_format(Some("xml"), LogFormat::Json), LogFormat::Json);
        assert_eq!(resolve_format(None, LogFormat::Pretty), LogFormat::Pretty);
    }
}
