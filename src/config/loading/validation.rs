use crate::{
    config::Config,
    error::{MediaShellError, Result},
};

impl Config {
    /// Checks value ranges the type system cannot express.
    ///
    /// # Errors
    /// Returns `InvalidConfigField` for the first offending value, or
    /// `ConfigValidation` when the vimeo origin is not an http(s) origin.
    pub fn validate(&self) -> Result<()> {
        let shell = &self.shell;

        if shell.auto_hide_delay_ms == 0 {
            return Err(MediaShellError::invalid_field(
                "shell",
                "auto_hide_delay_ms",
                "must be greater than zero",
            ));
        }

        if !shell.seek_step_secs.is_finite() || shell.seek_step_secs <= 0.0 {
            return Err(MediaShellError::invalid_field(
                "shell",
                "seek_step_secs",
                "must be a positive number of seconds",
            ));
        }

        if !(shell.volume_step > 0.0 && shell.volume_step <= 1.0) {
            return Err(MediaShellError::invalid_field(
                "shell",
                "volume_step",
                "must be in (0, 1]",
            ));
        }

        let vimeo = &self.providers.vimeo;
        if vimeo.reply_timeout_ms == 0 {
            return Err(MediaShellError::invalid_field(
                "providers.vimeo",
                "reply_timeout_ms",
                "must be greater than zero",
            ));
        }

        let origin = vimeo.origin.as_str();
        let scheme_ok = origin.starts_with("https://") || origin.starts_with("http://");
        let host = origin.split_once("://").map_or("", |(_, host)| host);
        if !scheme_ok || host.is_empty() || host.contains('/') {
            return Err(MediaShellError::ConfigValidation {
                component: "providers.vimeo".to_string(),
                details: format!("origin '{origin}' must look like https://host[:port]"),
            });
        }

        Ok(())
    }
}
