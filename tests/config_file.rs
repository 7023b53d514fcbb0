//! Integration tests for loading configuration files.

#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::fs;

use mediashell::{
    MediaShellError,
    config::{Config, LogFormat, LogLevel},
};
use tempfile::TempDir;

fn write_config(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("mediashell.toml");
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn loads_every_section() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[general]
log_level = "debug"
log_format = "json"

[player.video]
autoplay = true
loop = true

[player.audio]
volume = false

[shell]
auto_hide_delay_ms = 1500
seek_step_secs = 10.0

[providers.vimeo]
reply_timeout_ms = 500
"#,
    );

    let config = Config::load(&path).unwrap();

    assert_eq!(config.general.log_level, LogLevel::Debug);
    assert_eq!(config.general.log_format, LogFormat::Json);
    assert_eq!(config.player.video.autoplay, Some(true));
    assert_eq!(config.player.video.loop_playback, Some(true));
    assert_eq!(config.player.audio.volume, Some(false));
    assert_eq!(config.shell.auto_hide_delay_ms, 1500);
    assert_eq!(config.shell.seek_step_secs, 10.0);
    assert_eq!(config.shell.volume_step, 0.1);
    assert_eq!(config.providers.vimeo.reply_timeout_ms, 500);
    assert_eq!(config.providers.vimeo.origin, "https://player.vimeo.com");
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();

    let config = Config::load_or_default(&dir.path().join("absent.toml")).unwrap();

    assert_eq!(config, Config::default());
}

#[test]
fn missing_file_is_an_error_for_strict_load() {
    let dir = TempDir::new().unwrap();

    let result = Config::load(&dir.path().join("absent.toml"));

    assert!(matches!(result, Err(MediaShellError::IoError { .. })));
}

#[test]
fn malformed_toml_names_the_file() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[shell\nseek_step_secs = 1");

    let error = Config::load_or_default(&path).unwrap_err();

    assert!(matches!(error, MediaShellError::TomlParseError { .. }));
    assert!(error.to_string().contains("mediashell.toml"));
}

#[test]
fn out_of_range_values_are_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[shell]\nvolume_step = 2.5\n");

    let error = Config::load(&path).unwrap_err();

    assert!(matches!(error, MediaShellError::InvalidConfigField { .. }));
}

#[test]
fn saved_config_loads_back() {
    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.shell.volume_step = 0.05;
    config.player.video.poster = Some("poster.jpg".into());

    let path = write_config(&dir, &config.to_toml_string().unwrap());

    assert_eq!(Config::load(&path).unwrap(), config);
}
