//! Unit tests for config module
//!
//! Tests configuration types, defaults, and serialization.
//! No filesystem dependencies - all in-memory.

#![allow(clippy::panic)]

use crate::{
    config::{Config, LogFormat, LogLevel},
    error::MediaShellError,
    player::PlayerKind,
};

#[test]
fn config_default() {
    let config = Config::default();

    assert_eq!(config.general.log_level, LogLevel::Info);
    assert_eq!(config.general.log_format, LogFormat::Pretty);
    assert_eq!(config.shell.auto_hide_delay_ms, 3000);
    assert_eq!(config.shell.seek_step_secs, 5.0);
    assert_eq!(config.shell.volume_step, 0.1);
    assert_eq!(config.providers.vimeo.origin, "https://player.vimeo.com");
    assert!(config.validate().is_ok());
}

#[test]
fn config_serialize_toml() {
    let toml_str = Config::default().to_toml_string().unwrap();

    assert!(toml_str.contains("[general]"));
    assert!(toml_str.contains("[shell]"));
    assert!(toml_str.contains("[providers.vimeo]"));
}

#[test]
fn config_serialize_roundtrip() {
    let original = Config::from_toml_str(
        r#"
        [player.video]
        auto_hide = true
        loop = true
        "#,
    )
    .unwrap();

    let toml_str = original.to_toml_string().unwrap();
    let deserialized = Config::from_toml_str(&toml_str).unwrap();

    assert_eq!(original, deserialized);
}

#[test]
fn config_full_toml() {
    let config = Config::from_toml_str(
        r#"
        [general]
        log_level = "debug"
        log_format = "json"

        [player.audio]
        loop = true

        [player.video]
        auto_hide = true
        poster = "https://example.org/poster.jpg"

        [shell]
        auto_hide_delay_ms = 1500
        seek_step_secs = 10.0
        volume_step = 0.05

        [providers.vimeo]
        origin = "https://player.example.org"
        reply_timeout_ms = 500
        "#,
    )
    .unwrap();

    assert_eq!(config.general.log_level, LogLevel::Debug);
    assert_eq!(config.general.log_format, LogFormat::Json);
    assert_eq!(config.player.for_kind(PlayerKind::Audio).loop_playback, Some(true));
    assert_eq!(config.player.for_kind(PlayerKind::Video).auto_hide, Some(true));
    assert_eq!(config.player.video.autoplay, None);
    assert_eq!(config.shell.auto_hide_delay_ms, 1500);
    assert_eq!(config.providers.vimeo.reply_timeout_ms, 500);
}

#[test]
fn config_minimal_toml() {
    let config = Config::from_toml_str("[shell]\nseek_step_secs = 2.5").unwrap();

    assert_eq!(config.shell.seek_step_secs, 2.5);
    assert_eq!(config.shell.volume_step, 0.1);
    assert_eq!(config.general.log_level, LogLevel::Info);
}

#[test]
fn config_empty_toml() {
    assert_eq!(Config::from_toml_str("").unwrap(), Config::default());
}

#[test]
fn invalid_toml_is_parse_error() {
    let result = Config::from_toml_str("[shell\nvolume_step = ");

    match result {
        Err(MediaShellError::TomlParseError { location, .. }) => assert_eq!(location, "string"),
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn unknown_log_level_is_parse_error() {
    let result = Config::from_toml_str("[general]\nlog_level = \"loud\"");

    assert!(matches!(result, Err(MediaShellError::TomlParseError { .. })));
}

#[test]
fn out_of_range_values_fail_validation() {
    let cases = [
        "[shell]\nvolume_step = 0.0",
        "[shell]\nvolume_step = 1.5",
        "[shell]\nseek_step_secs = -1.0",
        "[shell]\nauto_hide_delay_ms = 0",
        "[providers.vimeo]\nreply_timeout_ms = 0",
    ];

    for case in cases {
        match Config::from_toml_str(case) {
            Err(MediaShellError::InvalidConfigField { .. }) => {}
            other => panic!("expected field error for {case:?}, got {other:?}"),
        }
    }
}

#[test]
fn malformed_origin_fails_validation() {
    let result = Config::from_toml_str("[providers.vimeo]\norigin = \"player.vimeo.com/embed\"");

    assert!(matches!(
        result,
        Err(MediaShellError::ConfigValidation { .. })
    ));
}

#[test]
fn schema_describes_sections() {
    let schema = Config::json_schema().unwrap();

    assert!(schema.contains("\"general\""));
    assert!(schema.contains("\"auto_hide_delay_ms\""));
    assert!(schema.contains("\"reply_timeout_ms\""));
}
