use std::collections::HashMap;

use super::*;

fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
    let vars: HashMap<String, String> = vars.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
    Config::from_lookup(|key| vars.get(key).cloned())
}

// =============================================================================
// Defaults
// =============================================================================

#[test]
fn defaults_apply_when_only_database_url_is_set() {
    let config = load(&[("DATABASE_URL", "postgres://localhost/pixelroom")]).unwrap();

    assert_eq!(config.database_url, "postgres://localhost/pixelroom");
    assert_eq!(config.port, DEFAULT_PORT);
    assert_eq!(config.db_max_connections, DEFAULT_DB_MAX_CONNECTIONS);
    assert_eq!(config.room_flush_interval_ms, DEFAULT_ROOM_FLUSH_INTERVAL_MS);
    assert!(!config.dev_auth_bypass);
    assert!(!config.cookie_secure);
    assert_eq!(config.canvas, CanvasConfig::default());
}

#[test]
fn canvas_defaults_match_classic_palette() {
    let canvas = CanvasConfig::default();
    assert_eq!(canvas.palette_size, 32);
    assert_eq!(canvas.default_grid_size, 100);
    assert_eq!(canvas.chat_message_max_chars, 250);
    assert_eq!(canvas.undo_depth_limit, 100);
}

#[test]
fn missing_database_url_is_an_error() {
    assert!(matches!(load(&[]), Err(ConfigError::Missing("DATABASE_URL"))));
    assert!(matches!(load(&[("DATABASE_URL", "  ")]), Err(ConfigError::Missing(_))));
}

// =============================================================================
// Overrides
// =============================================================================

#[test]
fn overrides_are_parsed() {
    let config = load(&[
        ("DATABASE_URL", "postgres://db"),
        ("PORT", "8080"),
        ("PALETTE_SIZE", "16"),
        ("DEFAULT_GRID_SIZE", "64"),
        ("CHAT_LOG_LIMIT", "10"),
        ("UNDO_DEPTH_LIMIT", "5"),
        ("ROOM_FLUSH_INTERVAL_MS", "250"),
        ("DEV_AUTH_BYPASS", "yes"),
        ("COOKIE_SECURE", "1"),
    ])
    .unwrap();

    assert_eq!(config.port, 8080);
    assert_eq!(config.canvas.palette_size, 16);
    assert_eq!(config.canvas.default_grid_size, 64);
    assert_eq!(config.canvas.chat_log_limit, 10);
    assert_eq!(config.canvas.undo_depth_limit, 5);
    assert_eq!(config.room_flush_interval_ms, 250);
    assert!(config.dev_auth_bypass);
    assert!(config.cookie_secure);
}

#[test]
fn unparseable_numbers_fall_back_to_defaults() {
    let config = load(&[("DATABASE_URL", "postgres://db"), ("PORT", "http"), ("CHAT_LOG_LIMIT", "-3")]).unwrap();
    assert_eq!(config.port, DEFAULT_PORT);
    assert_eq!(config.canvas.chat_log_limit, DEFAULT_CHAT_LOG_LIMIT);
}

#[test]
fn unusable_canvas_settings_are_rejected() {
    for (key, value) in [
        ("PALETTE_SIZE", "1"),
        ("PALETTE_SIZE", "257"),
        ("DEFAULT_GRID_SIZE", "0"),
        ("UNDO_DEPTH_LIMIT", "0"),
        ("CLIENT_CHANNEL_CAPACITY", "0"),
    ] {
        let result = load(&[("DATABASE_URL", "postgres://db"), (key, value)]);
        assert!(matches!(result, Err(ConfigError::OutOfRange { .. })), "{key}={value}");
    }
}

#[test]
fn full_byte_palette_is_allowed() {
    let config = load(&[("DATABASE_URL", "postgres://db"), ("PALETTE_SIZE", "256")]).unwrap();
    assert_eq!(config.canvas.palette_size, 256);
}

// =============================================================================
// parse_bool
// =============================================================================

#[test]
fn parse_bool_accepts_common_spellings() {
    for raw in ["1", "true", "YES", " on "] {
        assert_eq!(parse_bool(raw), Some(true), "{raw}");
    }
    for raw in ["0", "False", "no", "off"] {
        assert_eq!(parse_bool(raw), Some(false), "{raw}");
    }
    assert_eq!(parse_bool("maybe"), None);
}
