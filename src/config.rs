//! Configuration — process settings read once at startup.
//!
//! DESIGN
//! ======
//! Every knob comes from an environment variable (optionally seeded from a
//! `.env` file by `main`). Numbers that fail to parse fall back to their
//! defaults; only a missing `DATABASE_URL` or a value that would make the
//! canvas unusable is an error. Parsing goes through a lookup closure so
//! tests never have to touch the process environment.

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_PALETTE_SIZE: u16 = 32;
const DEFAULT_GRID_SIZE: usize = 100;
const DEFAULT_CHAT_LOG_LIMIT: usize = 200;
pub(crate) const DEFAULT_UNDO_DEPTH_LIMIT: usize = 100;
const DEFAULT_CHAT_MESSAGE_MAX_CHARS: usize = 250;
const DEFAULT_CLIENT_CHANNEL_CAPACITY: usize = 256;
const DEFAULT_ROOM_FLUSH_INTERVAL_MS: u64 = 5000;

/// Largest palette a `u8` color index can address.
const MAX_PALETTE_SIZE: u16 = 256;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{key} is out of range: {value}")]
    OutOfRange { key: &'static str, value: String },
}

/// Settings the canvas core reads when activating rooms and wiring
/// connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanvasConfig {
    /// Number of palette entries; the last one is white.
    pub palette_size: u16,
    /// Side length of a newly created room.
    pub default_grid_size: usize,
    pub chat_log_limit: usize,
    /// Undo units one connection may hold; the oldest are dropped first.
    pub undo_depth_limit: usize,
    pub chat_message_max_chars: usize,
    /// Outbound queue depth per connection.
    pub client_channel_capacity: usize,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            palette_size: DEFAULT_PALETTE_SIZE,
            default_grid_size: DEFAULT_GRID_SIZE,
            chat_log_limit: DEFAULT_CHAT_LOG_LIMIT,
            undo_depth_limit: DEFAULT_UNDO_DEPTH_LIMIT,
            chat_message_max_chars: DEFAULT_CHAT_MESSAGE_MAX_CHARS,
            client_channel_capacity: DEFAULT_CLIENT_CHANNEL_CAPACITY,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub db_max_connections: u32,
    pub room_flush_interval_ms: u64,
    /// Enables `POST /api/dev/login`. Never set in production.
    pub dev_auth_bypass: bool,
    pub cookie_secure: bool,
    pub canvas: CanvasConfig,
}

impl Config {
    /// Read configuration from the process environment.
    ///
    /// # Errors
    ///
    /// See [`Config::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`, which maps a variable name to
    /// its raw value.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when `DATABASE_URL` is missing, the palette is
    /// outside `2..=256`, or the grid size, undo depth or channel capacity is
    /// zero.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let canvas = CanvasConfig {
            palette_size: parse_or(lookup("PALETTE_SIZE"), DEFAULT_PALETTE_SIZE),
            default_grid_size: parse_or(lookup("DEFAULT_GRID_SIZE"), DEFAULT_GRID_SIZE),
            chat_log_limit: parse_or(lookup("CHAT_LOG_LIMIT"), DEFAULT_CHAT_LOG_LIMIT),
            undo_depth_limit: parse_or(lookup("UNDO_DEPTH_LIMIT"), DEFAULT_UNDO_DEPTH_LIMIT),
            chat_message_max_chars: parse_or(lookup("CHAT_MESSAGE_MAX_CHARS"), DEFAULT_CHAT_MESSAGE_MAX_CHARS),
            client_channel_capacity: parse_or(lookup("CLIENT_CHANNEL_CAPACITY"), DEFAULT_CLIENT_CHANNEL_CAPACITY),
        };
        if !(2..=MAX_PALETTE_SIZE).contains(&canvas.palette_size) {
            return Err(ConfigError::OutOfRange { key: "PALETTE_SIZE", value: canvas.palette_size.to_string() });
        }
        if canvas.default_grid_size == 0 {
            return Err(ConfigError::OutOfRange { key: "DEFAULT_GRID_SIZE", value: "0".into() });
        }
        if canvas.undo_depth_limit == 0 {
            return Err(ConfigError::OutOfRange { key: "UNDO_DEPTH_LIMIT", value: "0".into() });
        }
        if canvas.client_channel_capacity == 0 {
            return Err(ConfigError::OutOfRange { key: "CLIENT_CHANNEL_CAPACITY", value: "0".into() });
        }

        Ok(Self {
            database_url,
            port: parse_or(lookup("PORT"), DEFAULT_PORT),
            db_max_connections: parse_or(lookup("DB_MAX_CONNECTIONS"), DEFAULT_DB_MAX_CONNECTIONS),
            room_flush_interval_ms: parse_or(lookup("ROOM_FLUSH_INTERVAL_MS"), DEFAULT_ROOM_FLUSH_INTERVAL_MS),
            dev_auth_bypass: lookup("DEV_AUTH_BYPASS").and_then(|raw| parse_bool(&raw)).unwrap_or(false),
            cookie_secure: lookup("COOKIE_SECURE").and_then(|raw| parse_bool(&raw)).unwrap_or(false),
            canvas,
        })
    }
}

fn parse_or<T>(raw: Option<String>, default: T) -> T
where
    T: std::str::FromStr,
{
    raw.and_then(|v| v.trim().parse::<T>().ok()).unwrap_or(default)
}

pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
