//! Environment variable handling.

use std::env;

/// Well-known environment variable names.
pub mod vars {
    /// Server port override.
    pub const PORT: &str = "KEEPER_PORT";
    /// SQLite database path override.
    pub const DATABASE: &str = "KEEPER_DATABASE";
    /// Client server URL override.
    pub const SERVER_URL: &str = "KEEPER_SERVER_URL";
    /// Client bearer token.
    pub const TOKEN: &str = "KEEPER_TOKEN";
    /// Hex-encoded payload master key.
    pub const MASTER_KEY: &str = "KEEPER_MASTER_KEY";
    /// Emit JSON logs when truthy.
    pub const LOG_JSON: &str = "KEEPER_LOG_JSON";
    /// Base directory override (defaults to `~/.secretkeeper`).
    pub const HOME: &str = "KEEPER_HOME";
}

/// Get an environment variable, returning None if not set or empty.
pub fn get_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable as a boolean.
pub fn get_bool(name: &str) -> bool {
    get_var(name)
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

/// Get an environment variable as a u16 (e.g., for ports).
pub fn get_u16(name: &str) -> Option<u16> {
    get_var(name).and_then(|v| v.parse().ok())
}
