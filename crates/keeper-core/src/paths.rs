//! Path resolution utilities.

use crate::env;
use crate::error::ConfigError;
use std::path::PathBuf;

/// Get the SecretKeeper base directory (`$KEEPER_HOME` or `~/.secretkeeper`).
pub fn base_dir() -> Result<PathBuf, ConfigError> {
    if let Some(home) = env::get_var(env::vars::HOME) {
        return Ok(PathBuf::from(home));
    }
    let home = dirs::home_dir().ok_or_else(|| {
        ConfigError::Validation("Could not determine home directory".to_string())
    })?;
    Ok(home.join(".secretkeeper"))
}

/// Get the config file path (`~/.secretkeeper/keeper.json5`).
pub fn config_file() -> Result<PathBuf, ConfigError> {
    Ok(base_dir()?.join("keeper.json5"))
}

/// Get the payload master key file path (`~/.secretkeeper/master.key`).
pub fn master_key_file() -> Result<PathBuf, ConfigError> {
    Ok(base_dir()?.join("master.key"))
}

/// Get the default server database path (`~/.secretkeeper/server.db`).
pub fn server_database() -> Result<PathBuf, ConfigError> {
    Ok(base_dir()?.join("server.db"))
}

/// Ensure the base directory exists.
pub fn ensure_base_dir() -> Result<PathBuf, ConfigError> {
    let dir = base_dir()?;
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
