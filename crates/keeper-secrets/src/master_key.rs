//! Master key resolution for the payload codec.
//!
//! The master key is resolved in priority order:
//! 1. `KEEPER_MASTER_KEY` environment variable (hex-encoded)
//! 2. Key file (`~/.secretkeeper/master.key`, hex-encoded)
//! 3. Generate a new key and write it to the key file
//!
//! Every device sharing an account must resolve the same key, so a freshly
//! generated key has to be copied to the other devices by hand.

use std::fs;
use std::path::Path;

use keeper_core::{env, paths};
use tracing::{debug, info};

use crate::codec::{self, KEY_SIZE};
use crate::error::{Result, SecretError};

/// Retrieve the master key from the default locations, creating one if it
/// does not exist yet.
pub fn get_or_create_master_key() -> Result<Vec<u8>> {
    let key_file = paths::master_key_file()
        .map_err(|e| SecretError::KeyResolution(format!("cannot locate key file: {e}")))?;
    resolve(env::get_var(env::vars::MASTER_KEY), &key_file)
}

/// Resolve the master key using an explicit key file path.
pub fn get_or_create_master_key_at(key_file: &Path) -> Result<Vec<u8>> {
    resolve(env::get_var(env::vars::MASTER_KEY), key_file)
}

fn resolve(env_value: Option<String>, key_file: &Path) -> Result<Vec<u8>> {
    if let Some(hex_key) = env_value {
        debug!("using master key from environment variable");
        return parse_hex_key(&hex_key, env::vars::MASTER_KEY);
    }

    if key_file.exists() {
        debug!(path = %key_file.display(), "using master key from key file");
        let content = fs::read_to_string(key_file)?;
        return parse_hex_key(&content, &key_file.display().to_string());
    }

    let key = codec::generate_master_key();
    write_key_file(key_file, &key)?;
    info!(path = %key_file.display(), "generated new master key");
    Ok(key)
}

fn parse_hex_key(hex_key: &str, source: &str) -> Result<Vec<u8>> {
    let key = hex::decode(hex_key.trim())
        .map_err(|e| SecretError::KeyResolution(format!("invalid hex in {source}: {e}")))?;
    if key.len() != KEY_SIZE {
        return Err(SecretError::KeyResolution(format!(
            "{source} must decode to exactly {KEY_SIZE} bytes, got {}",
            key.len()
        )));
    }
    Ok(key)
}

fn write_key_file(path: &Path, key: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, hex::encode(key))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&temp_path, fs::Permissions::from_mode(0o600))?;
    }

    fs::rename(&temp_path, path)?;
    Ok(())
}
