//! Configuration loading and persistence.

use super::{BindMode, Config, LogLevel};
use crate::error::ConfigError;
use crate::{env, paths};
use std::fs;
use std::path::{Path, PathBuf};

impl Config {
    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = paths::config_file()?;
        Self::load(&path)
    }

    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        json5::from_str(content).map_err(|e| ConfigError::Json5(e.to_string()))
    }

    /// Save configuration to a file path.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_json5()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write atomically
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &content)?;
        fs::rename(&temp_path, path)?;

        Ok(())
    }

    /// Serialize to a JSON5-compatible string.
    pub fn to_json5(&self) -> Result<String, ConfigError> {
        // json5 has no serializer; plain JSON is valid JSON5
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load from `path` (or the default location), falling back to defaults
    /// when the file does not exist, then apply environment overrides.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => paths::config_file()?,
        };

        let mut config = match Self::load(&path) {
            Ok(config) => config,
            Err(ConfigError::NotFound(_)) => Self::default(),
            Err(e) => return Err(e),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Override fields from `KEEPER_*` environment variables.
    pub fn apply_env_overrides(&mut self) {
        if let Some(port) = env::get_u16(env::vars::PORT) {
            self.server.port = port;
        }
        if let Some(database) = env::get_var(env::vars::DATABASE) {
            self.server.database = Some(PathBuf::from(database));
        }
        if let Some(url) = env::get_var(env::vars::SERVER_URL) {
            self.client.server_url = url;
        }
        if let Some(token) = env::get_var(env::vars::TOKEN) {
            self.client.token = Some(token.into());
        }
        if env::get_bool(env::vars::LOG_JSON) {
            self.logging.json = true;
        }
    }

    /// Validate the configuration, collecting all errors before returning.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push("Server port cannot be 0".to_string());
        }

        if let Some(db) = &self.server.database {
            if db.as_os_str().is_empty() {
                errors.push("Server database path must not be empty".to_string());
            }
        }

        if self.server.max_body_bytes == 0 {
            errors.push("Server max_body_bytes must be greater than 0".to_string());
        }

        for (token, owner) in &self.server.tokens {
            if token.trim().is_empty() {
                errors.push("Server token must not be empty".to_string());
            }
            if owner.trim().is_empty() {
                errors.push("Server token maps to an empty owner".to_string());
            }
        }

        match url::Url::parse(&self.client.server_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => errors.push(format!(
                "Client server_url must use http or https, got '{}'",
                url.scheme()
            )),
            Err(e) => errors.push(format!(
                "Client server_url '{}' is not a valid URL: {}",
                self.client.server_url, e
            )),
        }

        if self.client.sync_interval_secs == 0 {
            errors.push("Client sync_interval_secs must be greater than 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors.join("; ")))
        }
    }
}

/// Configuration builder for creating configs programmatically.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new config builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the server port.
    pub fn port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    /// Set the bind mode.
    pub fn bind(mut self, mode: BindMode) -> Self {
        self.config.server.bind = mode;
        self
    }

    /// Use a SQLite database at `path`.
    pub fn database(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.server.database = Some(path.into());
        self
    }

    /// Accept `token` as authenticating `owner`.
    pub fn token(mut self, token: impl Into<String>, owner: impl Into<String>) -> Self {
        self.config.server.tokens.insert(token.into(), owner.into());
        self
    }

    /// Set the largest request body the server accepts.
    pub fn max_body_bytes(mut self, bytes: usize) -> Self {
        self.config.server.max_body_bytes = bytes;
        self
    }

    /// Set the client's server URL.
    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.config.client.server_url = url.into();
        self
    }

    /// Set the background sync interval.
    pub fn sync_interval_secs(mut self, secs: u64) -> Self {
        self.config.client.sync_interval_secs = secs;
        self
    }

    /// Set the log level.
    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.config.logging.level = level;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> Config {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_parse_json5_with_comments() {
        let config = Config::parse(
            r#"{
                // local dev server
                server: { port: 9000, tokens: { "tok-a": "alice" } },
                client: { sync_interval_secs: 5 },
            }"#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.max_body_bytes, 64 * 1024 * 1024);
        assert_eq!(config.server.tokens.get("tok-a").map(String::as_str), Some("alice"));
        assert_eq!(config.client.sync_interval_secs, 5);
        assert_eq!(config.logging.level, LogLevel::Info);
    }

    #[test]
    fn test_validate_collects_every_error() {
        let config = ConfigBuilder::new()
            .port(0)
            .max_body_bytes(0)
            .server_url("ftp://example.com")
            .sync_interval_secs(0)
            .build();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("port cannot be 0"));
        assert!(err.contains("max_body_bytes"));
        assert!(err.contains("http or https"));
        assert!(err.contains("sync_interval_secs"));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("keeper.json5");

        let config = ConfigBuilder::new()
            .port(9443)
            .database(dir.path().join("secrets.db"))
            .token("tok", "bob")
            .build();
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.server.port, 9443);
        assert_eq!(loaded.server.database, config.server.database);
        assert_eq!(loaded.server.tokens.get("tok").map(String::as_str), Some("bob"));
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load(Path::new("/nonexistent/keeper.json5"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_or_default_without_file() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_or_default(Some(&dir.path().join("absent.json5"))).unwrap();
        assert_eq!(config.client.sync_interval_secs, 60);
    }
}
