//! Application configuration
//!
//! Loaded from a TOML file (default `~/.config/notes-service/config.toml`).
//! Every section is optional; a missing file means the default configuration.
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! api_port = 8080
//!
//! [database]
//! backend = "sqlite"        # or "memory"
//! path = "./notes.db"
//!
//! [security]
//! jwt_secret = ""           # empty: random secret per process
//! jwt_expiration_hours = 24
//!
//! [admin]
//! username = "admin"
//! email = "admin@example.com"
//! password = "admin123"
//! ```
//!
//! A few values can be overridden from the environment:
//! `NOTES_API_PORT`, `NOTES_DATABASE_URL`, `NOTES_JWT_SECRET`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::infrastructure::crypto::{generate_secret, JwtConfig};
use crate::infrastructure::DatabaseConfig;

pub const ENV_CONFIG_PATH: &str = "NOTES_CONFIG";
const ENV_API_PORT: &str = "NOTES_API_PORT";
const ENV_DATABASE_URL: &str = "NOTES_DATABASE_URL";
const ENV_JWT_SECRET: &str = "NOTES_JWT_SECRET";

/// One year
const MAX_JWT_EXPIRATION_HOURS: i64 = 24 * 365;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Default config location: `~/.config/notes-service/config.toml`
pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("notes-service")
        .join("config.toml")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub api_port: u16,
    /// Upper bound for graceful shutdown, in seconds
    pub shutdown_timeout_secs: u64,
    /// Serve Prometheus metrics at `/metrics`
    pub metrics: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            api_port: 8080,
            shutdown_timeout_secs: 30,
            metrics: true,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.api_port)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub backend: StorageBackend,
    /// SQLite file path, ignored when `url` is set
    pub path: String,
    /// Full connection URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            path: "./notes.db".to_string(),
            url: None,
        }
    }
}

impl DatabaseSettings {
    pub fn connection_url(&self) -> String {
        match &self.url {
            Some(url) if !url.trim().is_empty() => url.clone(),
            _ => DatabaseConfig::sqlite(&self.path).url,
        }
    }

    pub fn to_database_config(&self) -> DatabaseConfig {
        DatabaseConfig {
            url: self.connection_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub bcrypt_cost: u32,
    pub session_cookie: String,
    /// Mark the session cookie `Secure` (HTTPS only)
    pub cookie_secure: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            jwt_expiration_hours: 24,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            session_cookie: "notes_session".to_string(),
            cookie_secure: false,
        }
    }
}

impl SecurityConfig {
    pub fn jwt_config(&self) -> JwtConfig {
        JwtConfig {
            secret: self.jwt_secret.clone(),
            expiration_hours: self.jwt_expiration_hours,
            issuer: "notes-service".to_string(),
        }
    }
}

/// Account created on startup when no user exists yet
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    pub enabled: bool,
    pub username: String,
    pub email: String,
    pub password: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            username: "admin".to_string(),
            email: "admin@example.com".to_string(),
            password: "admin123".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `json` or `text`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// `["*"]` allows any origin, without credentials
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                "http://localhost:5173".to_string(),
                "http://localhost:8080".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionsConfig {
    pub cleanup_interval_secs: u64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            cleanup_interval_secs: 300,
        }
    }
}

impl AppConfig {
    /// Load from `path`, falling back to defaults when the file does not exist.
    /// Environment overrides are applied and the result is validated.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            Self::from_toml(&raw)?
        } else {
            Self::default()
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup(ENV_API_PORT) {
            self.server.api_port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("{ENV_API_PORT} must be a port number")))?;
        }
        if let Some(url) = lookup(ENV_DATABASE_URL) {
            self.database.url = Some(url);
        }
        if let Some(secret) = lookup(ENV_JWT_SECRET) {
            self.security.jwt_secret = secret;
        }
        Ok(())
    }

    /// Replace an empty JWT secret with a random one.
    /// Returns `true` when a secret was generated; tokens then die with the process.
    pub fn ensure_jwt_secret(&mut self) -> bool {
        if self.security.jwt_secret.trim().is_empty() {
            self.security.jwt_secret = generate_secret();
            true
        } else {
            false
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.api_port == 0 {
            return Err(ConfigError::Invalid("server.api_port must not be 0".into()));
        }
        if !(1..=MAX_JWT_EXPIRATION_HOURS).contains(&self.security.jwt_expiration_hours) {
            return Err(ConfigError::Invalid(format!(
                "security.jwt_expiration_hours must be between 1 and {MAX_JWT_EXPIRATION_HOURS}"
            )));
        }
        if !(4..=31).contains(&self.security.bcrypt_cost) {
            return Err(ConfigError::Invalid(
                "security.bcrypt_cost must be between 4 and 31".into(),
            ));
        }
        if self.security.session_cookie.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "security.session_cookie must not be empty".into(),
            ));
        }
        if self.sessions.cleanup_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "sessions.cleanup_interval_secs must be positive".into(),
            ));
        }
        if self.database.backend == StorageBackend::Sqlite
            && self.database.url.is_none()
            && self.database.path.trim().is_empty()
        {
            return Err(ConfigError::Invalid(
                "database.path is required for the sqlite backend".into(),
            ));
        }
        if self.admin.enabled {
            if self.admin.username.trim().is_empty() || self.admin.email.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "admin.username and admin.email are required".into(),
                ));
            }
            if self.admin.password.len() < 6 {
                return Err(ConfigError::Invalid(
                    "admin.password must be at least 6 characters".into(),
                ));
            }
        }
        match self.logging.format.to_lowercase().as_str() {
            "json" | "text" => Ok(()),
            other => Err(ConfigError::Invalid(format!(
                "logging.format must be \"json\" or \"text\", got \"{other}\""
            ))),
        }
    }
}
