//! Portal API configuration module.
//!
//! Configuration is layered with the `config` crate:
//!
//! 1. built-in defaults (the `Default` impl below)
//! 2. an optional `portal.toml` next to the binary (or `PORTAL_CONFIG`)
//! 3. `PORTAL_*` environment variables, `__` separating nested keys
//!    (`PORTAL_HTTP_PORT=8080`, `PORTAL_SMTP__HOST=smtp.example.com`)

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::env;

/// Secret used when none is configured. Rejected when `secure_cookies` is on.
pub const DEV_SESSION_SECRET: &str = "perkhub-dev-secret-change-in-production";

const MIN_SECRET_LEN: usize = 32;

/// Portal API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// HTTP listen port
    pub http_port: u16,

    /// HTTP listen address
    pub bind_addr: String,

    /// SQLite database file
    pub database_path: String,

    /// SQLite pool size
    pub database_max_connections: u32,

    /// HS256 key for the `auth-user` session cookie
    pub session_secret: String,

    /// Session lifetime in seconds (cookie Max-Age and JWT exp)
    pub session_lifetime_secs: i64,

    /// Mark the session cookie `Secure` (HTTPS only)
    pub secure_cookies: bool,

    /// Public URL of the portal, used for links in emails
    pub app_url: String,

    /// Days until an issued redemption code expires
    pub code_ttl_days: i64,

    /// Outgoing mail. Without it, emails are only logged.
    pub smtp: Option<SmtpConfig>,
}

/// SMTP relay settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub username: String,
    pub password: String,
    #[serde(default = "default_smtp_from")]
    pub from: String,
}

fn default_smtp_port() -> u16 {
    587
}

fn default_smtp_from() -> String {
    "PerkHub <noreply@perkhub.local>".to_string()
}

impl Default for PortalConfig {
    fn default() -> Self {
        PortalConfig {
            http_port: 3000,
            bind_addr: "0.0.0.0".to_string(),
            database_path: "./data/perkhub.db".to_string(),
            database_max_connections: 5,
            session_secret: DEV_SESSION_SECRET.to_string(),
            session_lifetime_secs: 86_400,
            secure_cookies: false,
            app_url: "http://localhost:3000".to_string(),
            code_ttl_days: perkhub_core::REDEMPTION_CODE_TTL_DAYS,
            smtp: None,
        }
    }
}

impl PortalConfig {
    /// Load configuration from defaults, `portal.toml` and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let path = env::var("PORTAL_CONFIG").unwrap_or_else(|_| "portal".to_string());

        let settings = Config::builder()
            .add_source(File::with_name(&path).required(false))
            .add_source(
                Environment::with_prefix("PORTAL")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: PortalConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML document (defaults fill the gaps).
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;

        let config: PortalConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that are unsafe or meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session_secret.is_empty() {
            return Err(ConfigError::MissingRequired("session_secret".to_string()));
        }

        if self.secure_cookies
            && (self.session_secret.len() < MIN_SECRET_LEN
                || self.session_secret == DEV_SESSION_SECRET)
        {
            return Err(ConfigError::WeakSessionSecret {
                min: MIN_SECRET_LEN,
            });
        }

        if self.session_lifetime_secs <= 0 {
            return Err(ConfigError::InvalidValue("session_lifetime_secs".to_string()));
        }

        if self.code_ttl_days <= 0 {
            return Err(ConfigError::InvalidValue("code_ttl_days".to_string()));
        }

        if self.database_max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "database_max_connections".to_string(),
            ));
        }

        Ok(())
    }

    /// `bind_addr:http_port`
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.http_port)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("secure_cookies requires a session_secret of at least {min} bytes that is not the development default")]
    WeakSessionSecret { min: usize },
}
