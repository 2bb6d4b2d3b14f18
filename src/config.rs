//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub ranking: RankingConfig,
    pub auth: AuthConfig,
    pub feed: FeedConfig,
    pub images: ImagesConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
    /// Public domain (e.g., "bookmarks.example.com")
    pub domain: String,
    /// Protocol ("http" or "https")
    pub protocol: String,
}

impl ServerConfig {
    /// Get the base URL for the instance
    ///
    /// # Returns
    /// Full URL like "https://bookmarks.example.com"
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.protocol, self.domain)
    }
}

/// Database configuration (SQLite only)
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub path: PathBuf,
    /// Upper bound on pooled connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    8
}

/// Ranking store backend selector
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RankingBackend {
    #[default]
    Redis,
    /// Process-local store, for development and tests
    Memory,
}

/// Ranking store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RankingConfig {
    #[serde(default)]
    pub backend: RankingBackend,
    /// Redis connection URL (e.g., "redis://127.0.0.1:6379/0")
    pub redis_url: Option<String>,
    /// Prefix of per-item view counter keys (`{prefix}:{id}:views`)
    pub key_prefix: String,
    /// Sorted set holding the global ranking
    pub ranking_key: String,
    /// Number of items shown on the ranking page
    pub top_n: usize,
    /// Score added per image view
    pub view_weight: f64,
    /// Score added per like (subtracted on unlike); 0 disables
    pub like_weight: f64,
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Session secret key (32+ bytes)
    pub session_secret: String,
    /// Session max age in seconds (default: 604800 = 7 days)
    pub session_max_age: i64,
}

/// Activity feed configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Entries shown on the dashboard (default: 10)
    pub page_size: usize,
    /// Identical actions inside this window are recorded once (default: 60)
    pub action_dedupe_seconds: i64,
}

/// Image listing configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ImagesConfig {
    /// Images per list page (default: 8)
    pub page_size: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (BOOKMARKS__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.domain", "localhost")?
            .set_default("server.protocol", "http")?
            .set_default("database.path", "data/bookmarks.db")?
            .set_default("database.max_connections", 8)?
            .set_default("ranking.backend", "redis")?
            .set_default("ranking.key_prefix", "image")?
            .set_default("ranking.ranking_key", "image_ranking")?
            .set_default("ranking.top_n", 10)?
            .set_default("ranking.view_weight", 1.0)?
            .set_default("ranking.like_weight", 0.0)?
            .set_default("auth.session_max_age", 604800)?
            .set_default("feed.page_size", 10)?
            .set_default("feed.action_dedupe_seconds", 60)?
            .set_default("images.page_size", 8)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("BOOKMARKS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub fn should_use_secure_cookies(&self) -> bool {
        self.server.protocol.eq_ignore_ascii_case("https")
    }

    pub(crate) fn validate(&self) -> Result<(), crate::error::AppError> {
        use crate::error::AppError;
        const MIN_SESSION_SECRET_BYTES: usize = 32;

        if self.auth.session_secret.as_bytes().len() < MIN_SESSION_SECRET_BYTES {
            return Err(AppError::Config(format!(
                "auth.session_secret must be at least {} bytes",
                MIN_SESSION_SECRET_BYTES
            )));
        }

        if self.auth.session_max_age <= 0 {
            return Err(AppError::Config(
                "auth.session_max_age must be greater than 0".to_string(),
            ));
        }

        if self.ranking.backend == RankingBackend::Redis
            && self
                .ranking
                .redis_url
                .as_deref()
                .map(str::trim)
                .is_none_or(str::is_empty)
        {
            return Err(AppError::Config(
                "ranking.redis_url is required when ranking.backend=redis".to_string(),
            ));
        }

        if self.ranking.key_prefix.trim().is_empty() || self.ranking.ranking_key.trim().is_empty()
        {
            return Err(AppError::Config(
                "ranking.key_prefix and ranking.ranking_key must not be empty".to_string(),
            ));
        }

        if !self.ranking.view_weight.is_finite() || !self.ranking.like_weight.is_finite() {
            return Err(AppError::Config(
                "ranking weights must be finite numbers".to_string(),
            ));
        }

        if self.feed.page_size == 0 || self.images.page_size == 0 {
            return Err(AppError::Config(
                "feed.page_size and images.page_size must be greater than 0".to_string(),
            ));
        }

        if self.feed.action_dedupe_seconds < 0 {
            return Err(AppError::Config(
                "feed.action_dedupe_seconds must not be negative".to_string(),
            ));
        }

        if !self.should_use_secure_cookies() {
            tracing::warn!(
                protocol = %self.server.protocol,
                "Using insecure session cookies"
            );
        }

        Ok(())
    }
}
