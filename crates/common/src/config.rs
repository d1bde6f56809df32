//! Application configuration.

use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Redis configuration. Realtime events stay in-process when absent.
    #[serde(default)]
    pub redis: Option<RedisConfig>,
    /// Token verification configuration.
    pub auth: AuthConfig,
    /// Upload storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Clearance fee configuration.
    #[serde(default)]
    pub clearance: ClearanceConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Emit logs as JSON lines.
    #[serde(default)]
    pub json_logs: bool,
}

/// Which store implementation backs the workflows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// `PostgreSQL` through sea-orm.
    #[default]
    Postgres,
    /// Process-local store for offline mode and tests.
    Memory,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Store implementation.
    #[serde(default)]
    pub backend: StoreBackend,
    /// `PostgreSQL` connection URL.
    #[serde(default)]
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Redis configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL.
    pub url: String,
    /// Key prefix for all pub/sub channels.
    #[serde(default = "default_redis_prefix")]
    pub prefix: String,
}

/// Token verification configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HS256 secret shared with the login service.
    pub jwt_secret: String,
    /// Cookie carrying the token when no `Authorization` header is sent.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
}

/// Upload storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory uploaded files are written under.
    #[serde(default = "default_storage_path")]
    pub base_path: PathBuf,
    /// URL prefix the files are served from.
    #[serde(default = "default_storage_url")]
    pub base_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_path: default_storage_path(),
            base_url: default_storage_url(),
        }
    }
}

/// Clearance fee configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ClearanceConfig {
    /// Base fee charged to students without the subsidy flag.
    #[serde(default = "default_base_fee")]
    pub base_fee: Decimal,
}

impl Default for ClearanceConfig {
    fn default() -> Self {
        Self {
            base_fee: default_base_fee(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_max_connections() -> u32 {
    20
}

const fn default_min_connections() -> u32 {
    2
}

fn default_redis_prefix() -> String {
    "asrama".to_string()
}

fn default_cookie_name() -> String {
    "token".to_string()
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("./uploads")
}

fn default_storage_url() -> String {
    "/uploads".to_string()
}

fn default_base_fee() -> Decimal {
    Decimal::new(2_000_000, 0)
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `.env` (if present)
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `ASRAMA_ENV`)
    /// 4. Environment variables with `ASRAMA__` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        let env = std::env::var("ASRAMA_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("ASRAMA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("ASRAMA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_optional_sections() {
        let raw = r#"
            [server]
            port = 8080

            [database]
            backend = "memory"

            [auth]
            jwt_secret = "secret"
        "#;

        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.backend, StoreBackend::Memory);
        assert!(config.redis.is_none());
        assert_eq!(config.auth.cookie_name, "token");
        assert_eq!(config.clearance.base_fee, Decimal::new(2_000_000, 0));
        assert_eq!(config.storage.base_url, "/uploads");
    }
}
