//! Application configuration management.
//!
//! Configuration is read once at startup from environment variables (and an
//! optional `.env` file) with the `envy` crate, then checked for the
//! combinations envy cannot express on its own.

use std::time::Duration;

use serde::Deserialize;

/// Where the ledger is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Postgres,
    Memory,
}

/// Deployment environment. Only `development` changes behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppEnv {
    Development,
    #[default]
    Production,
}

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `STORAGE_BACKEND`: `postgres` (default) or `memory`
/// - `DATABASE_URL`: PostgreSQL connection string, required for `postgres`
/// - `DATABASE_MAX_CONNECTIONS`: pool size, defaults to 5
/// - `SERVER_PORT`: HTTP server port, defaults to 5000
/// - `APP_ENV`: `development` exposes internal error detail in 500 bodies
/// - `AUTH_JWT_SECRET`: HS256 secret for bearer tokens
/// - `AUTH_JWKS_URL`: RS256 key set of the identity provider
/// - `AUTH_ISSUER` / `AUTH_AUDIENCE`: optional claim checks
/// - `RECURRING_SCAN_INTERVAL_SECS`: worker interval, `0` disables it
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage_backend: StorageBackend,

    pub database_url: Option<String>,

    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default)]
    pub app_env: AppEnv,

    pub auth_jwt_secret: Option<String>,
    pub auth_jwks_url: Option<String>,
    pub auth_issuer: Option<String>,
    pub auth_audience: Option<String>,

    #[serde(default = "default_scan_interval")]
    pub recurring_scan_interval_secs: u64,
}

fn default_max_connections() -> u32 {
    5
}

fn default_port() -> u16 {
    5000
}

fn default_scan_interval() -> u64 {
    300
}

/// Configuration that parsed but cannot be used.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Env(#[from] envy::Error),

    #[error("DATABASE_URL is required when STORAGE_BACKEND is postgres")]
    MissingDatabaseUrl,

    #[error("exactly one of AUTH_JWT_SECRET or AUTH_JWKS_URL must be set")]
    AuthKeySource,
}

/// How bearer tokens are verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthKeySource {
    /// HS256 shared secret
    Secret(String),
    /// RS256 keys served by the identity provider
    Jwks(String),
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file is loaded first if present.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed, if the postgres
    /// backend is selected without `DATABASE_URL`, or if the token key
    /// source is missing or ambiguous.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = envy::from_env::<Config>()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.storage_backend == StorageBackend::Postgres && self.database_url.is_none() {
            return Err(ConfigError::MissingDatabaseUrl);
        }
        self.auth_key_source()?;
        Ok(())
    }

    pub fn auth_key_source(&self) -> Result<AuthKeySource, ConfigError> {
        let secret = self.auth_jwt_secret.as_deref().filter(|s| !s.is_empty());
        let jwks = self.auth_jwks_url.as_deref().filter(|s| !s.is_empty());

        match (secret, jwks) {
            (Some(secret), None) => Ok(AuthKeySource::Secret(secret.to_string())),
            (None, Some(url)) => Ok(AuthKeySource::Jwks(url.to_string())),
            _ => Err(ConfigError::AuthKeySource),
        }
    }

    pub fn is_development(&self) -> bool {
        self.app_env == AppEnv::Development
    }

    /// Worker interval, or `None` when the worker is disabled.
    pub fn recurring_scan_interval(&self) -> Option<Duration> {
        (self.recurring_scan_interval_secs > 0)
            .then(|| Duration::from_secs(self.recurring_scan_interval_secs))
    }
}
