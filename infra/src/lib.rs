//! # Infrastructure Layer
//!
//! Concrete backends for the SessionKeep core:
//! - **Cache**: Redis client implementing the session cache and the
//!   per-session refresh lock
//! - **Database**: MySQL account store exposing the active flag and the
//!   account-wide revocation timestamp
//! - **Telemetry**: tracing subscriber initialisation
//! - **Configuration**: layered loading from config files, environment and `.env`

use sk_core::errors::BackendError;
use sk_shared::config::AppConfig;

/// Cache module - Redis client, session cache and distributed lock
pub mod cache;

/// Database module - MySQL implementations using SQLx
pub mod database;

/// Tracing subscriber setup
pub mod telemetry;

pub use cache::RedisClient;
pub use database::{DatabasePool, MySqlAccountRepository};

/// Infrastructure-specific error types
#[derive(Debug, thiserror::Error)]
pub enum InfrastructureError {
    /// Database connection error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Redis cache error
    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<InfrastructureError> for BackendError {
    fn from(err: InfrastructureError) -> Self {
        match err {
            InfrastructureError::Database(e) => BackendError::AccountStore(e.to_string()),
            other => BackendError::Cache(other.to_string()),
        }
    }
}

/// Load application configuration
///
/// Sources, lowest precedence first: built-in defaults and plain
/// environment variables (`JWT_SECRET`, `REDIS_URL`, ...), the optional
/// `config.<environment>` file, then `SESSIONKEEP__*` variables
/// (e.g. `SESSIONKEEP__AUTH__ROTATION__GRACE_PERIOD_SECONDS=30`).
/// A `.env` file is loaded first if present.
pub fn load_config() -> Result<AppConfig, InfrastructureError> {
    dotenvy::dotenv().ok();

    let base = AppConfig::from_env();
    let defaults = config::Config::try_from(&base)
        .map_err(|e| InfrastructureError::Config(format!("Invalid base configuration: {}", e)))?;

    let layered = config::Config::builder()
        .add_source(defaults)
        .add_source(config::File::with_name(base.environment.config_file()).required(false))
        .add_source(
            config::Environment::with_prefix("SESSIONKEEP")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()
        .map_err(|e| InfrastructureError::Config(e.to_string()))?;

    let app_config: AppConfig = layered
        .try_deserialize()
        .map_err(|e| InfrastructureError::Config(e.to_string()))?;

    if app_config.auth.jwt.is_using_default_secret() {
        tracing::warn!(
            environment = %app_config.environment,
            "JWT secret not configured, using the development default"
        );
    }

    Ok(app_config)
}
