//! Configuration module with sub-modules per concern
//!
//! - `auth` - Token signing, rotation and refresh-lock configuration
//! - `cache` - Redis connection and key prefix configuration
//! - `database` - Account store connection configuration
//! - `environment` - Environment detection and logging configuration

pub mod auth;
pub mod cache;
pub mod database;
pub mod environment;

use serde::{Deserialize, Serialize};

// Re-export commonly used types
pub use auth::{AuthConfig, JwtConfig, RotationConfig};
pub use cache::CacheConfig;
pub use database::DatabaseConfig;
pub use environment::{Environment, LogFormat, LoggingConfig};

/// Complete application configuration combining all sub-configurations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Environment configuration
    #[serde(default)]
    pub environment: Environment,

    /// Account store configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Authentication configuration
    #[serde(default)]
    pub auth: AuthConfig,

    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let env = Environment::default();
        Self {
            environment: env,
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            cache: CacheConfig::default(),
            logging: LoggingConfig::for_environment(env),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let environment = Environment::from_env();
        Self {
            environment,
            database: DatabaseConfig::from_env(),
            auth: AuthConfig::from_env(),
            cache: CacheConfig::from_env(),
            logging: LoggingConfig::for_environment(environment),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_config_deserializes_with_defaults() {
        let config: AppConfig = serde_json::from_str(
            r#"{
                "environment": "production",
                "auth": { "jwt": {
                    "secret": "s3cret",
                    "access_token_expiry": 300,
                    "refresh_token_expiry": 86400,
                    "issuer": "sessionkeep"
                } }
            }"#,
        )
        .unwrap();

        assert!(config.environment.is_production());
        assert_eq!(config.auth.jwt.access_token_expiry, 300);
        assert_eq!(config.auth.jwt.audience, "sessionkeep-api");
        assert_eq!(config.auth.rotation.grace_period_seconds, 60);
        assert_eq!(config.cache.url, "redis://localhost:6379");
    }
}
