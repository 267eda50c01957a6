//! Shared configuration and response types for SessionKeep
//!
//! This crate provides common functionality used across all workspace crates:
//! - Configuration types (JWT, rotation, cache, database, logging)
//! - The serialisable error response and its stable error codes

pub mod config;
pub mod errors;

// Re-export commonly used items at crate root
pub use config::{
    AppConfig, AuthConfig, CacheConfig, DatabaseConfig, Environment, JwtConfig, LogFormat,
    LoggingConfig, RotationConfig,
};
pub use errors::{error_codes, ErrorResponse};
