//! Database module - MySQL implementations using SQLx
//!
//! This module provides the account store backing the token service:
//! - Connection pool management
//! - The account repository (active flag and account-wide revocation)

pub mod connection;
pub mod mysql;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use connection::{DatabasePool, PoolStatistics};
pub use mysql::MySqlAccountRepository;
pub use sk_shared::config::DatabaseConfig;
