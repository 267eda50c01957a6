//! Cache module for Redis-backed session state
//!
//! Provides the Redis client used as the shared session cache (revocation
//! records, whitelist entries, grace pairs) and as the per-session refresh
//! lock, with retry logic and response timeouts.

pub mod redis_client;

#[cfg(test)]
mod tests;

pub use redis_client::RedisClient;

// Re-export commonly used types
pub use sk_shared::config::CacheConfig;
