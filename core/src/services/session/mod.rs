//! Session token module
//!
//! This module handles the lifecycle of session-bound token pairs:
//! - Claim encoding and decoding (signed JWTs)
//! - Typed revocation, whitelist and grace stores over a shared TTL cache
//! - Per-session distributed locking for refresh rotation
//! - Issuance, verification, rotation and revocation

mod cache;
mod clock;
mod codec;
mod config;
mod service;
mod stores;

#[cfg(test)]
mod tests;

pub use cache::{DistributedLock, LockLease, SessionCache};
pub use clock::{Clock, SystemClock};
pub use codec::ClaimCodec;
pub use config::SessionTokenConfig;
pub use service::SessionTokenService;
pub use stores::{CacheKeys, GraceCache, RevocationStore, WhitelistStore, SESSION_REVOKED};
