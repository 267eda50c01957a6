//! # SessionKeep Core
//!
//! Domain layer of the session token lifecycle manager: token and account
//! entities, the error taxonomy, repository and cache capability traits, and
//! the Session Token Service that issues, verifies, rotates and revokes
//! session-bound token pairs.

pub mod domain;
pub mod errors;
pub mod repositories;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::entities::{Account, TokenClaims, TokenKind, TokenPair, RESERVED_CLAIMS};
pub use errors::{AuthError, BackendError, DomainError, DomainResult, SessionError, TokenError};
pub use repositories::AccountRepository;
pub use services::{
    CacheKeys, ClaimCodec, Clock, DistributedLock, GraceCache, LockLease, RevocationStore,
    SessionCache, SessionTokenConfig, SessionTokenService, SystemClock, WhitelistStore,
    SESSION_REVOKED,
};
