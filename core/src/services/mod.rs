//! Business services containing domain logic and use cases.

pub mod session;

// Re-export commonly used types
pub use session::{
    CacheKeys, ClaimCodec, Clock, DistributedLock, GraceCache, LockLease, RevocationStore,
    SessionCache, SessionTokenConfig, SessionTokenService, SystemClock, WhitelistStore,
    SESSION_REVOKED,
};
