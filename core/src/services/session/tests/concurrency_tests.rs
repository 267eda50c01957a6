//! Racing refresh calls against the per-session lock

use std::time::Duration;

use sk_shared::config::RotationConfig;

use crate::errors::{DomainError, SessionError, TokenError};
use crate::services::session::{CacheKeys, DistributedLock};

use super::mocks::Harness;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_refreshes_share_one_rotation() {
    let h = Harness::new();
    let pair = h.service.issue(&h.account).unwrap();
    h.clock.advance(10);
    let token = pair.refresh_token.clone().unwrap();

    let (first, second) = {
        let (s1, s2) = (h.service.clone(), h.service.clone());
        let (t1, t2) = (token.clone(), token.clone());
        tokio::join!(
            tokio::spawn(async move { s1.refresh(&t1).await }),
            tokio::spawn(async move { s2.refresh(&t2).await }),
        )
    };
    let first = first.unwrap().unwrap();
    let second = second.unwrap().unwrap();

    assert_eq!(first, second);
    assert_eq!(first.session_id, pair.session_id);
    assert_eq!(h.cache.write_count("token_revocation:"), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_refresh_burst_converges() {
    let h = Harness::new();
    let pair = h.service.issue(&h.account).unwrap();
    h.clock.advance(10);
    let token = pair.refresh_token.clone().unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = h.service.clone();
            let token = token.clone();
            tokio::spawn(async move { service.refresh(&token).await })
        })
        .collect();

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap().unwrap());
    }

    assert!(results.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(h.cache.write_count("token_revocation:"), 1);
    assert_eq!(h.cache.write_count("token_whitelist:"), 1);
}

#[tokio::test]
async fn test_held_lock_yields_retryable_contention() {
    let h = Harness::with_rotation(RotationConfig::default().with_lock_timeouts(5, 0));
    let pair = h.service.issue(&h.account).unwrap();
    h.clock.advance(10);

    let lock_key = CacheKeys::default().lock(&pair.session_id);
    let lease = h
        .cache
        .acquire(&lock_key, Duration::from_secs(5), Duration::ZERO)
        .await
        .unwrap()
        .unwrap();

    let err = h
        .service
        .refresh(pair.refresh_token.as_deref().unwrap())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DomainError::Session(SessionError::LockContention)
    ));
    assert!(err.is_retryable());
    assert!(!err.ends_session());
    assert_eq!(h.cache.write_count("token_"), 0);

    assert!(h.cache.release(&lease).await.unwrap());
    assert!(h
        .service
        .refresh(pair.refresh_token.as_deref().unwrap())
        .await
        .is_ok());
}

#[tokio::test]
async fn test_abandoned_lease_expires() {
    let h = Harness::new();
    let pair = h.service.issue(&h.account).unwrap();
    h.clock.advance(10);

    // A holder that crashed without releasing
    let lock_key = CacheKeys::default().lock(&pair.session_id);
    let stale = h
        .cache
        .acquire(&lock_key, Duration::from_millis(50), Duration::ZERO)
        .await
        .unwrap()
        .unwrap();

    let result = h
        .service
        .refresh(pair.refresh_token.as_deref().unwrap())
        .await;
    assert!(result.is_ok());

    // The stale lease must not release anybody else's lock
    assert!(!h.cache.release(&stale).await.unwrap());
    assert!(!h.cache.is_locked(&lock_key));
}

#[tokio::test]
async fn test_revoke_landing_mid_rotation_stays_revoked() {
    let h = Harness::new();
    let pair = h.service.issue(&h.account).unwrap();
    h.clock.advance(10);

    // A logout from another process lands between the whitelist and cutover writes
    let revocation_key = CacheKeys::default().revocation(&pair.session_id);
    h.cache
        .interleave_after_write("token_whitelist:", &revocation_key, "0");

    let result = h
        .service
        .refresh(pair.refresh_token.as_deref().unwrap())
        .await;
    assert!(matches!(
        result,
        Err(DomainError::Token(TokenError::TokenInvalid))
    ));
    assert_eq!(h.cache.raw(&revocation_key), Some("0".to_string()));

    // The pair minted by the interrupted rotation is revoked with the rest
    let cached = h
        .cache
        .raw(&CacheKeys::default().grace(&pair.session_id))
        .unwrap();
    let rotated: crate::domain::entities::token::TokenPair =
        serde_json::from_str(&cached).unwrap();
    assert!(matches!(
        h.service.verify(&rotated.access_token).await,
        Err(DomainError::Token(TokenError::TokenRevoked))
    ));

    h.clock.advance(100);
    assert!(matches!(
        h.service.refresh(rotated.refresh_token.as_deref().unwrap()).await,
        Err(DomainError::Token(TokenError::TokenInvalid))
    ));
    assert!(matches!(
        h.service.refresh(pair.refresh_token.as_deref().unwrap()).await,
        Err(DomainError::Token(TokenError::TokenInvalid))
    ));
}
