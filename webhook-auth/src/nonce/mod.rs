//! Replay protection: registries of consumed nonces.
//!
//! A nonce store owns no verification logic. It answers one question
//! atomically: is this the first reservation of `nonce` that is still live?

mod in_memory;
#[cfg(feature = "redis-store")]
mod redis;

pub use in_memory::InMemoryNonceStore;
#[cfg(feature = "redis-store")]
pub use self::redis::{RedisNonceStore, DEFAULT_KEY_PREFIX, MAX_NONCE_TTL_SECS};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Error;

/// Trait for registries of consumed nonces.
///
/// CRITICAL: `reserve` is the only replay check. Callers must never look a
/// nonce up and then insert it in a separate step; that reopens the race the
/// atomic reservation closes.
///
/// Implementations should:
/// - Make `reserve` atomic, so that concurrent callers racing on one nonce
///   see exactly one `true`
/// - Judge expiry against the caller's `now`, never a clock of their own, so
///   that a verification run at a given reference time sees a consistent
///   registry
/// - Forget nonces once `expires_at` has passed
/// - Report an unreachable backend as an `Err`, never as `Ok(true)`
#[async_trait]
pub trait NonceStore: Send + Sync {
    /// Reserve `nonce` from `now` until `expires_at`.
    ///
    /// # Returns
    ///
    /// `Ok(true)` for the first live reservation, `Ok(false)` while an earlier
    /// reservation of the same nonce has not expired at `now`.
    async fn reserve(
        &self,
        nonce: &str,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, Error>;
}
