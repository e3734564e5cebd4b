//! Redis-backed nonce registry shared between process instances.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, warn};

use super::NonceStore;
use crate::error::{store_error, Error, StoreErrorKind};

/// Key namespace used when none is configured.
pub const DEFAULT_KEY_PREFIX: &str = "swish:nonce:";

/// Upper bound on how long a reservation is kept, whatever the caller asks for (7 days).
pub const MAX_NONCE_TTL_SECS: i64 = 7 * 24 * 60 * 60;

const MIN_NONCE_TTL_MS: i64 = 1_000;

/// Nonce registry on a shared Redis instance.
///
/// Each reservation is a single `SET <prefix><nonce> <reserved-at> NX PX <ttl>`,
/// so Redis decides atomically which caller was first and expires the key
/// itself.
#[derive(Clone)]
pub struct RedisNonceStore {
    client: redis::Client,
    key_prefix: String,
}

impl RedisNonceStore {
    /// Create a new Redis nonce store
    ///
    /// # Arguments
    ///
    /// * `url` - Redis connection URL (e.g., "redis://127.0.0.1:6379")
    /// * `key_prefix` - Namespace for nonce keys; blank falls back to [`DEFAULT_KEY_PREFIX`]
    pub fn new(url: &str, key_prefix: &str) -> Result<Self, Error> {
        let client = redis::Client::open(url).map_err(|e| {
            store_error(
                StoreErrorKind::Connection,
                &format!("Failed to create Redis client: {}", e),
            )
        })?;

        Ok(Self::from_client(client, key_prefix))
    }

    /// Wrap an existing client.
    pub fn from_client(client: redis::Client, key_prefix: &str) -> Self {
        let key_prefix = if key_prefix.trim().is_empty() {
            DEFAULT_KEY_PREFIX.to_string()
        } else {
            key_prefix.to_string()
        };

        Self { client, key_prefix }
    }

    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    /// Ping Redis, returning `true` if it answered.
    pub async fn ping(&self) -> bool {
        match self.get_connection().await {
            Ok(mut conn) => {
                let result: redis::RedisResult<String> =
                    redis::cmd("PING").query_async(&mut conn).await;
                result.is_ok()
            }
            Err(e) => {
                warn!("Redis nonce store ping failed: {}", e);
                false
            }
        }
    }

    fn key(&self, nonce: &str) -> String {
        format!("{}{}", self.key_prefix, nonce)
    }

    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection, Error> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }
}

/// TTL in milliseconds for a reservation ending at `expires_at`, clamped to
/// between one second and [`MAX_NONCE_TTL_SECS`].
fn ttl_millis(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (expires_at - now)
        .num_milliseconds()
        .clamp(MIN_NONCE_TTL_MS, MAX_NONCE_TTL_SECS * 1_000)
}

#[async_trait]
impl NonceStore for RedisNonceStore {
    async fn reserve(
        &self,
        nonce: &str,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, Error> {
        if nonce.trim().is_empty() {
            return Err(store_error(
                StoreErrorKind::InvalidNonce,
                "Nonce cannot be empty",
            ));
        }

        let ttl_ms = ttl_millis(expires_at, now);
        let mut conn = self.get_connection().await?;

        // Nil reply means the key already exists
        let reply: Option<String> = redis::cmd("SET")
            .arg(self.key(nonce))
            .arg(now.to_rfc3339_opts(SecondsFormat::Millis, true))
            .arg("NX")
            .arg("PX")
            .arg(ttl_ms)
            .query_async(&mut conn)
            .await?;

        let reserved = reply.is_some();
        debug!("Redis nonce reservation reserved={} ttl_ms={}", reserved, ttl_ms);
        Ok(reserved)
    }
}
