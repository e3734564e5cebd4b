//! Process-local nonce registry.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::trace;

use super::NonceStore;
use crate::error::{store_error, Error, StoreErrorKind};

/// In-memory nonce registry backed by a concurrent map of nonce to expiry.
///
/// Expired entries are swept on every access, so the map stays bounded by the
/// number of nonces reserved within one retention period without a background
/// task. Not shared between processes: only suitable for single-instance
/// deployments.
#[derive(Default)]
pub struct InMemoryNonceStore {
    entries: DashMap<String, DateTime<Utc>>,
}

impl InMemoryNonceStore {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Number of entries currently held, including any not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_expired(&self, now: DateTime<Utc>) {
        let before = self.entries.len();
        self.entries.retain(|_, expires_at| *expires_at > now);
        let evicted = before.saturating_sub(self.entries.len());
        if evicted > 0 {
            trace!("Evicted {} expired nonces", evicted);
        }
    }
}

#[async_trait]
impl NonceStore for InMemoryNonceStore {
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

        self.evict_expired(now);

        // A reservation that is already over cannot be held
        if expires_at <= now {
            return Ok(false);
        }

        // The entry guard holds the shard lock, so check and insert are one step
        match self.entries.entry(nonce.to_string()) {
            Entry::Occupied(mut entry) => {
                if *entry.get() > now {
                    Ok(false)
                } else {
                    entry.insert(expires_at);
                    Ok(true)
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(expires_at);
                Ok(true)
            }
        }
    }
}
