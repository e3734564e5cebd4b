//! The verification pipeline.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, warn};

use super::config::{NoncePolicy, VerifierConfig};
use super::headers::WebhookHeaders;
use super::hmac::HmacSigner;
use super::result::{FailureReason, HeaderKind, VerificationResult};
use super::timestamp::TimestampWindow;
use crate::clock::{Clock, SystemClock};
use crate::nonce::NonceStore;

/// Webhook verifier.
///
/// Runs each delivery through four stages, stopping at the first failure:
/// 1. Required headers are present
/// 2. The timestamp parses and lies inside the window
/// 3. The signature matches the canonical message
/// 4. The nonce is reserved in the store
///
/// The nonce is reserved only after the signature checks out, so a caller
/// without the secret can neither force store I/O nor burn a legitimate
/// sender's nonce. Stages 1-3 never touch the store.
///
/// The verifier holds no mutable state; share it freely across tasks.
pub struct Verifier {
    config: VerifierConfig,
    store: Arc<dyn NonceStore>,
    clock: Arc<dyn Clock>,
}

/// A delivery that passed stages 1-3 and still needs its nonce reserved.
struct Authenticated<'h> {
    nonce: Option<&'h str>,
}

impl Verifier {
    /// Create a verifier over a shared nonce store.
    pub fn new(config: VerifierConfig, store: Arc<dyn NonceStore>) -> Self {
        Self {
            config,
            store,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock used by [`Verifier::verify_now`].
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Normalize raw `(name, value)` header pairs using the configured names.
    pub fn headers<I, K, V>(&self, pairs: I) -> WebhookHeaders
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        WebhookHeaders::from_pairs(self.config.header_names(), pairs)
    }

    /// Verify a delivery against the reference time `now`.
    ///
    /// `body` must be the raw request body exactly as received.
    pub async fn verify(
        &self,
        body: &[u8],
        headers: &WebhookHeaders,
        now: DateTime<Utc>,
    ) -> VerificationResult {
        self.verify_with_cancel(body, headers, now, std::future::pending::<()>())
            .await
    }

    /// Verify a delivery against the verifier's clock.
    pub async fn verify_now(&self, body: &[u8], headers: &WebhookHeaders) -> VerificationResult {
        let now = self.clock.now();
        self.verify(body, headers, now).await
    }

    /// Verify a delivery, abandoning the nonce reservation if `cancel`
    /// completes first.
    ///
    /// A cancelled reservation is inconclusive and is reported as
    /// `StoreUnavailable`. Local failures are returned before `cancel` is
    /// ever polled.
    pub async fn verify_with_cancel<F>(
        &self,
        body: &[u8],
        headers: &WebhookHeaders,
        now: DateTime<Utc>,
        cancel: F,
    ) -> VerificationResult
    where
        F: Future<Output = ()>,
    {
        let authenticated = match self.authenticate(body, headers, now) {
            Ok(authenticated) => authenticated,
            Err(reason) => return self.reject(reason, headers),
        };

        let Some(nonce) = authenticated.nonce else {
            debug!("Webhook accepted without nonce");
            return VerificationResult::success();
        };

        let outcome = tokio::select! {
            biased;
            _ = cancel => {
                warn!("Nonce reservation cancelled, nonce={}", nonce);
                Err(FailureReason::StoreUnavailable)
            }
            outcome = self.reserve(nonce, now) => outcome,
        };

        match outcome {
            Ok(()) => {
                debug!("Webhook accepted, nonce={}", nonce);
                VerificationResult::success()
            }
            Err(reason) => self.reject(reason, headers),
        }
    }

    /// Stages 1-3. Pure and synchronous.
    fn authenticate<'h>(
        &self,
        body: &[u8],
        headers: &'h WebhookHeaders,
        now: DateTime<Utc>,
    ) -> Result<Authenticated<'h>, FailureReason> {
        let timestamp = headers.timestamp.as_deref().ok_or(FailureReason::MissingHeader {
            header: HeaderKind::Timestamp,
        })?;
        let signature = headers.signature.as_deref().ok_or(FailureReason::MissingHeader {
            header: HeaderKind::Signature,
        })?;
        let nonce = match self.config.nonce_policy() {
            NoncePolicy::Required => Some(headers.nonce.as_deref().ok_or(
                FailureReason::MissingHeader {
                    header: HeaderKind::Nonce,
                },
            )?),
            NoncePolicy::Optional => headers.nonce.as_deref(),
            NoncePolicy::Disabled => None,
        };

        let window = TimestampWindow::new(self.config.allowed_skew(), self.config.max_age());
        window.validate(timestamp, now)?;

        let signer = HmacSigner::new(self.config.secret());
        match signer.verify(timestamp, nonce.unwrap_or(""), body, signature) {
            Ok(true) => {}
            Ok(false) => return Err(FailureReason::SignatureMismatch),
            Err(e) => {
                debug!("Signature could not be decoded: {}", e);
                return Err(FailureReason::SignatureMismatch);
            }
        }

        Ok(Authenticated { nonce })
    }

    /// Stage 4. Fails closed: an unreachable or slow store rejects the delivery.
    async fn reserve(&self, nonce: &str, now: DateTime<Utc>) -> Result<(), FailureReason> {
        let Some(expires_at) = now.checked_add_signed(self.config.nonce_ttl()) else {
            error!("Nonce expiry overflows for reference time {}", now);
            return Err(FailureReason::StoreUnavailable);
        };
        let timeout = self
            .config
            .store_timeout()
            .to_std()
            .map_err(|_| FailureReason::StoreUnavailable)?;

        match tokio::time::timeout(timeout, self.store.reserve(nonce, now, expires_at)).await {
            Ok(Ok(true)) => Ok(()),
            Ok(Ok(false)) => Err(FailureReason::ReplayDetected),
            Ok(Err(e)) => {
                error!("Nonce store unavailable: {}", e);
                Err(FailureReason::StoreUnavailable)
            }
            Err(_) => {
                error!("Nonce store did not answer within {:?}", timeout);
                Err(FailureReason::StoreUnavailable)
            }
        }
    }

    fn reject(&self, reason: FailureReason, headers: &WebhookHeaders) -> VerificationResult {
        warn!(
            "Webhook rejected, reason={}, nonce={}",
            reason.code(),
            headers.nonce.as_deref().unwrap_or("(none)")
        );
        VerificationResult::failure(reason)
    }
}
