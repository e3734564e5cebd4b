//! # webhook-auth
//!
//! Authentication of inbound payment-provider webhooks:
//! - HMAC-SHA256 signatures over `timestamp \n nonce \n body`
//! - Timestamp freshness with symmetric skew and an optional maximum age
//! - Replay protection through an atomic nonce reservation
//!
//! ## Architecture
//!
//! The crate is transport agnostic. Callers hand over the raw body, the header
//! values, and a reference time; the [`webhook::Verifier`] answers with a
//! [`webhook::VerificationResult`]. Nonce stores sit behind the
//! [`nonce::NonceStore`] trait:
//! - [`nonce::InMemoryNonceStore`] for single-instance deployments
//! - `nonce::RedisNonceStore` (feature `redis-store`) for shared deployments
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use webhook_auth::{
//!     nonce::InMemoryNonceStore,
//!     webhook::{Verifier, VerifierConfig},
//! };
//!
//! let config = VerifierConfig::builder("shared_secret").build()?;
//! let verifier = Verifier::new(config, Arc::new(InMemoryNonceStore::new()));
//!
//! let headers = verifier.headers(request_headers);
//! let result = verifier.verify_now(&body, &headers).await;
//! ```

pub mod clock;
pub mod error;
pub mod nonce;
pub mod webhook;

// Re-export commonly used types
pub use error::{Error, ErrorKind};
pub use webhook::{FailureReason, VerificationResult, Verifier, VerifierConfig};
