//! Webhook authentication: headers, canonical message, signature, timestamp
//! window, and the verifier that runs them in order.

mod canonical;
mod config;
mod headers;
mod hmac;
mod result;
mod timestamp;
mod verifier;

pub use canonical::canonical_message;
pub use config::{
    HeaderName, HeaderNames, NoncePolicy, NoncePolicyParseError, VerifierConfig,
    VerifierConfigBuilder, DEFAULT_NONCE_HEADER, DEFAULT_SIGNATURE_HEADER,
    DEFAULT_TIMESTAMP_HEADER, MAX_CONFIGURED_DURATION_SECS,
};
pub use headers::WebhookHeaders;
pub use self::hmac::{decode_signature, HmacSigner};
pub use result::{FailureReason, HeaderKind, VerificationResult};
pub use timestamp::{parse_timestamp, TimestampWindow};
pub use verifier::Verifier;
