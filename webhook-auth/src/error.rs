//! Error types for the `webhook-auth` crate.
//!
//! Verification failures are not errors: they are returned as
//! [`crate::webhook::VerificationResult`] values. This type covers the things
//! that can go wrong around verification: bad configuration, an unreachable
//! nonce store, and signatures that cannot be produced or decoded.

use std::error::Error as StdError;
use std::fmt;

/// Top-level error type for webhook-auth crate.
/// Holds error kind and optional source for error chaining.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

/// Major categories of errors in webhook-auth.
#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    Config(ConfigErrorKind),
    Store(StoreErrorKind),
    Signature(SignatureErrorKind),
}

/// Errors from verifier configuration.
#[derive(Debug, PartialEq)]
pub enum ConfigErrorKind {
    EmptySecret,
    NegativeSkew,
    NegativeMaxAge,
    NegativeNonceTtl,
    DurationTooLong,
    InvalidStoreTimeout,
    InvalidHeaderName,
}

/// Errors from nonce store operations.
#[derive(Debug, PartialEq)]
pub enum StoreErrorKind {
    Connection,
    Unavailable,
    InvalidNonce,
}

/// Errors from signature handling.
#[derive(Debug, PartialEq)]
pub enum SignatureErrorKind {
    Decode,
    InvalidKey,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            ErrorKind::Config(kind) => write!(f, "Configuration error: {:?}", kind),
            ErrorKind::Store(kind) => write!(f, "Nonce store error: {:?}", kind),
            ErrorKind::Signature(kind) => write!(f, "Signature error: {:?}", kind),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

#[cfg(feature = "redis-store")]
impl From<redis::RedisError> for Error {
    fn from(err: redis::RedisError) -> Self {
        let error_kind = if err.is_connection_refusal() || err.is_connection_dropped() {
            ErrorKind::Store(StoreErrorKind::Connection)
        } else {
            ErrorKind::Store(StoreErrorKind::Unavailable)
        };

        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

impl Error {
    /// Returns `true` if this error came from the nonce store.
    pub fn is_store(&self) -> bool {
        matches!(self.error_kind, ErrorKind::Store(_))
    }
}

/// Helper function to create configuration errors.
pub fn config_error(kind: ConfigErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Config(kind),
    }
}

/// Helper function to create nonce store errors.
pub fn store_error(kind: StoreErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Store(kind),
    }
}

/// Helper function to create signature errors.
pub fn signature_error(kind: SignatureErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Signature(kind),
    }
}
