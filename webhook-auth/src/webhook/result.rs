//! Verification verdicts.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The three webhook headers the verifier knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderKind {
    Timestamp,
    Signature,
    Nonce,
}

impl HeaderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HeaderKind::Timestamp => "timestamp",
            HeaderKind::Signature => "signature",
            HeaderKind::Nonce => "nonce",
        }
    }
}

/// Why a delivery was rejected.
///
/// Messages never carry the secret, the provided signature, or the computed tag,
/// so they are safe to return to the sender or to write to logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FailureReason {
    MissingHeader { header: HeaderKind },
    InvalidTimestampFormat,
    TimestampOutOfWindow,
    SignatureMismatch,
    ReplayDetected,
    StoreUnavailable,
}

impl FailureReason {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            FailureReason::MissingHeader { .. } => "missing_header",
            FailureReason::InvalidTimestampFormat => "invalid_timestamp_format",
            FailureReason::TimestampOutOfWindow => "timestamp_out_of_window",
            FailureReason::SignatureMismatch => "signature_mismatch",
            FailureReason::ReplayDetected => "replay_detected",
            FailureReason::StoreUnavailable => "store_unavailable",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FailureReason::MissingHeader { header } => {
                write!(f, "missing {} header", header.as_str())
            }
            FailureReason::InvalidTimestampFormat => write!(f, "timestamp could not be parsed"),
            FailureReason::TimestampOutOfWindow => {
                write!(f, "timestamp outside the accepted window")
            }
            FailureReason::SignatureMismatch => write!(f, "signature does not match"),
            FailureReason::ReplayDetected => write!(f, "nonce has already been used"),
            FailureReason::StoreUnavailable => write!(f, "replay protection unavailable"),
        }
    }
}

impl std::error::Error for FailureReason {}

/// Outcome of a single verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct VerificationResult {
    reason: Option<FailureReason>,
}

impl VerificationResult {
    pub fn success() -> Self {
        Self { reason: None }
    }

    pub fn failure(reason: FailureReason) -> Self {
        Self {
            reason: Some(reason),
        }
    }

    pub fn is_success(&self) -> bool {
        self.reason.is_none()
    }

    /// The rejection reason, or `None` on success.
    pub fn reason(&self) -> Option<FailureReason> {
        self.reason
    }

    /// Converts into a `Result` so callers can use `?`.
    pub fn into_result(self) -> Result<(), FailureReason> {
        match self.reason {
            None => Ok(()),
            Some(reason) => Err(reason),
        }
    }
}

impl From<Result<(), FailureReason>> for VerificationResult {
    fn from(result: Result<(), FailureReason>) -> Self {
        match result {
            Ok(()) => Self::success(),
            Err(reason) => Self::failure(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_has_no_reason() {
        let result = VerificationResult::success();
        assert!(result.is_success());
        assert_eq!(result.reason(), None);
        assert_eq!(result.into_result(), Ok(()));
    }

    #[test]
    fn test_failure_carries_reason() {
        let result = VerificationResult::failure(FailureReason::ReplayDetected);
        assert!(!result.is_success());
        assert_eq!(result.reason(), Some(FailureReason::ReplayDetected));
        assert_eq!(result.into_result(), Err(FailureReason::ReplayDetected));
    }

    #[test]
    fn test_codes_are_stable() {
        let missing = FailureReason::MissingHeader {
            header: HeaderKind::Nonce,
        };
        assert_eq!(missing.code(), "missing_header");
        assert_eq!(missing.to_string(), "missing nonce header");
        assert_eq!(
            FailureReason::TimestampOutOfWindow.code(),
            "timestamp_out_of_window"
        );
        assert_eq!(FailureReason::StoreUnavailable.code(), "store_unavailable");
    }

    #[test]
    fn test_from_result_round_trip() {
        let result: VerificationResult = Err(FailureReason::SignatureMismatch).into();
        assert_eq!(result.reason(), Some(FailureReason::SignatureMismatch));
    }
}
