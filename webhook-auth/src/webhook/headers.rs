//! Header normalization.
//!
//! Folds an arbitrary header bag (any case, legacy aliases) into the three
//! typed fields the verifier works with.

use super::config::{HeaderName, HeaderNames};

/// The verification-relevant header values of one delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebhookHeaders {
    pub timestamp: Option<String>,
    pub signature: Option<String>,
    pub nonce: Option<String>,
}

impl WebhookHeaders {
    pub fn new(timestamp: Option<&str>, signature: Option<&str>, nonce: Option<&str>) -> Self {
        Self {
            timestamp: normalize_value(timestamp),
            signature: normalize_value(signature),
            nonce: normalize_value(nonce),
        }
    }

    /// Extract the recognized headers from `(name, value)` pairs.
    ///
    /// Names match case-insensitively. When the same header arrives under
    /// several names, the canonical name wins over aliases and earlier aliases
    /// win over later ones. Blank values count as absent.
    pub fn from_pairs<I, K, V>(names: &HeaderNames, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut timestamp = Slot::default();
        let mut signature = Slot::default();
        let mut nonce = Slot::default();

        for (name, value) in pairs {
            let name = name.as_ref().trim();
            let value = value.as_ref();
            timestamp.offer(&names.timestamp, name, value);
            signature.offer(&names.signature, name, value);
            nonce.offer(&names.nonce, name, value);
        }

        Self {
            timestamp: timestamp.value,
            signature: signature.value,
            nonce: nonce.value,
        }
    }
}

#[derive(Default)]
struct Slot {
    rank: Option<usize>,
    value: Option<String>,
}

impl Slot {
    fn offer(&mut self, header: &HeaderName, name: &str, value: &str) {
        let Some(rank) = header.rank(name) else {
            return;
        };
        let Some(value) = normalize_value(Some(value)) else {
            return;
        };
        if self.rank.map_or(true, |current| rank < current) {
            self.rank = Some(rank);
            self.value = Some(value);
        }
    }
}

// Surrounding whitespace is not part of an HTTP field value.
fn normalize_value(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let headers = WebhookHeaders::from_pairs(
            &HeaderNames::default(),
            [
                ("x-swish-timestamp", "1700000000"),
                ("X-SWISH-SIGNATURE", "abc"),
                ("X-Swish-Nonce", "n1"),
            ],
        );
        assert_eq!(headers.timestamp.as_deref(), Some("1700000000"));
        assert_eq!(headers.signature.as_deref(), Some("abc"));
        assert_eq!(headers.nonce.as_deref(), Some("n1"));
    }

    #[test]
    fn test_aliases_are_folded() {
        let headers = WebhookHeaders::from_pairs(
            &HeaderNames::default(),
            [("X-Timestamp", "1"), ("x-signature", "sig"), ("X-Nonce", "n")],
        );
        assert_eq!(headers, WebhookHeaders::new(Some("1"), Some("sig"), Some("n")));
    }

    #[test]
    fn test_canonical_name_wins_over_alias() {
        let headers = WebhookHeaders::from_pairs(
            &HeaderNames::default(),
            [("X-Signature", "alias"), ("X-Swish-Signature", "canonical")],
        );
        assert_eq!(headers.signature.as_deref(), Some("canonical"));
    }

    #[test]
    fn test_blank_values_are_absent() {
        let headers = WebhookHeaders::from_pairs(
            &HeaderNames::default(),
            [("X-Swish-Nonce", "   "), ("X-Swish-Timestamp", "")],
        );
        assert_eq!(headers.nonce, None);
        assert_eq!(headers.timestamp, None);
    }

    #[test]
    fn test_blank_canonical_falls_back_to_alias() {
        let headers = WebhookHeaders::from_pairs(
            &HeaderNames::default(),
            [("X-Swish-Nonce", ""), ("X-Nonce", "fallback")],
        );
        assert_eq!(headers.nonce.as_deref(), Some("fallback"));
    }

    #[test]
    fn test_unrelated_headers_are_ignored() {
        let headers = WebhookHeaders::from_pairs(
            &HeaderNames::default(),
            [("Content-Type", "application/json"), ("X-Request-Id", "r")],
        );
        assert_eq!(headers, WebhookHeaders::default());
    }

    #[test]
    fn test_values_are_trimmed() {
        let headers = WebhookHeaders::new(Some(" 1700000000 "), None, None);
        assert_eq!(headers.timestamp.as_deref(), Some("1700000000"));
    }
}
