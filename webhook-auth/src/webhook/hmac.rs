//! HMAC-SHA256 webhook signing and signature comparison.

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::canonical::canonical_message;
use crate::error::{signature_error, Error, SignatureErrorKind};

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_PREFIX: &str = "sha256=";

/// HMAC-SHA256 signer over the canonical message.
///
/// Produces base64 signatures and accepts hex (any case) or base64 when
/// verifying. Comparison runs over decoded bytes in constant time.
pub struct HmacSigner<'a> {
    key: &'a [u8],
}

impl<'a> HmacSigner<'a> {
    /// Create a signer over the shared secret.
    pub fn new(key: &'a [u8]) -> Self {
        Self { key }
    }

    /// Sign a delivery and return the signature as standard base64.
    pub fn sign(&self, timestamp: &str, nonce: &str, body: &[u8]) -> Result<String, Error> {
        let tag = self.mac(timestamp, nonce, body)?.finalize().into_bytes();
        Ok(STANDARD.encode(tag))
    }

    /// Sign a delivery and return the signature as lowercase hex.
    pub fn sign_hex(&self, timestamp: &str, nonce: &str, body: &[u8]) -> Result<String, Error> {
        let tag = self.mac(timestamp, nonce, body)?.finalize().into_bytes();
        Ok(hex::encode(tag))
    }

    /// Check `provided` against the tag computed for this delivery.
    ///
    /// Returns `Ok(false)` on mismatch and a `Signature(Decode)` error when
    /// `provided` is neither hex nor base64.
    pub fn verify(
        &self,
        timestamp: &str,
        nonce: &str,
        body: &[u8],
        provided: &str,
    ) -> Result<bool, Error> {
        let provided = decode_signature(provided)?;
        let mac = self.mac(timestamp, nonce, body)?;

        // verify_slice checks the length, then compares in constant time
        Ok(mac.verify_slice(&provided).is_ok())
    }

    fn mac(&self, timestamp: &str, nonce: &str, body: &[u8]) -> Result<HmacSha256, Error> {
        let mut mac = HmacSha256::new_from_slice(self.key)
            .map_err(|_| signature_error(SignatureErrorKind::InvalidKey, "Invalid HMAC key"))?;
        mac.update(&canonical_message(timestamp, nonce, body));
        Ok(mac)
    }
}

/// Decode a provided signature into raw tag bytes.
///
/// An optional `sha256=` prefix is stripped. Even-length strings made only of
/// hex digits are read as hex; everything else must be standard base64, with
/// or without padding.
pub fn decode_signature(provided: &str) -> Result<Vec<u8>, Error> {
    let provided = provided.trim();
    let provided = match provided.get(..SIGNATURE_PREFIX.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(SIGNATURE_PREFIX) => {
            &provided[SIGNATURE_PREFIX.len()..]
        }
        _ => provided,
    };

    if provided.is_empty() {
        return Err(signature_error(
            SignatureErrorKind::Decode,
            "Empty signature",
        ));
    }

    if provided.len() % 2 == 0 && provided.bytes().all(|b| b.is_ascii_hexdigit()) {
        return hex::decode(provided).map_err(|_| {
            signature_error(SignatureErrorKind::Decode, "Invalid hex signature")
        });
    }

    STANDARD
        .decode(provided)
        .or_else(|_| STANDARD_NO_PAD.decode(provided))
        .map_err(|_| signature_error(SignatureErrorKind::Decode, "Invalid signature format"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const SECRET: &[u8] = b"dev_secret";
    const BODY: &[u8] = br#"{"id":"t1","amount":50}"#;

    fn reference_tag(canonical: &str) -> Vec<u8> {
        let mut mac = HmacSha256::new_from_slice(SECRET).unwrap();
        mac.update(canonical.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }

    #[test]
    fn test_sign_matches_reference_hmac() {
        let signer = HmacSigner::new(SECRET);
        let signature = signer.sign("1700000000", "n1", BODY).unwrap();

        let expected = reference_tag("1700000000\nn1\n{\"id\":\"t1\",\"amount\":50}");
        assert_eq!(STANDARD.decode(signature).unwrap(), expected);
    }

    #[test]
    fn test_valid_signature_in_every_encoding() {
        let signer = HmacSigner::new(SECRET);
        let b64 = signer.sign("1700000000", "n1", BODY).unwrap();
        let hex_lower = signer.sign_hex("1700000000", "n1", BODY).unwrap();
        let hex_upper = hex_lower.to_uppercase();
        let b64_unpadded = b64.trim_end_matches('=').to_string();
        let prefixed = format!("sha256={}", hex_lower);

        for provided in [&b64, &hex_lower, &hex_upper, &b64_unpadded, &prefixed] {
            assert!(
                signer.verify("1700000000", "n1", BODY, provided).unwrap(),
                "rejected {}",
                provided
            );
        }
    }

    #[test]
    fn test_mutated_body_is_rejected() {
        let signer = HmacSigner::new(SECRET);
        let signature = signer.sign("1700000000", "n1", BODY).unwrap();

        for i in 0..BODY.len() {
            let mut mutated = BODY.to_vec();
            mutated[i] ^= 0x01;
            assert!(!signer.verify("1700000000", "n1", &mutated, &signature).unwrap());
        }
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let signature = HmacSigner::new(SECRET).sign("1", "n", BODY).unwrap();
        assert!(!HmacSigner::new(b"other").verify("1", "n", BODY, &signature).unwrap());
    }

    #[test]
    fn test_truncated_signature_is_rejected() {
        let signer = HmacSigner::new(SECRET);
        let hex_sig = signer.sign_hex("1", "n", BODY).unwrap();
        assert!(!signer.verify("1", "n", BODY, &hex_sig[..62]).unwrap());
    }

    #[test]
    fn test_invalid_encoding_is_decode_error() {
        let signer = HmacSigner::new(SECRET);
        for provided in ["invalid!", "not base64 at all", "sha256=", "%%%%"] {
            let err = signer.verify("1", "n", BODY, provided).unwrap_err();
            assert_eq!(err.error_kind, ErrorKind::Signature(SignatureErrorKind::Decode));
        }
    }

    #[test]
    fn test_decode_signature_hex_and_base64_agree() {
        let tag = reference_tag("x");
        assert_eq!(decode_signature(&hex::encode(&tag)).unwrap(), tag);
        assert_eq!(decode_signature(&STANDARD.encode(&tag)).unwrap(), tag);
    }
}
