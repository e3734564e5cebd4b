//! Canonical message construction.

/// Build the exact byte sequence that is signed:
/// `timestamp + "\n" + nonce + "\n" + body`.
///
/// `timestamp` must be the literal header value. The body is copied verbatim;
/// an absent nonce is passed as `""` and its separator is kept.
pub fn canonical_message(timestamp: &str, nonce: &str, body: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(timestamp.len() + nonce.len() + body.len() + 2);
    message.extend_from_slice(timestamp.as_bytes());
    message.push(b'\n');
    message.extend_from_slice(nonce.as_bytes());
    message.push(b'\n');
    message.extend_from_slice(body);
    message
}
