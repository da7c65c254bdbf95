//! HMAC-SHA256 signatures for inbound settlement webhooks.
//!
//! The processor sends `t=<unix seconds>,v1=<hex digest>` where the digest is
//! `HMAC-SHA256(secret, "<t>.<raw body>")`.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Reasons a signature header is rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    /// Header is missing a timestamp or digest.
    #[error("malformed signature header")]
    Malformed,
    /// Timestamp is outside the accepted window.
    #[error("signature timestamp outside tolerance")]
    Stale,
    /// Digest does not match the payload.
    #[error("signature mismatch")]
    Mismatch,
}

/// Computes the hex digest for a payload signed at `timestamp`.
#[must_use]
pub fn sign(secret: &str, timestamp: i64, body: &[u8]) -> String {
    // HMAC accepts keys of any length.
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("hmac key of any size is valid"));
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Builds a complete header value, used by tests and local tooling.
#[must_use]
pub fn header_value(secret: &str, timestamp: i64, body: &[u8]) -> String {
    format!("t={timestamp},v1={}", sign(secret, timestamp, body))
}

/// Verifies a signature header against the raw request body.
pub fn verify(
    secret: &str,
    header: &str,
    body: &[u8],
    now_unix: i64,
    tolerance_secs: i64,
) -> Result<(), SignatureError> {
    let mut timestamp = None;
    let mut digest = None;
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => digest = Some(value),
            _ => {}
        }
    }
    let (Some(timestamp), Some(digest)) = (timestamp, digest) else {
        return Err(SignatureError::Malformed);
    };

    if (now_unix - timestamp).abs() > tolerance_secs {
        return Err(SignatureError::Stale);
    }

    let expected = sign(secret, timestamp, body);
    if expected.len() != digest.len() {
        return Err(SignatureError::Mismatch);
    }
    if bool::from(expected.as_bytes().ct_eq(digest.as_bytes())) {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";
    const BODY: &[u8] = br#"{"event_id":"evt_1"}"#;

    #[test]
    fn test_valid_signature() {
        let header = header_value(SECRET, 1_700_000_000, BODY);
        assert_eq!(verify(SECRET, &header, BODY, 1_700_000_010, 300), Ok(()));
    }

    #[test]
    fn test_tampered_body() {
        let header = header_value(SECRET, 1_700_000_000, BODY);
        let result = verify(SECRET, &header, br#"{"event_id":"evt_2"}"#, 1_700_000_000, 300);
        assert_eq!(result, Err(SignatureError::Mismatch));
    }

    #[test]
    fn test_wrong_secret() {
        let header = header_value("other", 1_700_000_000, BODY);
        let result = verify(SECRET, &header, BODY, 1_700_000_000, 300);
        assert_eq!(result, Err(SignatureError::Mismatch));
    }

    #[test]
    fn test_stale_timestamp() {
        let header = header_value(SECRET, 1_700_000_000, BODY);
        let result = verify(SECRET, &header, BODY, 1_700_000_301, 300);
        assert_eq!(result, Err(SignatureError::Stale));
    }

    #[test]
    fn test_malformed_header() {
        assert_eq!(
            verify(SECRET, "garbage", BODY, 0, 300),
            Err(SignatureError::Malformed)
        );
        assert_eq!(
            verify(SECRET, "t=abc,v1=00", BODY, 0, 300),
            Err(SignatureError::Malformed)
        );
    }
}
