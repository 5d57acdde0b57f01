//! Cryptographic utilities for webhook verification.
//!
//! This module provides shared cryptographic functions for verifying webhook
//! signatures from Stripe, `SumUp` and Adyen.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use ibe_core::PaymentError;

type HmacSha256 = Hmac<Sha256>;

/// Stripe rejects signatures older than this many seconds.
pub const STRIPE_SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Compute HMAC-SHA256 over `message` with a raw key.
///
/// # Panics
///
/// This function will never panic in practice. The `expect` call is guarded by
/// the invariant that HMAC-SHA256 accepts keys of any size per RFC 2104.
#[must_use]
pub fn hmac_sha256(key: &[u8], message: &[u8]) -> Vec<u8> {
    // INVARIANT: HMAC-SHA256 accepts keys of any size per RFC 2104, so
    // `new_from_slice` only fails if the Hmac implementation is broken.
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC-SHA256 accepts any key size");
    mac.update(message);
    mac.finalize().into_bytes().to_vec()
}

/// Compute HMAC-SHA256 and return hex-encoded result.
///
/// # Returns
///
/// A hex-encoded string of the HMAC-SHA256 result (64 characters).
#[must_use]
pub fn hmac_sha256_hex(secret: &str, message: &str) -> String {
    hex::encode(hmac_sha256(secret.as_bytes(), message.as_bytes()))
}

/// Constant-time string comparison to prevent timing attacks.
///
/// This function compares two strings in constant time to prevent timing
/// side-channel attacks when verifying cryptographic signatures.
#[must_use]
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

/// Verify a `Stripe-Signature` header.
///
/// Header format: `t=timestamp,v1=signature,v1=signature2,...`. The signed
/// payload is `"{timestamp}.{payload}"`.
///
/// # Errors
///
/// Returns `PaymentError::InvalidSignature` if the header is malformed, the
/// timestamp is outside the tolerance window, or no signature matches.
pub fn verify_stripe_signature(
    payload: &str,
    header: &str,
    secret: &str,
    now: i64,
) -> Result<(), PaymentError> {
    let mut timestamp: Option<&str> = None;
    let mut signatures: Vec<&str> = Vec::new();

    for part in header.split(',') {
        let mut kv = part.trim().splitn(2, '=');
        match (kv.next(), kv.next()) {
            (Some("t"), Some(ts)) => timestamp = Some(ts),
            (Some("v1"), Some(sig)) => signatures.push(sig),
            _ => {}
        }
    }

    let timestamp =
        timestamp.ok_or_else(|| PaymentError::InvalidSignature("missing timestamp".into()))?;
    let ts: i64 = timestamp
        .parse()
        .map_err(|_| PaymentError::InvalidSignature("malformed timestamp".into()))?;

    if signatures.is_empty() {
        return Err(PaymentError::InvalidSignature(
            "no v1 signature in header".into(),
        ));
    }

    if (now - ts).abs() > STRIPE_SIGNATURE_TOLERANCE_SECS {
        return Err(PaymentError::InvalidSignature(
            "timestamp outside tolerance".into(),
        ));
    }

    let expected = hmac_sha256_hex(secret, &format!("{timestamp}.{payload}"));

    if signatures.iter().any(|sig| constant_time_eq(&expected, sig)) {
        Ok(())
    } else {
        Err(PaymentError::InvalidSignature("signature mismatch".into()))
    }
}

/// Compute an Adyen notification HMAC: base64 of HMAC-SHA256 keyed with the
/// hex-decoded key.
///
/// # Errors
///
/// Returns `PaymentError::Configuration` if the key is not valid hex.
pub fn adyen_hmac_base64(hex_key: &str, message: &str) -> Result<String, PaymentError> {
    let key = hex::decode(hex_key)
        .map_err(|e| PaymentError::Configuration(format!("Adyen HMAC key is not hex: {e}")))?;
    Ok(BASE64.encode(hmac_sha256(&key, message.as_bytes())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hmac_sha256_matches_rfc4231_case_2() {
        let result = hmac_sha256_hex("Jefe", "what do ya want for nothing?");
        assert_eq!(
            result,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn hmac_sha256_different_inputs() {
        let result1 = hmac_sha256_hex("secret", "message1");
        let result2 = hmac_sha256_hex("secret", "message2");
        assert_ne!(result1, result2);
    }

    #[test]
    fn constant_time_eq_equal_strings() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(constant_time_eq("", ""));
    }

    #[test]
    fn constant_time_eq_different_strings() {
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "ab"));
        assert!(!constant_time_eq("abc", "ABC"));
    }

    #[test]
    fn stripe_signature_accepts_valid_header() {
        let payload = r#"{"id":"evt_1"}"#;
        let sig = hmac_sha256_hex("whsec_test", &format!("1700000000.{payload}"));
        let header = format!("t=1700000000,v1={sig}");
        verify_stripe_signature(payload, &header, "whsec_test", 1_700_000_100).unwrap();
    }

    #[test]
    fn stripe_signature_rejects_tampered_payload() {
        let sig = hmac_sha256_hex("whsec_test", "1700000000.original");
        let header = format!("t=1700000000,v1={sig}");
        let result = verify_stripe_signature("tampered", &header, "whsec_test", 1_700_000_000);
        assert!(matches!(result, Err(PaymentError::InvalidSignature(_))));
    }

    #[test]
    fn stripe_signature_rejects_stale_timestamp() {
        let sig = hmac_sha256_hex("whsec_test", "1700000000.body");
        let header = format!("t=1700000000,v1={sig}");
        let result = verify_stripe_signature("body", &header, "whsec_test", 1_700_000_301);
        assert!(matches!(result, Err(PaymentError::InvalidSignature(_))));
    }

    #[test]
    fn stripe_signature_rejects_garbage_header() {
        assert!(verify_stripe_signature("body", "garbage", "whsec_test", 0).is_err());
        assert!(verify_stripe_signature("body", "t=1", "whsec_test", 1).is_err());
    }

    #[test]
    fn adyen_hmac_requires_hex_key() {
        assert!(matches!(
            adyen_hmac_base64("not-hex", "data"),
            Err(PaymentError::Configuration(_))
        ));
        let sig = adyen_hmac_base64("00112233", "data").unwrap();
        assert_eq!(sig.len(), 44);
    }
}
