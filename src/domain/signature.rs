//! Request signing and verification for the proxy handshake.
//!
//! Every request exchanged with the remote payment service carries an
//! HMAC-SHA256 hash over a canonical string: the timestamp, the
//! scheme-specific fields in a fixed order, and finally the API key. The
//! field order is part of the wire protocol and must match the counterpart
//! service exactly; it is not alphabetical.
//!
//! # Security
//!
//! - HMAC-SHA256 with the shared API secret (never transmitted)
//! - Constant-time comparison on verification
//! - Any mismatch is an authentication failure; never retried

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Signs and verifies proxy request hashes.
///
/// Cheap to clone; holds the storefront's API key and the shared secret.
#[derive(Clone)]
pub struct RequestSigner {
    api_key: String,
    api_secret: SecretString,
}

impl RequestSigner {
    pub fn new(api_key: impl Into<String>, api_secret: SecretString) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret,
        }
    }

    /// The API key identifying this storefront to the remote service.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Sign the canonical concatenation of `parts` followed by the API key.
    ///
    /// Callers are responsible for passing the scheme's fields in wire order;
    /// prefer the scheme-specific helpers below.
    pub fn sign(&self, parts: &[&str]) -> String {
        let mut canonical = String::new();
        for part in parts {
            canonical.push_str(part);
        }
        canonical.push_str(&self.api_key);

        let mut mac = HmacSha256::new_from_slice(self.api_secret.expose_secret().as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(canonical.as_bytes());
        hex_encode(&mac.finalize().into_bytes())
    }

    /// Verify a provided hex hash against the canonical string for `parts`.
    ///
    /// Comparison is constant-time. A hash that is not valid hex fails
    /// verification rather than erroring.
    pub fn verify(&self, parts: &[&str], provided: &str) -> bool {
        let Some(provided_bytes) = hex_decode(provided) else {
            return false;
        };
        let expected = self.sign(parts);
        let expected_bytes = hex_decode(&expected).expect("signer output is valid hex");

        if expected_bytes.len() != provided_bytes.len() {
            return false;
        }
        expected_bytes.ct_eq(provided_bytes.as_slice()).unwrap_u8() == 1
    }

    /// Hash for the `register-order` scheme:
    /// `{timestamp, order_id, order_total, api_key}`.
    pub fn sign_order_registration(&self, timestamp: i64, order_id: u64, order_total: &str) -> String {
        self.sign(&[
            &timestamp.to_string(),
            &order_id.to_string(),
            order_total,
        ])
    }

    /// Hash for the `verify-payment` scheme:
    /// `{timestamp, paypal_order_id, order_id, api_key}`.
    pub fn sign_payment_verification(
        &self,
        timestamp: i64,
        paypal_order_id: &str,
        order_id: u64,
    ) -> String {
        self.sign(&[
            &timestamp.to_string(),
            paypal_order_id,
            &order_id.to_string(),
        ])
    }

    /// Hash for the `paypal-buttons` iframe boot scheme:
    /// `{timestamp, amount, currency, api_key}`.
    pub fn sign_button_session(&self, timestamp: i64, amount: &str, currency: &str) -> String {
        self.sign(&[&timestamp.to_string(), amount, currency])
    }

    /// Hash for the redirect callback scheme: `{order_id, status, api_key}`.
    ///
    /// The callback contract carries no timestamp; this matches the
    /// counterpart service's wire format.
    pub fn sign_callback(&self, order_id: u64, status: &str) -> String {
        self.sign(&[&order_id.to_string(), status])
    }

    /// Verify a callback hash in constant time.
    pub fn verify_callback(&self, order_id: u64, status: &str, hash: &str) -> bool {
        self.verify(&[&order_id.to_string(), status], hash)
    }
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner")
            .field("api_key", &self.api_key)
            .field("api_secret", &"[redacted]")
            .finish()
    }
}

/// Encode bytes to a lowercase hex string.
pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Decode a hex string to bytes. Returns `None` on invalid input.
///
/// The input reaches this function straight from the wire, so anything
/// that is not plain even-length ASCII hex is rejected rather than
/// assumed to be sliceable at byte offsets.
pub fn hex_decode(hex: &str) -> Option<Vec<u8>> {
    let hex = hex.trim();
    if hex.len() % 2 != 0 || !hex.is_ascii() {
        return None;
    }

    let mut bytes = Vec::with_capacity(hex.len() / 2);
    for pair in hex.as_bytes().chunks_exact(2) {
        let pair = std::str::from_utf8(pair).ok()?;
        bytes.push(u8::from_str_radix(pair, 16).ok()?);
    }
    Some(bytes)
}
