//! LINE webhook signature verification
//!
//! LINE signs each webhook body with HMAC-SHA256 keyed by the channel secret
//! and sends the base64 digest in the `x-line-signature` header.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the body signature
pub const SIGNATURE_HEADER: &str = "x-line-signature";

/// Compute the base64-encoded signature of `body`
///
/// # Errors
///
/// Returns error if the channel secret is rejected as a MAC key
pub fn sign(channel_secret: &str, body: &[u8]) -> Result<String> {
    let Ok(mut mac) = HmacSha256::new_from_slice(channel_secret.as_bytes()) else {
        return Err(Error::Signature);
    };
    mac.update(body);
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Check `signature` against the body
#[must_use]
pub fn verify(channel_secret: &str, body: &[u8], signature: &str) -> bool {
    let Ok(decoded) = STANDARD.decode(signature.trim()) else {
        tracing::debug!("signature is not valid base64");
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(channel_secret.as_bytes()) else {
        return false;
    };
    mac.update(body);

    // Constant-time comparison
    mac.verify_slice(&decoded).is_ok()
}
