//! Request signatures.
//!
//! A signature is the hex HMAC-SHA256 of `METHOD ‖ PATH ‖ BODY ‖ TIMESTAMP`,
//! keyed by the caller's credential token.

use hmac::{Hmac, Mac, digest::InvalidLength};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Characters of a secret that may appear in logs.
const MASK_VISIBLE_CHARS: usize = 8;

fn mac(
    key: &str,
    method: &str,
    path: &str,
    body: &[u8],
    timestamp: i64,
) -> Result<HmacSha256, InvalidLength> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key.as_bytes())?;

    mac.update(method.as_bytes());
    mac.update(path.as_bytes());
    mac.update(body);
    mac.update(timestamp.to_string().as_bytes());

    Ok(mac)
}

/// Hex signature a well-behaved client sends for this request.
///
/// # Errors
///
/// Returns an error when the key is rejected by the MAC.
pub fn sign_request(
    key: &str,
    method: &str,
    path: &str,
    body: &[u8],
    timestamp: i64,
) -> Result<String, InvalidLength> {
    let mac = mac(key, method, path, body, timestamp)?;

    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time comparison of a presented hex signature.
#[must_use]
pub fn signature_matches(
    key: &str,
    method: &str,
    path: &str,
    body: &[u8],
    timestamp: i64,
    presented_hex: &str,
) -> bool {
    let Ok(presented) = hex::decode(presented_hex.trim()) else {
        return false;
    };

    let Ok(mac) = mac(key, method, path, body, timestamp) else {
        return false;
    };

    let expected = mac.finalize().into_bytes();

    expected.as_slice().ct_eq(&presented).into()
}

/// Bounded prefix of a secret for log lines.
#[must_use]
pub fn mask_secret(secret: &str) -> String {
    let visible: String = secret.chars().take(MASK_VISIBLE_CHARS).collect();

    format!("{visible}…")
}
