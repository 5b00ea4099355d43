//! Session id and nonce generation for authentication.

use base64::{engine::general_purpose, Engine as _};
use rand::distributions::Alphanumeric;
use rand::Rng;

/// Nonce length in alphanumeric characters; 62^22 is just over 2^128.
const NONCE_LEN: usize = 22;

/// Generate a cryptographically random session id.
///
/// Returns a URL-safe base64 string (43 characters) from 32 random bytes,
/// suitable for use as a cookie value.
pub fn generate_session_id() -> String {
    let mut rng = rand::thread_rng();
    let mut bytes = [0u8; 32];
    rng.fill(&mut bytes);
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Generate a cryptographically random challenge nonce.
///
/// Rendered as alphanumeric characters only, so it satisfies the EIP-4361
/// nonce grammar (`8*( ALPHA / DIGIT )`) and survives message round-trips.
pub fn generate_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_LEN)
        .map(char::from)
        .collect()
}
