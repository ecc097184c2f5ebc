/// HMAC-SHA256 Token Signer
///
/// Signs the `header.payload` string of a token and compares signatures
/// in constant time.

use constant_time_eq::constant_time_eq;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::auth::codec;
use crate::auth::TokenError;

type HmacSha256 = Hmac<Sha256>;

/// Sign a message with the given secret
///
/// Returns the base64url-encoded HMAC-SHA256 digest of the UTF-8 bytes of `message`.
///
/// # Errors
/// Returns `TokenError::InvalidKey` if the HMAC implementation rejects the key
pub fn sign(message: &str, secret: &str) -> Result<String, TokenError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| TokenError::InvalidKey)?;
    mac.update(message.as_bytes());
    Ok(codec::encode(mac.finalize().into_bytes()))
}

/// Compare a freshly computed signature with the one presented in a token
pub fn signatures_match(expected: &str, presented: &str) -> bool {
    constant_time_eq(expected.as_bytes(), presented.as_bytes())
}
