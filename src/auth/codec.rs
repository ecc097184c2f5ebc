/// URL-safe Base64 codec
///
/// Token segments are base64url (`-` and `_` instead of `+` and `/`)
/// with the `=` padding stripped. Decoding tolerates padded input.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;

pub use base64::DecodeError;

const BASE64_URL: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Encode bytes as unpadded base64url
pub fn encode(bytes: impl AsRef<[u8]>) -> String {
    BASE64_URL.encode(bytes)
}

/// Decode an unpadded (or padded) base64url string
///
/// # Errors
/// Returns error if the input contains characters outside the URL-safe alphabet
/// or has an impossible length
pub fn decode(input: &str) -> Result<Vec<u8>, DecodeError> {
    BASE64_URL.decode(input)
}
