/// Token Engine
///
/// Issues and verifies HS256-signed tokens of the form
/// `base64url(header).base64url(payload).base64url(signature)`.
/// The engine injects `iat` into every payload and `exp` when a TTL is given.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::auth::clock::Clock;
use crate::auth::codec;
use crate::auth::duration::parse_duration;
use crate::auth::signer::{sign, signatures_match};

/// Decoded token payload
///
/// `serde_json::Map` keeps keys sorted, so serialization is deterministic.
pub type Payload = Map<String, Value>;

const ISSUED_AT: &str = "iat";
const EXPIRES_AT: &str = "exp";

/// Token construction and verification errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Invalid token structure")]
    MalformedToken,
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Token expired")]
    TokenExpired,
    #[error("Invalid token payload")]
    MalformedPayload,
    #[error("Invalid duration format: {0:?}")]
    InvalidDurationFormat(String),
    #[error("Signing key rejected")]
    InvalidKey,
}

#[derive(Serialize)]
struct Header {
    alg: &'static str,
    typ: &'static str,
}

const HEADER: Header = Header {
    alg: "HS256",
    typ: "JWT",
};

/// Issues and verifies signed tokens against an injected clock
#[derive(Clone)]
pub struct TokenEngine {
    clock: Arc<dyn Clock>,
}

impl TokenEngine {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Issue a signed token
    ///
    /// # Arguments
    /// * `payload` - Claims to embed; `iat` (and `exp` when `ttl` is set) are overwritten
    /// * `secret` - HMAC secret
    /// * `ttl` - Optional lifetime such as `"15m"` or `"7d"`
    ///
    /// # Errors
    /// Returns error if `ttl` cannot be parsed
    pub fn issue(
        &self,
        payload: &Payload,
        secret: &str,
        ttl: Option<&str>,
    ) -> Result<String, TokenError> {
        let now = self.clock.now();
        let mut claims = payload.clone();

        if let Some(ttl) = ttl {
            let lifetime = parse_duration(ttl)?;
            let expires_at = now
                .checked_add(lifetime)
                .ok_or_else(|| TokenError::InvalidDurationFormat(ttl.to_string()))?;
            claims.insert(EXPIRES_AT.to_string(), Value::from(expires_at));
        }
        claims.insert(ISSUED_AT.to_string(), Value::from(now));

        let header_json = serde_json::to_vec(&HEADER).map_err(|_| TokenError::MalformedPayload)?;
        let payload_json = serde_json::to_vec(&claims).map_err(|_| TokenError::MalformedPayload)?;

        let encoded_header = codec::encode(header_json);
        let encoded_payload = codec::encode(payload_json);
        let signature = sign(&signing_input(&encoded_header, &encoded_payload), secret)?;

        Ok(format!("{}.{}.{}", encoded_header, encoded_payload, signature))
    }

    /// Verify a token and return its payload
    ///
    /// # Errors
    /// - `MalformedToken` unless the token has exactly three non-empty segments
    /// - `InvalidSignature` if the signature does not match `secret`
    /// - `MalformedPayload` if the payload is not a base64url JSON object
    ///   or carries a non-integer `exp`
    /// - `TokenExpired` if `exp` is earlier than the current time
    pub fn verify(&self, token: &str, secret: &str) -> Result<Payload, TokenError> {
        let (encoded_header, encoded_payload, signature) = split_token(token)?;

        let expected = sign(&signing_input(encoded_header, encoded_payload), secret)?;
        if !signatures_match(&expected, signature) {
            return Err(TokenError::InvalidSignature);
        }

        let payload_json = codec::decode(encoded_payload).map_err(|_| TokenError::MalformedPayload)?;
        let payload: Payload =
            serde_json::from_slice(&payload_json).map_err(|_| TokenError::MalformedPayload)?;

        match payload.get(EXPIRES_AT) {
            None | Some(Value::Null) => {}
            Some(exp) => {
                let expires_at = exp.as_i64().ok_or(TokenError::MalformedPayload)?;
                if expires_at < self.clock.now() {
                    return Err(TokenError::TokenExpired);
                }
            }
        }

        Ok(payload)
    }
}

fn signing_input(encoded_header: &str, encoded_payload: &str) -> String {
    format!("{}.{}", encoded_header, encoded_payload)
}

fn split_token(token: &str) -> Result<(&str, &str, &str), TokenError> {
    let mut segments = token.split('.');
    match (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) {
        (Some(header), Some(payload), Some(signature), None)
            if !header.is_empty() && !payload.is_empty() && !signature.is_empty() =>
        {
            Ok((header, payload, signature))
        }
        _ => Err(TokenError::MalformedToken),
    }
}
