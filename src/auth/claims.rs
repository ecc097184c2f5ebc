/// Token Claims
///
/// Identity claims carried by access and refresh tokens, plus the
/// engine-injected `iat`/`exp` timestamps.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::auth::token::{Payload, TokenError};

/// Identity embedded in both tokens of a credential pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Account ID
    pub id: Uuid,
    /// Account email
    pub email: String,
}

impl Identity {
    pub fn new(id: Uuid, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
        }
    }

    /// Convert into a token payload
    pub fn to_payload(&self) -> Payload {
        let mut payload = Payload::new();
        payload.insert("id".to_string(), Value::String(self.id.to_string()));
        payload.insert("email".to_string(), Value::String(self.email.clone()));
        payload
    }
}

/// Claims of a verified token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account ID
    pub id: Uuid,
    /// Account email
    pub email: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    /// Unique token ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

impl Claims {
    /// Build typed claims from a verified payload
    ///
    /// # Errors
    /// Returns `TokenError::MalformedPayload` if identity fields are missing or mistyped
    pub fn from_payload(payload: Payload) -> Result<Self, TokenError> {
        serde_json::from_value(Value::Object(payload)).map_err(|_| TokenError::MalformedPayload)
    }

    pub fn identity(&self) -> Identity {
        Identity::new(self.id, self.email.clone())
    }
}
