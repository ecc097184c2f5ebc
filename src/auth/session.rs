/// Session Manager
///
/// Issues matched access/refresh token pairs and persists the refresh token
/// per account. Renewal rotates the refresh token: the presented token must
/// still be the stored one, and it is swapped for the new token with a
/// conditional update so two concurrent renewals cannot both succeed.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::auth::claims::{Claims, Identity};
use crate::auth::token::{Payload, TokenEngine, TokenError};
use crate::configuration::AuthSettings;
use crate::store::{AccountStore, SessionStore, StoreError};

/// Access and refresh tokens issued together
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Result of a successful renewal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Renewal {
    pub tokens: CredentialPair,
    pub account_id: Uuid,
}

/// Failures while creating or ending sessions
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Failed to mint credentials: {0}")]
    Mint(#[from] TokenError),
    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// Reasons a refresh token cannot be exchanged for a new pair
#[derive(Debug, thiserror::Error)]
pub enum RenewalError {
    /// Expired, malformed or wrongly signed token
    #[error("Refresh token is not valid")]
    InvalidRefreshToken(#[source] TokenError),
    /// Cryptographically valid, but superseded or signed out
    #[error("Refresh token is not valid")]
    RefreshNotFound,
    #[error("Student not found")]
    AccountNotFound,
    /// Another renewal rotated the same token first
    #[error("Refresh token was rotated by a concurrent request")]
    RenewalConflict,
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl From<StoreError> for RenewalError {
    fn from(err: StoreError) -> Self {
        RenewalError::Session(SessionError::Storage(err))
    }
}

/// Issues, renews and ends sessions
///
/// Constructed once at startup and shared by reference with request handlers.
pub struct SessionManager {
    engine: TokenEngine,
    settings: AuthSettings,
    sessions: Arc<dyn SessionStore>,
    accounts: Arc<dyn AccountStore>,
}

impl SessionManager {
    pub fn new(
        engine: TokenEngine,
        settings: AuthSettings,
        sessions: Arc<dyn SessionStore>,
        accounts: Arc<dyn AccountStore>,
    ) -> Self {
        Self {
            engine,
            settings,
            sessions,
            accounts,
        }
    }

    pub fn settings(&self) -> &AuthSettings {
        &self.settings
    }

    /// Issue a credential pair and make its refresh token the account's only live one
    ///
    /// # Errors
    /// Returns error if token minting fails or the session store is unavailable
    pub async fn create_session(&self, identity: &Identity) -> Result<CredentialPair, SessionError> {
        let tokens = self.mint(identity)?;

        self.sessions
            .upsert_by_account_id(identity.id, &tokens.refresh_token)
            .await?;

        tracing::info!(account_id = %identity.id, "Session created");
        Ok(tokens)
    }

    /// Exchange a refresh token for a new credential pair
    ///
    /// The presented token becomes permanently unusable once this succeeds.
    ///
    /// # Errors
    /// - `InvalidRefreshToken` if the token fails verification
    /// - `RefreshNotFound` if the token is not the account's stored refresh token
    /// - `AccountNotFound` if the account no longer exists
    /// - `RenewalConflict` if a concurrent renewal rotated the token first
    pub async fn renew(&self, presented: &str) -> Result<Renewal, RenewalError> {
        let claims = self
            .verify(presented, &self.settings.refresh_secret)
            .map_err(|e| {
                tracing::warn!(error = %e, "Refresh token rejected");
                RenewalError::InvalidRefreshToken(e)
            })?;

        let Some(session) = self.sessions.get_by_token(presented).await? else {
            tracing::warn!(account_id = %claims.id, "Refresh token not found in session store");
            return Err(RenewalError::RefreshNotFound);
        };

        let Some(account) = self.accounts.find_by_id(claims.id).await? else {
            tracing::warn!(account_id = %claims.id, "Account for refresh token not found");
            return Err(RenewalError::AccountNotFound);
        };

        let tokens = self
            .mint(&Identity::new(account.id, account.email))
            .map_err(SessionError::from)?;

        let rotated = self
            .sessions
            .replace_token(session.account_id, presented, &tokens.refresh_token)
            .await?;
        if !rotated {
            tracing::warn!(account_id = %account.id, "Concurrent renewal lost the race");
            return Err(RenewalError::RenewalConflict);
        }

        tracing::info!(account_id = %account.id, "Session renewed");
        Ok(Renewal {
            tokens,
            account_id: account.id,
        })
    }

    /// Delete the session holding `refresh_token`
    ///
    /// Returns `false` if no such session exists, which is not an error.
    pub async fn end_session(&self, refresh_token: &str) -> Result<bool, StoreError> {
        let removed = self.sessions.delete_by_token(refresh_token).await?;
        tracing::info!(removed, "Session ended");
        Ok(removed)
    }

    /// Claims of a valid access token, `None` otherwise
    pub fn validate_access(&self, token: &str) -> Option<Claims> {
        self.verify(token, &self.settings.access_secret)
            .map_err(|e| tracing::debug!(error = %e, "Access token rejected"))
            .ok()
    }

    /// Claims of a valid refresh token, `None` otherwise
    ///
    /// Only checks the token itself, not whether it is still the stored one.
    pub fn validate_refresh(&self, token: &str) -> Option<Claims> {
        self.verify(token, &self.settings.refresh_secret)
            .map_err(|e| tracing::debug!(error = %e, "Refresh token rejected"))
            .ok()
    }

    fn verify(&self, token: &str, secret: &str) -> Result<Claims, TokenError> {
        self.engine
            .verify(token, secret)
            .and_then(Claims::from_payload)
    }

    fn mint(&self, identity: &Identity) -> Result<CredentialPair, TokenError> {
        let access_token = self.engine.issue(
            &with_token_id(identity),
            &self.settings.access_secret,
            Some(self.settings.access_token_ttl.as_str()),
        )?;
        let refresh_token = self.engine.issue(
            &with_token_id(identity),
            &self.settings.refresh_secret,
            Some(self.settings.refresh_token_ttl.as_str()),
        )?;

        Ok(CredentialPair {
            access_token,
            refresh_token,
        })
    }
}

// Pairs minted within the same second must still differ
fn with_token_id(identity: &Identity) -> Payload {
    let mut payload = identity.to_payload();
    payload.insert(
        "jti".to_string(),
        Value::String(Uuid::new_v4().to_string()),
    );
    payload
}
