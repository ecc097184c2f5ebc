/// Account Authentication Service
///
/// Sign-up, login and logout on top of the account store and the session manager.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::auth::claims::Identity;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::session::{CredentialPair, SessionManager};
use crate::error::{AppError, AuthError};
use crate::store::{Account, AccountStore, StoreError};
use crate::validators::{is_valid_email, is_valid_password};

/// A freshly authenticated account and its credentials
#[derive(Debug, Clone, Serialize)]
pub struct SignedIn {
    pub account_id: Uuid,
    pub tokens: CredentialPair,
}

pub struct AuthService {
    sessions: Arc<SessionManager>,
    accounts: Arc<dyn AccountStore>,
}

impl AuthService {
    pub fn new(sessions: Arc<SessionManager>, accounts: Arc<dyn AccountStore>) -> Self {
        Self { sessions, accounts }
    }

    /// Register a new account and open its first session
    ///
    /// # Errors
    /// - `AuthError::EmailInUse` if the email is already registered
    /// - `ValidationError` for a malformed email or unusable password
    pub async fn signup(&self, email: &str, password: &str) -> Result<SignedIn, AppError> {
        let email = is_valid_email(email)?;
        is_valid_password(password)?;

        if self.accounts.find_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailInUse.into());
        }

        let password_hash = hash_password(password)?;
        let account = match self.accounts.insert(&email, &password_hash).await {
            Ok(account) => account,
            // lost a race with a concurrent sign-up
            Err(StoreError::Duplicate(_)) => return Err(AuthError::EmailInUse.into()),
            Err(e) => return Err(e.into()),
        };

        let tokens = self
            .sessions
            .create_session(&Identity::new(account.id, account.email.clone()))
            .await?;

        tracing::info!(account_id = %account.id, "Account registered");
        Ok(SignedIn {
            account_id: account.id,
            tokens,
        })
    }

    /// Authenticate with email and password and open a new session
    ///
    /// Any previous session of the account is superseded.
    ///
    /// # Errors
    /// - `AuthError::UnknownEmail` if no account has this email
    /// - `AuthError::IncorrectPassword` if the password does not match
    pub async fn login(&self, email: &str, password: &str) -> Result<SignedIn, AppError> {
        let account = self
            .accounts
            .find_by_email(email.trim())
            .await?
            .ok_or(AuthError::UnknownEmail)?;

        if !verify_password(password, &account.password_hash)? {
            return Err(AuthError::IncorrectPassword.into());
        }

        let tokens = self
            .sessions
            .create_session(&Identity::new(account.id, account.email.clone()))
            .await?;

        tracing::info!(account_id = %account.id, "Account logged in");
        Ok(SignedIn {
            account_id: account.id,
            tokens,
        })
    }

    /// Look up the account a verified token refers to
    ///
    /// # Errors
    /// Returns `AuthError::AccountNotFound` if the account was removed after the token was issued
    pub async fn current_account(&self, account_id: Uuid) -> Result<Account, AppError> {
        self.accounts
            .find_by_id(account_id)
            .await?
            .ok_or_else(|| AuthError::AccountNotFound.into())
    }

    /// End the session holding `refresh_token`; returns whether one existed
    pub async fn logout(&self, refresh_token: &str) -> Result<bool, AppError> {
        Ok(self.sessions.end_session(refresh_token).await?)
    }
}
