/// Persistence module
///
/// Account and session storage behind async traits, with a Postgres
/// implementation for production and an in-memory one for tests.

mod memory;
mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

pub use memory::{InMemoryAccountStore, InMemorySessionStore};
pub use postgres::{PgAccountStore, PgSessionStore};

/// Registered account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
}

/// The single live refresh token of an account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub account_id: Uuid,
    pub refresh_token: String,
}

/// Storage failures
///
/// These are fatal for the request: there is no fallback store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Duplicate entry: {0}")]
    Duplicate(String),
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
    #[error("Query error: {0}")]
    Query(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
                StoreError::Duplicate(db_err.message().to_string())
            }
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => StoreError::Unavailable(err.to_string()),
            _ => StoreError::Query(err.to_string()),
        }
    }
}

/// Account lookup and registration
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError>;

    /// Insert a new account
    ///
    /// # Errors
    /// Returns `StoreError::Duplicate` if the email is already registered
    async fn insert(&self, email: &str, password_hash: &str) -> Result<Account, StoreError>;
}

/// Refresh token persistence, one row per account
///
/// Lookup and delete are keyed on the literal refresh token string,
/// upsert on the account ID.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get_by_account_id(&self, account_id: Uuid)
        -> Result<Option<SessionRecord>, StoreError>;

    /// Insert the account's session, or overwrite its refresh token if one exists
    async fn upsert_by_account_id(
        &self,
        account_id: Uuid,
        refresh_token: &str,
    ) -> Result<(), StoreError>;

    async fn get_by_token(&self, refresh_token: &str) -> Result<Option<SessionRecord>, StoreError>;

    /// Delete the session holding `refresh_token`; returns whether a row was removed
    async fn delete_by_token(&self, refresh_token: &str) -> Result<bool, StoreError>;

    /// Atomically replace `current` with `replacement` for the account
    ///
    /// Returns `false` without writing if the stored token is no longer `current`.
    async fn replace_token(
        &self,
        account_id: Uuid,
        current: &str,
        replacement: &str,
    ) -> Result<bool, StoreError>;
}
