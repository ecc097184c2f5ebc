/// In-memory stores
///
/// Same contracts as the Postgres stores, each guarded by a single mutex.
/// Used by tests and for running without a database.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use super::{Account, AccountStore, SessionRecord, SessionStore, StoreError};

fn lock<'a, T>(mutex: &'a Mutex<T>, name: &str) -> Result<MutexGuard<'a, T>, StoreError> {
    mutex
        .lock()
        .map_err(|_| StoreError::Unavailable(format!("{} lock poisoned", name)))
}

#[derive(Default)]
pub struct InMemoryAccountStore {
    accounts: Mutex<HashMap<Uuid, Account>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let accounts = lock(&self.accounts, "account store")?;
        Ok(accounts.values().find(|a| a.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let accounts = lock(&self.accounts, "account store")?;
        Ok(accounts.get(&id).cloned())
    }

    async fn insert(&self, email: &str, password_hash: &str) -> Result<Account, StoreError> {
        let mut accounts = lock(&self.accounts, "account store")?;
        if accounts.values().any(|a| a.email == email) {
            return Err(StoreError::Duplicate(format!("email {} already registered", email)));
        }

        let account = Account {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
        };
        accounts.insert(account.id, account.clone());
        Ok(account)
    }
}

/// Refresh tokens keyed by account ID
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<Uuid, String>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions
    pub fn len(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get_by_account_id(
        &self,
        account_id: Uuid,
    ) -> Result<Option<SessionRecord>, StoreError> {
        let sessions = lock(&self.sessions, "session store")?;
        Ok(sessions.get(&account_id).map(|token| SessionRecord {
            account_id,
            refresh_token: token.clone(),
        }))
    }

    async fn upsert_by_account_id(
        &self,
        account_id: Uuid,
        refresh_token: &str,
    ) -> Result<(), StoreError> {
        let mut sessions = lock(&self.sessions, "session store")?;
        sessions.insert(account_id, refresh_token.to_string());
        Ok(())
    }

    async fn get_by_token(&self, refresh_token: &str) -> Result<Option<SessionRecord>, StoreError> {
        let sessions = lock(&self.sessions, "session store")?;
        Ok(sessions
            .iter()
            .find(|(_, token)| token.as_str() == refresh_token)
            .map(|(account_id, token)| SessionRecord {
                account_id: *account_id,
                refresh_token: token.clone(),
            }))
    }

    async fn delete_by_token(&self, refresh_token: &str) -> Result<bool, StoreError> {
        let mut sessions = lock(&self.sessions, "session store")?;
        let before = sessions.len();
        sessions.retain(|_, token| token.as_str() != refresh_token);
        Ok(sessions.len() < before)
    }

    async fn replace_token(
        &self,
        account_id: Uuid,
        current: &str,
        replacement: &str,
    ) -> Result<bool, StoreError> {
        let mut sessions = lock(&self.sessions, "session store")?;
        match sessions.get_mut(&account_id) {
            Some(token) if token.as_str() == current => {
                *token = replacement.to_string();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
