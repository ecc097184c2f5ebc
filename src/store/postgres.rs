/// Postgres-backed stores
///
/// Schema lives in `migrations/`. `sessions.account_id` is the primary key,
/// which keeps a single session row per account.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use super::{Account, AccountStore, SessionRecord, SessionStore, StoreError};

#[derive(Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query_as::<_, (Uuid, String, String)>(
            "SELECT id, email, password_hash FROM accounts WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, email, password_hash)| Account {
            id,
            email,
            password_hash,
        }))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query_as::<_, (Uuid, String, String)>(
            "SELECT id, email, password_hash FROM accounts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, email, password_hash)| Account {
            id,
            email,
            password_hash,
        }))
    }

    async fn insert(&self, email: &str, password_hash: &str) -> Result<Account, StoreError> {
        let id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO accounts (id, email, password_hash, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(id)
        .bind(email)
        .bind(password_hash)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(Account {
            id,
            email: email.to_string(),
            password_hash: password_hash.to_string(),
        })
    }
}

#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn get_by_account_id(
        &self,
        account_id: Uuid,
    ) -> Result<Option<SessionRecord>, StoreError> {
        let row = sqlx::query_as::<_, (Uuid, String)>(
            "SELECT account_id, refresh_token FROM sessions WHERE account_id = $1",
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(account_id, refresh_token)| SessionRecord {
            account_id,
            refresh_token,
        }))
    }

    async fn upsert_by_account_id(
        &self,
        account_id: Uuid,
        refresh_token: &str,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO sessions (account_id, refresh_token, created_at, updated_at)
            VALUES ($1, $2, $3, $3)
            ON CONFLICT (account_id)
            DO UPDATE SET refresh_token = EXCLUDED.refresh_token, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(account_id)
        .bind(refresh_token)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_by_token(&self, refresh_token: &str) -> Result<Option<SessionRecord>, StoreError> {
        let row = sqlx::query_as::<_, (Uuid, String)>(
            "SELECT account_id, refresh_token FROM sessions WHERE refresh_token = $1",
        )
        .bind(refresh_token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(account_id, refresh_token)| SessionRecord {
            account_id,
            refresh_token,
        }))
    }

    async fn delete_by_token(&self, refresh_token: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM sessions WHERE refresh_token = $1")
            .bind(refresh_token)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn replace_token(
        &self,
        account_id: Uuid,
        current: &str,
        replacement: &str,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET refresh_token = $1, updated_at = $2
            WHERE account_id = $3 AND refresh_token = $4
            "#,
        )
        .bind(replacement)
        .bind(Utc::now())
        .bind(account_id)
        .bind(current)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
