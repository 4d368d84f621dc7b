//! Auth token repository
//!
//! Single-use tokens for email verification and password resets. A user holds
//! at most one live token per purpose; creating a new one replaces the old.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{AuthToken, TokenPurpose};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

/// Auth token repository trait
#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Store a token, replacing any existing token of the same purpose
    async fn create(&self, token: &AuthToken) -> Result<()>;

    /// Find a token by user, value and purpose
    async fn find(
        &self,
        user_id: i64,
        token: &str,
        purpose: TokenPurpose,
    ) -> Result<Option<AuthToken>>;

    /// Delete a token by id (redemption)
    async fn delete(&self, id: i64) -> Result<()>;
}

/// SQLx-based auth token repository implementation
pub struct SqlxTokenRepository {
    pool: DynDatabasePool,
}

impl SqlxTokenRepository {
    /// Create a new SQLx token repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a shared repository for use with dependency injection
    pub fn shared(pool: DynDatabasePool) -> Arc<dyn TokenRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TokenRepository for SqlxTokenRepository {
    async fn create(&self, token: &AuthToken) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_sqlite(self.pool.as_sqlite().unwrap(), token).await,
            DatabaseDriver::Postgres => create_pg(self.pool.as_postgres().unwrap(), token).await,
        }
    }

    async fn find(
        &self,
        user_id: i64,
        token: &str,
        purpose: TokenPurpose,
    ) -> Result<Option<AuthToken>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                find_sqlite(self.pool.as_sqlite().unwrap(), user_id, token, purpose).await
            }
            DatabaseDriver::Postgres => {
                find_pg(self.pool.as_postgres().unwrap(), user_id, token, purpose).await
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Postgres => delete_pg(self.pool.as_postgres().unwrap(), id).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_sqlite(pool: &SqlitePool, token: &AuthToken) -> Result<()> {
    // One live token per (user, purpose)
    sqlx::query("DELETE FROM auth_tokens WHERE user_id = ? AND purpose = ?")
        .bind(token.user_id)
        .bind(token.purpose.to_string())
        .execute(pool)
        .await
        .context("Failed to clear previous tokens")?;

    sqlx::query(
        "INSERT INTO auth_tokens (user_id, token, purpose, expires_at, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(token.user_id)
    .bind(&token.token)
    .bind(token.purpose.to_string())
    .bind(token.expires_at)
    .bind(token.created_at)
    .execute(pool)
    .await
    .context("Failed to create auth token")?;

    Ok(())
}

async fn find_sqlite(
    pool: &SqlitePool,
    user_id: i64,
    token: &str,
    purpose: TokenPurpose,
) -> Result<Option<AuthToken>> {
    let row = sqlx::query(
        r#"
        SELECT id, user_id, token, purpose, expires_at, created_at
        FROM auth_tokens
        WHERE user_id = ? AND token = ? AND purpose = ?
        "#,
    )
    .bind(user_id)
    .bind(token)
    .bind(purpose.to_string())
    .fetch_optional(pool)
    .await
    .context("Failed to find auth token")?;

    row.map(|row| row_to_token_sqlite(&row)).transpose()
}

async fn delete_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM auth_tokens WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete auth token")?;

    Ok(())
}

// ============================================================================
// PostgreSQL implementations
// ============================================================================

async fn create_pg(pool: &PgPool, token: &AuthToken) -> Result<()> {
    sqlx::query("DELETE FROM auth_tokens WHERE user_id = $1 AND purpose = $2")
        .bind(token.user_id)
        .bind(token.purpose.to_string())
        .execute(pool)
        .await
        .context("Failed to clear previous tokens")?;

    sqlx::query(
        "INSERT INTO auth_tokens (user_id, token, purpose, expires_at, created_at) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(token.user_id)
    .bind(&token.token)
    .bind(token.purpose.to_string())
    .bind(token.expires_at)
    .bind(token.created_at)
    .execute(pool)
    .await
    .context("Failed to create auth token")?;

    Ok(())
}

async fn find_pg(
    pool: &PgPool,
    user_id: i64,
    token: &str,
    purpose: TokenPurpose,
) -> Result<Option<AuthToken>> {
    let row = sqlx::query(
        r#"
        SELECT id, user_id, token, purpose, expires_at, created_at
        FROM auth_tokens
        WHERE user_id = $1 AND token = $2 AND purpose = $3
        "#,
    )
    .bind(user_id)
    .bind(token)
    .bind(purpose.to_string())
    .fetch_optional(pool)
    .await
    .context("Failed to find auth token")?;

    row.map(|row| row_to_token_pg(&row)).transpose()
}

async fn delete_pg(pool: &PgPool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM auth_tokens WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete auth token")?;

    Ok(())
}

// ============================================================================
// Row mapping
// ============================================================================

fn row_to_token_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<AuthToken> {
    let purpose: String = row.get("purpose");
    Ok(AuthToken {
        id: row.get("id"),
        user_id: row.get("user_id"),
        token: row.get("token"),
        purpose: TokenPurpose::from_str(&purpose)?,
        expires_at: row.get("expires_at"),
        created_at: row.get("created_at"),
    })
}

fn row_to_token_pg(row: &sqlx::postgres::PgRow) -> Result<AuthToken> {
    let purpose: String = row.get("purpose");
    Ok(AuthToken {
        id: row.get("id"),
        user_id: row.get("user_id"),
        token: row.get("token"),
        purpose: TokenPurpose::from_str(&purpose)?,
        expires_at: row.get("expires_at"),
        created_at: row.get("created_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use crate::models::User;
    use chrono::{Duration, Utc};

    async fn setup() -> (DynDatabasePool, SqlxTokenRepository, i64) {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();

        let users = SqlxUserRepository::new(pool.clone());
        let user = users
            .create(&User::new(
                "tok-user".to_string(),
                "tok@example.com".to_string(),
                "hash".to_string(),
            ))
            .await
            .unwrap();

        (pool.clone(), SqlxTokenRepository::new(pool), user.id)
    }

    fn token_for(user_id: i64, value: &str, purpose: TokenPurpose) -> AuthToken {
        AuthToken {
            id: 0,
            user_id,
            token: value.to_string(),
            purpose,
            expires_at: Utc::now() + Duration::hours(1),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let (_pool, repo, uid) = setup().await;
        repo.create(&token_for(uid, "abc123", TokenPurpose::Verify))
            .await
            .unwrap();

        let found = repo
            .find(uid, "abc123", TokenPurpose::Verify)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.user_id, uid);
        assert!(!found.is_expired());

        // Wrong purpose does not match
        assert!(repo
            .find(uid, "abc123", TokenPurpose::PasswordReset)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_new_token_replaces_old_one() {
        let (_pool, repo, uid) = setup().await;
        repo.create(&token_for(uid, "first", TokenPurpose::PasswordReset))
            .await
            .unwrap();
        repo.create(&token_for(uid, "second", TokenPurpose::PasswordReset))
            .await
            .unwrap();

        assert!(repo
            .find(uid, "first", TokenPurpose::PasswordReset)
            .await
            .unwrap()
            .is_none());
        assert!(repo
            .find(uid, "second", TokenPurpose::PasswordReset)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_delete_on_redemption() {
        let (_pool, repo, uid) = setup().await;
        repo.create(&token_for(uid, "once", TokenPurpose::Verify))
            .await
            .unwrap();

        let found = repo
            .find(uid, "once", TokenPurpose::Verify)
            .await
            .unwrap()
            .unwrap();
        repo.delete(found.id).await.unwrap();

        assert!(repo
            .find(uid, "once", TokenPurpose::Verify)
            .await
            .unwrap()
            .is_none());
    }
}
