//! Profile repository
//!
//! Database operations for profiles and the follow relationship.
//!
//! This module provides:
//! - `ProfileRepository` trait defining the interface for profile data access
//! - `SqlxProfileRepository` implementing the trait for SQLite and PostgreSQL
//!
//! Follow/unfollow are idempotent at this layer; the self-follow invariant is
//! enforced both by the service and by a CHECK constraint on the table.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Profile;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row, SqlitePool};
use std::sync::Arc;

/// Profile repository trait
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Create an empty profile for a user
    async fn create(&self, user_id: i64) -> Result<Profile>;

    /// Get profile by the owning user's id
    async fn get_by_user_id(&self, user_id: i64) -> Result<Option<Profile>>;

    /// Get profile by username
    async fn get_by_username(&self, username: &str) -> Result<Option<Profile>>;

    /// Update bio/image
    async fn update(&self, profile: &Profile) -> Result<Profile>;

    /// Record that `follower_id` follows `followed_id` (idempotent)
    async fn follow(&self, follower_id: i64, followed_id: i64) -> Result<()>;

    /// Remove the follow edge (idempotent)
    async fn unfollow(&self, follower_id: i64, followed_id: i64) -> Result<()>;

    /// Check whether `follower_id` follows `followed_id`
    async fn is_following(&self, follower_id: i64, followed_id: i64) -> Result<bool>;

    /// Count how many profiles follow `user_id`
    async fn follower_count(&self, user_id: i64) -> Result<i64>;
}

/// SQLx-based profile repository implementation
pub struct SqlxProfileRepository {
    pool: DynDatabasePool,
}

impl SqlxProfileRepository {
    /// Create a new SQLx profile repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a shared repository for use with dependency injection
    pub fn shared(pool: DynDatabasePool) -> Arc<dyn ProfileRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ProfileRepository for SqlxProfileRepository {
    async fn create(&self, user_id: i64) -> Result<Profile> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_sqlite(self.pool.as_sqlite().unwrap(), user_id).await,
            DatabaseDriver::Postgres => create_pg(self.pool.as_postgres().unwrap(), user_id).await,
        }
    }

    async fn get_by_user_id(&self, user_id: i64) -> Result<Option<Profile>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_by_user_id_sqlite(self.pool.as_sqlite().unwrap(), user_id).await
            }
            DatabaseDriver::Postgres => {
                get_by_user_id_pg(self.pool.as_postgres().unwrap(), user_id).await
            }
        }
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<Profile>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_by_username_sqlite(self.pool.as_sqlite().unwrap(), username).await
            }
            DatabaseDriver::Postgres => {
                get_by_username_pg(self.pool.as_postgres().unwrap(), username).await
            }
        }
    }

    async fn update(&self, profile: &Profile) -> Result<Profile> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_sqlite(self.pool.as_sqlite().unwrap(), profile).await,
            DatabaseDriver::Postgres => update_pg(self.pool.as_postgres().unwrap(), profile).await,
        }
    }

    async fn follow(&self, follower_id: i64, followed_id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                follow_sqlite(self.pool.as_sqlite().unwrap(), follower_id, followed_id).await
            }
            DatabaseDriver::Postgres => {
                follow_pg(self.pool.as_postgres().unwrap(), follower_id, followed_id).await
            }
        }
    }

    async fn unfollow(&self, follower_id: i64, followed_id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                unfollow_sqlite(self.pool.as_sqlite().unwrap(), follower_id, followed_id).await
            }
            DatabaseDriver::Postgres => {
                unfollow_pg(self.pool.as_postgres().unwrap(), follower_id, followed_id).await
            }
        }
    }

    async fn is_following(&self, follower_id: i64, followed_id: i64) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                is_following_sqlite(self.pool.as_sqlite().unwrap(), follower_id, followed_id).await
            }
            DatabaseDriver::Postgres => {
                is_following_pg(self.pool.as_postgres().unwrap(), follower_id, followed_id).await
            }
        }
    }

    async fn follower_count(&self, user_id: i64) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                follower_count_sqlite(self.pool.as_sqlite().unwrap(), user_id).await
            }
            DatabaseDriver::Postgres => {
                follower_count_pg(self.pool.as_postgres().unwrap(), user_id).await
            }
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_sqlite(pool: &SqlitePool, user_id: i64) -> Result<Profile> {
    let now = Utc::now();

    sqlx::query(
        "INSERT INTO profiles (user_id, bio, image, created_at, updated_at) VALUES (?, NULL, NULL, ?, ?)",
    )
    .bind(user_id)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create profile")?;

    get_by_user_id_sqlite(pool, user_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Profile not found after create"))
}

async fn get_by_user_id_sqlite(pool: &SqlitePool, user_id: i64) -> Result<Option<Profile>> {
    let row = sqlx::query(
        r#"
        SELECT p.user_id, u.username, p.bio, p.image, p.created_at, p.updated_at
        FROM profiles p
        JOIN users u ON u.id = p.user_id
        WHERE p.user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .context("Failed to get profile by user ID")?;

    Ok(row.map(|row| row_to_profile_sqlite(&row)))
}

async fn get_by_username_sqlite(pool: &SqlitePool, username: &str) -> Result<Option<Profile>> {
    let row = sqlx::query(
        r#"
        SELECT p.user_id, u.username, p.bio, p.image, p.created_at, p.updated_at
        FROM profiles p
        JOIN users u ON u.id = p.user_id
        WHERE u.username = ?
        "#,
    )
    .bind(username)
    .fetch_optional(pool)
    .await
    .context("Failed to get profile by username")?;

    Ok(row.map(|row| row_to_profile_sqlite(&row)))
}

async fn update_sqlite(pool: &SqlitePool, profile: &Profile) -> Result<Profile> {
    let now = Utc::now();

    sqlx::query("UPDATE profiles SET bio = ?, image = ?, updated_at = ? WHERE user_id = ?")
        .bind(&profile.bio)
        .bind(&profile.image)
        .bind(now)
        .bind(profile.user_id)
        .execute(pool)
        .await
        .context("Failed to update profile")?;

    get_by_user_id_sqlite(pool, profile.user_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Profile not found after update"))
}

async fn follow_sqlite(pool: &SqlitePool, follower_id: i64, followed_id: i64) -> Result<()> {
    sqlx::query(
        "INSERT OR IGNORE INTO follows (follower_id, followed_id, created_at) VALUES (?, ?, ?)",
    )
    .bind(follower_id)
    .bind(followed_id)
    .bind(Utc::now())
    .execute(pool)
    .await
    .context("Failed to create follow")?;

    Ok(())
}

async fn unfollow_sqlite(pool: &SqlitePool, follower_id: i64, followed_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM follows WHERE follower_id = ? AND followed_id = ?")
        .bind(follower_id)
        .bind(followed_id)
        .execute(pool)
        .await
        .context("Failed to delete follow")?;

    Ok(())
}

async fn is_following_sqlite(
    pool: &SqlitePool,
    follower_id: i64,
    followed_id: i64,
) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM follows WHERE follower_id = ? AND followed_id = ?",
    )
    .bind(follower_id)
    .bind(followed_id)
    .fetch_one(pool)
    .await
    .context("Failed to check follow")?;

    Ok(count > 0)
}

async fn follower_count_sqlite(pool: &SqlitePool, user_id: i64) -> Result<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM follows WHERE followed_id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .context("Failed to count followers")
}

// ============================================================================
// PostgreSQL implementations
// ============================================================================

async fn create_pg(pool: &PgPool, user_id: i64) -> Result<Profile> {
    let now = Utc::now();

    sqlx::query(
        "INSERT INTO profiles (user_id, bio, image, created_at, updated_at) VALUES ($1, NULL, NULL, $2, $3)",
    )
    .bind(user_id)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create profile")?;

    get_by_user_id_pg(pool, user_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Profile not found after create"))
}

async fn get_by_user_id_pg(pool: &PgPool, user_id: i64) -> Result<Option<Profile>> {
    let row = sqlx::query(
        r#"
        SELECT p.user_id, u.username, p.bio, p.image, p.created_at, p.updated_at
        FROM profiles p
        JOIN users u ON u.id = p.user_id
        WHERE p.user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .context("Failed to get profile by user ID")?;

    Ok(row.map(|row| row_to_profile_pg(&row)))
}

async fn get_by_username_pg(pool: &PgPool, username: &str) -> Result<Option<Profile>> {
    let row = sqlx::query(
        r#"
        SELECT p.user_id, u.username, p.bio, p.image, p.created_at, p.updated_at
        FROM profiles p
        JOIN users u ON u.id = p.user_id
        WHERE u.username = $1
        "#,
    )
    .bind(username)
    .fetch_optional(pool)
    .await
    .context("Failed to get profile by username")?;

    Ok(row.map(|row| row_to_profile_pg(&row)))
}

async fn update_pg(pool: &PgPool, profile: &Profile) -> Result<Profile> {
    let now = Utc::now();

    sqlx::query("UPDATE profiles SET bio = $1, image = $2, updated_at = $3 WHERE user_id = $4")
        .bind(&profile.bio)
        .bind(&profile.image)
        .bind(now)
        .bind(profile.user_id)
        .execute(pool)
        .await
        .context("Failed to update profile")?;

    get_by_user_id_pg(pool, profile.user_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Profile not found after update"))
}

async fn follow_pg(pool: &PgPool, follower_id: i64, followed_id: i64) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO follows (follower_id, followed_id, created_at)
        VALUES ($1, $2, $3)
        ON CONFLICT (follower_id, followed_id) DO NOTHING
        "#,
    )
    .bind(follower_id)
    .bind(followed_id)
    .bind(Utc::now())
    .execute(pool)
    .await
    .context("Failed to create follow")?;

    Ok(())
}

async fn unfollow_pg(pool: &PgPool, follower_id: i64, followed_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND followed_id = $2")
        .bind(follower_id)
        .bind(followed_id)
        .execute(pool)
        .await
        .context("Failed to delete follow")?;

    Ok(())
}

async fn is_following_pg(pool: &PgPool, follower_id: i64, followed_id: i64) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM follows WHERE follower_id = $1 AND followed_id = $2",
    )
    .bind(follower_id)
    .bind(followed_id)
    .fetch_one(pool)
    .await
    .context("Failed to check follow")?;

    Ok(count > 0)
}

async fn follower_count_pg(pool: &PgPool, user_id: i64) -> Result<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM follows WHERE followed_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .context("Failed to count followers")
}

// ============================================================================
// Row mapping
// ============================================================================

fn row_to_profile_sqlite(row: &sqlx::sqlite::SqliteRow) -> Profile {
    Profile {
        user_id: row.get("user_id"),
        username: row.get("username"),
        bio: row.get("bio"),
        image: row.get("image"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn row_to_profile_pg(row: &sqlx::postgres::PgRow) -> Profile {
    Profile {
        user_id: row.get("user_id"),
        username: row.get("username"),
        bio: row.get("bio"),
        image: row.get("image"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
