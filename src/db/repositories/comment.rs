//! Comment repository
//!
//! Database operations for article comments. Listing returns flat rows joined
//! with author info, ordered oldest-first; the service assembles the thread.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Comment;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row, SqlitePool};
use std::sync::Arc;

/// A comment row joined with its author's username and profile image.
#[derive(Debug, Clone)]
pub struct CommentWithAuthor {
    pub comment: Comment,
    pub author_username: String,
    pub author_image: Option<String>,
    pub author_email: String,
}

/// Comment repository trait
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Create a new comment
    async fn create(&self, comment: &Comment) -> Result<Comment>;

    /// Get comment by id
    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>>;

    /// List all comments for an article, oldest first, with author info
    async fn list_by_article(&self, article_id: i64) -> Result<Vec<CommentWithAuthor>>;

    /// Delete a comment; replies go with it via cascade
    async fn delete(&self, id: i64) -> Result<()>;
}

/// SQLx-based comment repository implementation
pub struct SqlxCommentRepository {
    pool: DynDatabasePool,
}

impl SqlxCommentRepository {
    /// Create a new SQLx comment repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a shared repository for use with dependency injection
    pub fn shared(pool: DynDatabasePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, comment: &Comment) -> Result<Comment> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_sqlite(self.pool.as_sqlite().unwrap(), comment).await,
            DatabaseDriver::Postgres => create_pg(self.pool.as_postgres().unwrap(), comment).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Postgres => get_by_id_pg(self.pool.as_postgres().unwrap(), id).await,
        }
    }

    async fn list_by_article(&self, article_id: i64) -> Result<Vec<CommentWithAuthor>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_by_article_sqlite(self.pool.as_sqlite().unwrap(), article_id).await
            }
            DatabaseDriver::Postgres => {
                list_by_article_pg(self.pool.as_postgres().unwrap(), article_id).await
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

async fn create_sqlite(pool: &SqlitePool, comment: &Comment) -> Result<Comment> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO comments (article_id, author_id, parent_id, body, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(comment.article_id)
    .bind(comment.author_id)
    .bind(comment.parent_id)
    .bind(&comment.body)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create comment")?;

    let id = result.last_insert_rowid();
    get_by_id_sqlite(pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Comment not found after create"))
}

async fn get_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Comment>> {
    let row = sqlx::query("SELECT * FROM comments WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get comment by ID")?;

    Ok(row.map(|row| row_to_comment_sqlite(&row)))
}

async fn list_by_article_sqlite(
    pool: &SqlitePool,
    article_id: i64,
) -> Result<Vec<CommentWithAuthor>> {
    let rows = sqlx::query(
        r#"
        SELECT c.id, c.article_id, c.author_id, c.parent_id, c.body,
               c.created_at, c.updated_at,
               u.username AS author_username, u.email AS author_email,
               p.image AS author_image
        FROM comments c
        JOIN users u ON u.id = c.author_id
        LEFT JOIN profiles p ON p.user_id = c.author_id
        WHERE c.article_id = ?
        ORDER BY c.created_at ASC, c.id ASC
        "#,
    )
    .bind(article_id)
    .fetch_all(pool)
    .await
    .context("Failed to list comments")?;

    Ok(rows
        .iter()
        .map(|row| CommentWithAuthor {
            comment: row_to_comment_sqlite(row),
            author_username: row.get("author_username"),
            author_image: row.get("author_image"),
            author_email: row.get("author_email"),
        })
        .collect())
}

async fn delete_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM comments WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete comment")?;

    Ok(())
}

// ============================================================================
// PostgreSQL implementations
// ============================================================================

async fn create_pg(pool: &PgPool, comment: &Comment) -> Result<Comment> {
    let now = Utc::now();

    let row = sqlx::query(
        r#"
        INSERT INTO comments (article_id, author_id, parent_id, body, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(comment.article_id)
    .bind(comment.author_id)
    .bind(comment.parent_id)
    .bind(&comment.body)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await
    .context("Failed to create comment")?;

    let id: i64 = row.get("id");
    get_by_id_pg(pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Comment not found after create"))
}

async fn get_by_id_pg(pool: &PgPool, id: i64) -> Result<Option<Comment>> {
    let row = sqlx::query("SELECT * FROM comments WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get comment by ID")?;

    Ok(row.map(|row| row_to_comment_pg(&row)))
}

async fn list_by_article_pg(pool: &PgPool, article_id: i64) -> Result<Vec<CommentWithAuthor>> {
    let rows = sqlx::query(
        r#"
        SELECT c.id, c.article_id, c.author_id, c.parent_id, c.body,
               c.created_at, c.updated_at,
               u.username AS author_username, u.email AS author_email,
               p.image AS author_image
        FROM comments c
        JOIN users u ON u.id = c.author_id
        LEFT JOIN profiles p ON p.user_id = c.author_id
        WHERE c.article_id = $1
        ORDER BY c.created_at ASC, c.id ASC
        "#,
    )
    .bind(article_id)
    .fetch_all(pool)
    .await
    .context("Failed to list comments")?;

    Ok(rows
        .iter()
        .map(|row| CommentWithAuthor {
            comment: row_to_comment_pg(row),
            author_username: row.get("author_username"),
            author_image: row.get("author_image"),
            author_email: row.get("author_email"),
        })
        .collect())
}

async fn delete_pg(pool: &PgPool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM comments WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete comment")?;

    Ok(())
}

// ============================================================================
// Row mapping
// ============================================================================

fn row_to_comment_sqlite(row: &sqlx::sqlite::SqliteRow) -> Comment {
    Comment {
        id: row.get("id"),
        article_id: row.get("article_id"),
        author_id: row.get("author_id"),
        parent_id: row.get("parent_id"),
        body: row.get("body"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn row_to_comment_pg(row: &sqlx::postgres::PgRow) -> Comment {
    Comment {
        id: row.get("id"),
        article_id: row.get("article_id"),
        author_id: row.get("author_id"),
        parent_id: row.get("parent_id"),
        body: row.get("body"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
