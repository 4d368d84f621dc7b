//! Article repository
//!
//! Database operations for articles. Listing is paginated and ordered
//! newest-first; slugs are unique and never rewritten after creation.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Article, ListParams};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row, SqlitePool};
use std::sync::Arc;

/// Article repository trait
#[async_trait]
pub trait ArticleRepository: Send + Sync {
    /// Create a new article
    async fn create(&self, article: &Article) -> Result<Article>;

    /// Get article by id
    async fn get_by_id(&self, id: i64) -> Result<Option<Article>>;

    /// Get article by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Article>>;

    /// Check whether a slug is already taken
    async fn exists_by_slug(&self, slug: &str) -> Result<bool>;

    /// List articles newest-first, optionally filtered by author
    async fn list(&self, params: &ListParams, author_id: Option<i64>) -> Result<Vec<Article>>;

    /// Count articles, optionally filtered by author
    async fn count(&self, author_id: Option<i64>) -> Result<i64>;

    /// Update title/description/body/image (slug stays as-is)
    async fn update(&self, article: &Article) -> Result<Article>;

    /// Delete an article; comments go with it via cascade
    async fn delete(&self, id: i64) -> Result<()>;
}

/// SQLx-based article repository implementation
pub struct SqlxArticleRepository {
    pool: DynDatabasePool,
}

impl SqlxArticleRepository {
    /// Create a new SQLx article repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a shared repository for use with dependency injection
    pub fn shared(pool: DynDatabasePool) -> Arc<dyn ArticleRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ArticleRepository for SqlxArticleRepository {
    async fn create(&self, article: &Article) -> Result<Article> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_sqlite(self.pool.as_sqlite().unwrap(), article).await,
            DatabaseDriver::Postgres => create_pg(self.pool.as_postgres().unwrap(), article).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Article>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Postgres => get_by_id_pg(self.pool.as_postgres().unwrap(), id).await,
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Article>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_by_slug_sqlite(self.pool.as_sqlite().unwrap(), slug).await
            }
            DatabaseDriver::Postgres => {
                get_by_slug_pg(self.pool.as_postgres().unwrap(), slug).await
            }
        }
    }

    async fn exists_by_slug(&self, slug: &str) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                exists_by_slug_sqlite(self.pool.as_sqlite().unwrap(), slug).await
            }
            DatabaseDriver::Postgres => {
                exists_by_slug_pg(self.pool.as_postgres().unwrap(), slug).await
            }
        }
    }

    async fn list(&self, params: &ListParams, author_id: Option<i64>) -> Result<Vec<Article>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_sqlite(self.pool.as_sqlite().unwrap(), params, author_id).await
            }
            DatabaseDriver::Postgres => {
                list_pg(self.pool.as_postgres().unwrap(), params, author_id).await
            }
        }
    }

    async fn count(&self, author_id: Option<i64>) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => count_sqlite(self.pool.as_sqlite().unwrap(), author_id).await,
            DatabaseDriver::Postgres => count_pg(self.pool.as_postgres().unwrap(), author_id).await,
        }
    }

    async fn update(&self, article: &Article) -> Result<Article> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_sqlite(self.pool.as_sqlite().unwrap(), article).await,
            DatabaseDriver::Postgres => update_pg(self.pool.as_postgres().unwrap(), article).await,
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

async fn create_sqlite(pool: &SqlitePool, article: &Article) -> Result<Article> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO articles (slug, title, description, body, image_url, author_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&article.slug)
    .bind(&article.title)
    .bind(&article.description)
    .bind(&article.body)
    .bind(&article.image_url)
    .bind(article.author_id)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create article")?;

    let id = result.last_insert_rowid();
    get_by_id_sqlite(pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Article not found after create"))
}

async fn get_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Article>> {
    let row = sqlx::query("SELECT * FROM articles WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get article by ID")?;

    Ok(row.map(|row| row_to_article_sqlite(&row)))
}

async fn get_by_slug_sqlite(pool: &SqlitePool, slug: &str) -> Result<Option<Article>> {
    let row = sqlx::query("SELECT * FROM articles WHERE slug = ?")
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get article by slug")?;

    Ok(row.map(|row| row_to_article_sqlite(&row)))
}

async fn exists_by_slug_sqlite(pool: &SqlitePool, slug: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles WHERE slug = ?")
        .bind(slug)
        .fetch_one(pool)
        .await
        .context("Failed to check slug")?;

    Ok(count > 0)
}

async fn list_sqlite(
    pool: &SqlitePool,
    params: &ListParams,
    author_id: Option<i64>,
) -> Result<Vec<Article>> {
    let rows = match author_id {
        Some(author) => {
            sqlx::query(
                "SELECT * FROM articles WHERE author_id = ? ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            )
            .bind(author)
            .bind(params.limit())
            .bind(params.offset())
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query(
                "SELECT * FROM articles ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            )
            .bind(params.limit())
            .bind(params.offset())
            .fetch_all(pool)
            .await
        }
    }
    .context("Failed to list articles")?;

    Ok(rows.iter().map(row_to_article_sqlite).collect())
}

async fn count_sqlite(pool: &SqlitePool, author_id: Option<i64>) -> Result<i64> {
    match author_id {
        Some(author) => sqlx::query_scalar("SELECT COUNT(*) FROM articles WHERE author_id = ?")
            .bind(author)
            .fetch_one(pool)
            .await
            .context("Failed to count articles"),
        None => sqlx::query_scalar("SELECT COUNT(*) FROM articles")
            .fetch_one(pool)
            .await
            .context("Failed to count articles"),
    }
}

async fn update_sqlite(pool: &SqlitePool, article: &Article) -> Result<Article> {
    let now = Utc::now();

    sqlx::query(
        r#"
        UPDATE articles
        SET title = ?, description = ?, body = ?, image_url = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&article.title)
    .bind(&article.description)
    .bind(&article.body)
    .bind(&article.image_url)
    .bind(now)
    .bind(article.id)
    .execute(pool)
    .await
    .context("Failed to update article")?;

    get_by_id_sqlite(pool, article.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Article not found after update"))
}

async fn delete_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM articles WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete article")?;

    Ok(())
}

// ============================================================================
// PostgreSQL implementations
// ============================================================================

async fn create_pg(pool: &PgPool, article: &Article) -> Result<Article> {
    let now = Utc::now();

    let row = sqlx::query(
        r#"
        INSERT INTO articles (slug, title, description, body, image_url, author_id, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id
        "#,
    )
    .bind(&article.slug)
    .bind(&article.title)
    .bind(&article.description)
    .bind(&article.body)
    .bind(&article.image_url)
    .bind(article.author_id)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await
    .context("Failed to create article")?;

    let id: i64 = row.get("id");
    get_by_id_pg(pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Article not found after create"))
}

async fn get_by_id_pg(pool: &PgPool, id: i64) -> Result<Option<Article>> {
    let row = sqlx::query("SELECT * FROM articles WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get article by ID")?;

    Ok(row.map(|row| row_to_article_pg(&row)))
}

async fn get_by_slug_pg(pool: &PgPool, slug: &str) -> Result<Option<Article>> {
    let row = sqlx::query("SELECT * FROM articles WHERE slug = $1")
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get article by slug")?;

    Ok(row.map(|row| row_to_article_pg(&row)))
}

async fn exists_by_slug_pg(pool: &PgPool, slug: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles WHERE slug = $1")
        .bind(slug)
        .fetch_one(pool)
        .await
        .context("Failed to check slug")?;

    Ok(count > 0)
}

async fn list_pg(
    pool: &PgPool,
    params: &ListParams,
    author_id: Option<i64>,
) -> Result<Vec<Article>> {
    let rows = match author_id {
        Some(author) => {
            sqlx::query(
                "SELECT * FROM articles WHERE author_id = $1 ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3",
            )
            .bind(author)
            .bind(params.limit())
            .bind(params.offset())
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query(
                "SELECT * FROM articles ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2",
            )
            .bind(params.limit())
            .bind(params.offset())
            .fetch_all(pool)
            .await
        }
    }
    .context("Failed to list articles")?;

    Ok(rows.iter().map(row_to_article_pg).collect())
}

async fn count_pg(pool: &PgPool, author_id: Option<i64>) -> Result<i64> {
    match author_id {
        Some(author) => sqlx::query_scalar("SELECT COUNT(*) FROM articles WHERE author_id = $1")
            .bind(author)
            .fetch_one(pool)
            .await
            .context("Failed to count articles"),
        None => sqlx::query_scalar("SELECT COUNT(*) FROM articles")
            .fetch_one(pool)
            .await
            .context("Failed to count articles"),
    }
}

async fn update_pg(pool: &PgPool, article: &Article) -> Result<Article> {
    let now = Utc::now();

    sqlx::query(
        r#"
        UPDATE articles
        SET title = $1, description = $2, body = $3, image_url = $4, updated_at = $5
        WHERE id = $6
        "#,
    )
    .bind(&article.title)
    .bind(&article.description)
    .bind(&article.body)
    .bind(&article.image_url)
    .bind(now)
    .bind(article.id)
    .execute(pool)
    .await
    .context("Failed to update article")?;

    get_by_id_pg(pool, article.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Article not found after update"))
}

async fn delete_pg(pool: &PgPool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM articles WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete article")?;

    Ok(())
}

// ============================================================================
// Row mapping
// ============================================================================

fn row_to_article_sqlite(row: &sqlx::sqlite::SqliteRow) -> Article {
    Article {
        id: row.get("id"),
        slug: row.get("slug"),
        title: row.get("title"),
        description: row.get("description"),
        body: row.get("body"),
        image_url: row.get("image_url"),
        author_id: row.get("author_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn row_to_article_pg(row: &sqlx::postgres::PgRow) -> Article {
    Article {
        id: row.get("id"),
        slug: row.get("slug"),
        title: row.get("title"),
        description: row.get("description"),
        body: row.get("body"),
        image_url: row.get("image_url"),
        author_id: row.get("author_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use crate::models::User;

    async fn setup() -> (DynDatabasePool, SqlxArticleRepository, i64) {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();

        let users = SqlxUserRepository::new(pool.clone());
        let user = users
            .create(&User::new(
                "writer".to_string(),
                "writer@example.com".to_string(),
                "hash".to_string(),
            ))
            .await
            .unwrap();

        (pool.clone(), SqlxArticleRepository::new(pool), user.id)
    }

    fn sample(slug: &str, author_id: i64) -> Article {
        Article::new(
            slug.to_string(),
            format!("Title for {}", slug),
            "A description".to_string(),
            "Body text".to_string(),
            None,
            author_id,
        )
    }

    #[tokio::test]
    async fn test_create_and_get_by_slug() {
        let (_pool, repo, author) = setup().await;
        let created = repo.create(&sample("hello-world", author)).await.unwrap();
        assert!(created.id > 0);

        let found = repo.get_by_slug("hello-world").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.author_id, author);
        assert!(repo.exists_by_slug("hello-world").await.unwrap());
        assert!(!repo.exists_by_slug("missing").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_slug_rejected() {
        let (_pool, repo, author) = setup().await;
        repo.create(&sample("taken", author)).await.unwrap();
        let result = repo.create(&sample("taken", author)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_list_is_paginated_newest_first() {
        let (_pool, repo, author) = setup().await;
        for i in 0..5 {
            repo.create(&sample(&format!("post-{}", i), author))
                .await
                .unwrap();
        }

        let params = ListParams::new(1, 2);
        let page = repo.list(&params, None).await.unwrap();
        assert_eq!(page.len(), 2);
        // Same-timestamp ties break on id, so the last insert comes first
        assert_eq!(page[0].slug, "post-4");

        assert_eq!(repo.count(None).await.unwrap(), 5);
        assert_eq!(repo.count(Some(author)).await.unwrap(), 5);
        assert_eq!(repo.count(Some(author + 999)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_leaves_slug_untouched() {
        let (_pool, repo, author) = setup().await;
        let mut article = repo.create(&sample("stable-slug", author)).await.unwrap();

        article.title = "Completely new title".to_string();
        article.body = "New body".to_string();
        let updated = repo.update(&article).await.unwrap();

        assert_eq!(updated.slug, "stable-slug");
        assert_eq!(updated.title, "Completely new title");
    }

    #[tokio::test]
    async fn test_delete() {
        let (_pool, repo, author) = setup().await;
        let article = repo.create(&sample("doomed", author)).await.unwrap();
        repo.delete(article.id).await.unwrap();
        assert!(repo.get_by_slug("doomed").await.unwrap().is_none());
    }
}
