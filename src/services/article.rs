//! Article service
//!
//! Article CRUD with slug generation. A slug is derived from the title once,
//! at creation, and is never regenerated; title edits leave the URL stable.
//!
//! Slug uniqueness is handled by appending a short random suffix when the
//! base slug is taken. Before appending, the base is shortened to keep the
//! whole slug within [`MAX_SLUG_LEN`]: trailing hyphen segments are dropped
//! first, and a single over-long segment is hard-truncated.

use crate::db::repositories::{ArticleRepository, UserRepository};
use crate::models::{
    Article, CreateArticleInput, ListParams, PagedResult, UpdateArticleInput,
};
use anyhow::Context;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::sync::Arc;
use tracing::info;

/// Maximum slug length, matching the column width.
pub const MAX_SLUG_LEN: usize = 255;

/// Length of the random uniqueness suffix.
const SUFFIX_LEN: usize = 6;

/// Article service errors
#[derive(Debug, thiserror::Error)]
pub enum ArticleServiceError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Article not found")]
    NotFound,

    #[error("You do not own this article")]
    Forbidden,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Article service
pub struct ArticleService {
    articles: Arc<dyn ArticleRepository>,
    users: Arc<dyn UserRepository>,
}

impl ArticleService {
    pub fn new(articles: Arc<dyn ArticleRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { articles, users }
    }

    /// Create an article for the given author.
    pub async fn create(
        &self,
        author_id: i64,
        input: CreateArticleInput,
    ) -> Result<Article, ArticleServiceError> {
        let title = input.title.trim();
        if title.is_empty() {
            return Err(ArticleServiceError::ValidationError(
                "Title cannot be empty".to_string(),
            ));
        }
        if input.body.trim().is_empty() {
            return Err(ArticleServiceError::ValidationError(
                "Body cannot be empty".to_string(),
            ));
        }

        let slug = self.unique_slug(title).await?;
        let article = self
            .articles
            .create(&Article::new(
                slug,
                title.to_string(),
                input.description,
                input.body,
                input.image_url,
                author_id,
            ))
            .await
            .context("Failed to create article")?;

        info!(article_id = article.id, slug = %article.slug, "Created article");
        Ok(article)
    }

    /// Get an article by slug.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Article, ArticleServiceError> {
        self.articles
            .get_by_slug(slug)
            .await
            .context("Failed to load article")?
            .ok_or(ArticleServiceError::NotFound)
    }

    /// List articles newest-first, optionally filtered by author username.
    pub async fn list(
        &self,
        params: ListParams,
        author_username: Option<&str>,
    ) -> Result<PagedResult<Article>, ArticleServiceError> {
        let author_id = match author_username {
            Some(username) => {
                let user = self
                    .users
                    .get_by_username(username)
                    .await
                    .context("Failed to resolve author")?;
                match user {
                    Some(user) => Some(user.id),
                    // Unknown author matches nothing
                    None => {
                        return Ok(PagedResult::new(vec![], 0, &params));
                    }
                }
            }
            None => None,
        };

        let items = self
            .articles
            .list(&params, author_id)
            .await
            .context("Failed to list articles")?;
        let total = self
            .articles
            .count(author_id)
            .await
            .context("Failed to count articles")?;

        Ok(PagedResult::new(items, total, &params))
    }

    /// Update an article. Only the author may edit; the slug never changes.
    pub async fn update(
        &self,
        slug: &str,
        user_id: i64,
        input: UpdateArticleInput,
    ) -> Result<Article, ArticleServiceError> {
        let mut article = self.get_by_slug(slug).await?;

        if article.author_id != user_id {
            return Err(ArticleServiceError::Forbidden);
        }
        if !input.has_changes() {
            return Ok(article);
        }

        if let Some(title) = input.title {
            let title = title.trim().to_string();
            if title.is_empty() {
                return Err(ArticleServiceError::ValidationError(
                    "Title cannot be empty".to_string(),
                ));
            }
            article.title = title;
        }
        if let Some(description) = input.description {
            article.description = description;
        }
        if let Some(body) = input.body {
            if body.trim().is_empty() {
                return Err(ArticleServiceError::ValidationError(
                    "Body cannot be empty".to_string(),
                ));
            }
            article.body = body;
        }
        if let Some(image_url) = input.image_url {
            article.image_url = if image_url.trim().is_empty() {
                None
            } else {
                Some(image_url)
            };
        }

        let article = self
            .articles
            .update(&article)
            .await
            .context("Failed to update article")?;
        Ok(article)
    }

    /// Delete an article. Only the author may delete; comments cascade.
    pub async fn delete(&self, slug: &str, user_id: i64) -> Result<(), ArticleServiceError> {
        let article = self.get_by_slug(slug).await?;

        if article.author_id != user_id {
            return Err(ArticleServiceError::Forbidden);
        }

        self.articles
            .delete(article.id)
            .await
            .context("Failed to delete article")?;

        info!(article_id = article.id, slug = %article.slug, "Deleted article");
        Ok(())
    }

    /// Produce a unique slug for a title.
    ///
    /// Every slug is the slugified title plus a random suffix, with the base
    /// shortened as needed to stay within [`MAX_SLUG_LEN`]. On the rare
    /// suffix collision a fresh suffix is drawn.
    async fn unique_slug(&self, title: &str) -> Result<String, ArticleServiceError> {
        let base = truncate_slug(&slugify(title), MAX_SLUG_LEN);

        loop {
            let candidate = with_suffix(&base, &random_suffix());
            if !self
                .articles
                .exists_by_slug(&candidate)
                .await
                .context("Failed to check slug")?
            {
                return Ok(candidate);
            }
        }
    }
}

/// Turn a title into a URL-safe slug.
///
/// Lowercases, maps runs of non-alphanumeric characters to single hyphens,
/// and trims hyphens from both ends. Titles with no usable characters fall
/// back to "untitled".
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_was_hyphen = true; // Suppress a leading hyphen

    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            slug.push('-');
            last_was_hyphen = true;
        }
    }

    let slug = slug.trim_end_matches('-').to_string();
    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug
    }
}

/// Hard-truncate a slug to `max` bytes without leaving a trailing hyphen.
fn truncate_slug(slug: &str, max: usize) -> String {
    if slug.len() <= max {
        return slug.to_string();
    }
    slug[..max].trim_end_matches('-').to_string()
}

/// Append a uniqueness suffix, shortening the base so the result fits
/// within [`MAX_SLUG_LEN`].
///
/// Whole hyphen segments are dropped from the end first; if a single
/// segment is still too long it is hard-truncated.
fn with_suffix(base: &str, suffix: &str) -> String {
    let mut base = base.to_string();

    while base.len() + 1 + suffix.len() > MAX_SLUG_LEN {
        match base.rfind('-') {
            Some(pos) => base.truncate(pos),
            None => {
                base.truncate(MAX_SLUG_LEN - suffix.len() - 1);
                break;
            }
        }
    }

    format!("{}-{}", base, suffix)
}

/// Random lowercase alphanumeric suffix.
fn random_suffix() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(|b| (b as char).to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxArticleRepository, SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::User;
    use proptest::prelude::*;

    async fn setup() -> (ArticleService, i64, i64) {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();

        let users = SqlxUserRepository::shared(pool.clone());
        let author = users
            .create(&User::new(
                "author".to_string(),
                "author@example.com".to_string(),
                "hash".to_string(),
            ))
            .await
            .unwrap();
        let other = users
            .create(&User::new(
                "other".to_string(),
                "other@example.com".to_string(),
                "hash".to_string(),
            ))
            .await
            .unwrap();

        let svc = ArticleService::new(SqlxArticleRepository::shared(pool), users);
        (svc, author.id, other.id)
    }

    fn input(title: &str) -> CreateArticleInput {
        CreateArticleInput {
            title: title.to_string(),
            description: "desc".to_string(),
            body: "body".to_string(),
            image_url: None,
        }
    }

    #[test]
    fn test_slugify_basics() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  Spaces   everywhere  "), "spaces-everywhere");
        assert_eq!(slugify("Ünïcödé is dropped"), "n-c-d-is-dropped");
        assert_eq!(slugify("!!!"), "untitled");
        assert_eq!(slugify("Rust 2024"), "rust-2024");
    }

    #[test]
    fn test_with_suffix_drops_whole_segments() {
        // Base is exactly at the limit; adding a suffix must drop the last
        // segment rather than cutting mid-word.
        let base = format!("{}-{}", "a".repeat(200), "b".repeat(54));
        assert_eq!(base.len(), MAX_SLUG_LEN);

        let result = with_suffix(&base, "xyzxyz");
        assert_eq!(result, format!("{}-xyzxyz", "a".repeat(200)));
        assert!(result.len() <= MAX_SLUG_LEN);
    }

    #[test]
    fn test_with_suffix_hard_truncates_single_segment() {
        let base = "a".repeat(300);
        let result = with_suffix(&base, "xyzxyz");
        assert_eq!(result.len(), MAX_SLUG_LEN);
        assert!(result.ends_with("-xyzxyz"));
    }

    #[test]
    fn test_with_suffix_short_base_untouched() {
        assert_eq!(with_suffix("hello-world", "abc123"), "hello-world-abc123");
    }

    proptest! {
        #[test]
        fn prop_slug_with_suffix_fits(title in ".{0,400}") {
            let base = truncate_slug(&slugify(&title), MAX_SLUG_LEN);
            let result = with_suffix(&base, "abc123");
            prop_assert!(result.len() <= MAX_SLUG_LEN);
            prop_assert!(result.ends_with("-abc123"));
        }

        #[test]
        fn prop_slugify_is_url_safe(title in ".{0,200}") {
            let slug = slugify(&title);
            prop_assert!(!slug.is_empty());
            prop_assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
            prop_assert!(!slug.starts_with('-'));
            prop_assert!(!slug.ends_with('-'));
        }
    }

    #[tokio::test]
    async fn test_create_generates_suffixed_slug_from_title() {
        let (svc, author, _) = setup().await;
        let article = svc.create(author, input("My First Post")).await.unwrap();

        // Every slug carries the random suffix, not just colliding ones
        let suffix = article.slug.strip_prefix("my-first-post-").unwrap();
        assert_eq!(suffix.len(), SUFFIX_LEN);
        assert!(suffix
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn test_duplicate_titles_get_distinct_slugs() {
        let (svc, author, _) = setup().await;
        let a = svc.create(author, input("Same Title")).await.unwrap();
        let b = svc.create(author, input("Same Title")).await.unwrap();
        let c = svc.create(author, input("Same Title")).await.unwrap();

        assert!(a.slug.starts_with("same-title-"));
        assert!(b.slug.starts_with("same-title-"));
        assert!(c.slug.starts_with("same-title-"));
        assert_ne!(b.slug, a.slug);
        assert_ne!(c.slug, b.slug);
        assert_ne!(c.slug, a.slug);
        assert!(b.slug.len() <= MAX_SLUG_LEN);
    }

    #[tokio::test]
    async fn test_very_long_title_slug_fits() {
        let (svc, author, _) = setup().await;
        let long_title = "word ".repeat(100);
        let a = svc.create(author, input(&long_title)).await.unwrap();
        let b = svc.create(author, input(&long_title)).await.unwrap();

        assert!(a.slug.len() <= MAX_SLUG_LEN);
        assert!(b.slug.len() <= MAX_SLUG_LEN);
        assert_ne!(a.slug, b.slug);
    }

    #[tokio::test]
    async fn test_update_keeps_slug() {
        let (svc, author, _) = setup().await;
        let article = svc.create(author, input("Original Title")).await.unwrap();

        let updated = svc
            .update(
                &article.slug,
                author,
                UpdateArticleInput {
                    title: Some("Brand New Title".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.slug, article.slug);
        assert_eq!(updated.title, "Brand New Title");
    }

    #[tokio::test]
    async fn test_only_author_may_edit_or_delete() {
        let (svc, author, other) = setup().await;
        let article = svc.create(author, input("Protected")).await.unwrap();

        let err = svc
            .update(
                &article.slug,
                other,
                UpdateArticleInput {
                    body: Some("hijacked".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ArticleServiceError::Forbidden));

        let err = svc.delete(&article.slug, other).await.unwrap_err();
        assert!(matches!(err, ArticleServiceError::Forbidden));

        svc.delete(&article.slug, author).await.unwrap();
        assert!(matches!(
            svc.get_by_slug(&article.slug).await,
            Err(ArticleServiceError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_list_filters_by_author() {
        let (svc, author, other) = setup().await;
        svc.create(author, input("One")).await.unwrap();
        svc.create(author, input("Two")).await.unwrap();
        svc.create(other, input("Three")).await.unwrap();

        let all = svc.list(ListParams::default(), None).await.unwrap();
        assert_eq!(all.total, 3);

        let mine = svc
            .list(ListParams::default(), Some("author"))
            .await
            .unwrap();
        assert_eq!(mine.total, 2);

        let none = svc
            .list(ListParams::default(), Some("ghost"))
            .await
            .unwrap();
        assert_eq!(none.total, 0);
    }
}
