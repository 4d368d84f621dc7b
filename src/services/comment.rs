//! Comment service
//!
//! Commenting on articles with one level of threading via `parent_id`.
//! A reply's parent must be a comment on the same article. Deleting a
//! comment takes its replies with it; deleting an article takes everything.

use crate::db::repositories::{ArticleRepository, CommentRepository, CommentWithAuthor};
use crate::models::{Comment, CommentThread, CreateCommentInput, Profile};
use anyhow::Context;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Comment service errors
#[derive(Debug, thiserror::Error)]
pub enum CommentServiceError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Article not found")]
    ArticleNotFound,

    #[error("Comment not found")]
    NotFound,

    #[error("You do not own this comment")]
    Forbidden,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Comment service
pub struct CommentService {
    comments: Arc<dyn CommentRepository>,
    articles: Arc<dyn ArticleRepository>,
}

impl CommentService {
    pub fn new(comments: Arc<dyn CommentRepository>, articles: Arc<dyn ArticleRepository>) -> Self {
        Self { comments, articles }
    }

    /// Create a comment on an article identified by slug.
    pub async fn create(
        &self,
        slug: &str,
        author_id: i64,
        input: CreateCommentInput,
    ) -> Result<Comment, CommentServiceError> {
        if input.body.trim().is_empty() {
            return Err(CommentServiceError::ValidationError(
                "Comment body cannot be empty".to_string(),
            ));
        }

        let article = self
            .articles
            .get_by_slug(slug)
            .await
            .context("Failed to load article")?
            .ok_or(CommentServiceError::ArticleNotFound)?;

        if let Some(parent_id) = input.parent_id {
            let parent = self
                .comments
                .get_by_id(parent_id)
                .await
                .context("Failed to load parent comment")?
                .ok_or_else(|| {
                    CommentServiceError::ValidationError("Parent comment does not exist".to_string())
                })?;

            if parent.article_id != article.id {
                return Err(CommentServiceError::ValidationError(
                    "Parent comment belongs to a different article".to_string(),
                ));
            }
        }

        let comment = self
            .comments
            .create(&Comment::new(article.id, author_id, input.parent_id, input.body))
            .await
            .context("Failed to create comment")?;

        info!(comment_id = comment.id, article_id = article.id, "Created comment");
        Ok(comment)
    }

    /// List an article's comments as a thread: top-level comments in posting
    /// order, each with its replies nested beneath it.
    pub async fn list_threaded(&self, slug: &str) -> Result<Vec<CommentThread>, CommentServiceError> {
        let article = self
            .articles
            .get_by_slug(slug)
            .await
            .context("Failed to load article")?
            .ok_or(CommentServiceError::ArticleNotFound)?;

        let rows = self
            .comments
            .list_by_article(article.id)
            .await
            .context("Failed to list comments")?;

        Ok(build_thread(rows))
    }

    /// Delete a comment on an article. Only the comment's author may delete.
    pub async fn delete(
        &self,
        slug: &str,
        comment_id: i64,
        user_id: i64,
    ) -> Result<(), CommentServiceError> {
        let article = self
            .articles
            .get_by_slug(slug)
            .await
            .context("Failed to load article")?
            .ok_or(CommentServiceError::ArticleNotFound)?;

        let comment = self
            .comments
            .get_by_id(comment_id)
            .await
            .context("Failed to load comment")?
            .ok_or(CommentServiceError::NotFound)?;

        if comment.article_id != article.id {
            return Err(CommentServiceError::NotFound);
        }
        if comment.author_id != user_id {
            return Err(CommentServiceError::Forbidden);
        }

        self.comments
            .delete(comment_id)
            .await
            .context("Failed to delete comment")?;

        info!(comment_id, "Deleted comment");
        Ok(())
    }
}

/// Assemble flat rows (already oldest-first) into a nested thread.
///
/// Replies whose parent is itself a reply are attached wherever their parent
/// sits in the tree.
fn build_thread(rows: Vec<CommentWithAuthor>) -> Vec<CommentThread> {
    let mut nodes: HashMap<i64, CommentThread> = HashMap::new();
    let mut order: Vec<i64> = Vec::with_capacity(rows.len());

    for row in &rows {
        let image = row
            .author_image
            .clone()
            .unwrap_or_else(|| Profile::gravatar_url(&row.author_email));
        nodes.insert(
            row.comment.id,
            CommentThread {
                id: row.comment.id,
                article_id: row.comment.article_id,
                author_id: row.comment.author_id,
                parent_id: row.comment.parent_id,
                body: row.comment.body.clone(),
                author_username: row.author_username.clone(),
                author_image: image,
                created_at: row.comment.created_at,
                replies: Vec::new(),
            },
        );
        order.push(row.comment.id);
    }

    let mut roots = Vec::new();
    // Children come after their parents in posting order, so walking the
    // order backwards lets each node be moved into its parent exactly once.
    for id in order.iter().rev() {
        let node = match nodes.remove(id) {
            Some(node) => node,
            None => continue,
        };
        match node.parent_id.and_then(|pid| nodes.get_mut(&pid)) {
            Some(parent) => parent.replies.insert(0, node),
            None => roots.insert(0, node),
        }
    }

    roots
}
