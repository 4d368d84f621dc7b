//! Comment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Comment entity
///
/// Belongs to exactly one article and one author. `parent_id` points at
/// another comment on the same article for threaded replies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub article_id: i64,
    pub author_id: i64,
    pub parent_id: Option<i64>,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    /// Create a new comment with the given parameters
    pub fn new(article_id: i64, author_id: i64, parent_id: Option<i64>, body: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // Set by the database
            article_id,
            author_id,
            parent_id,
            body,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Comment with author info and nested replies for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentThread {
    pub id: i64,
    pub article_id: i64,
    pub author_id: i64,
    pub parent_id: Option<i64>,
    pub body: String,
    pub author_username: String,
    pub author_image: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub replies: Vec<CommentThread>,
}

/// Input for creating a comment
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCommentInput {
    pub body: String,
    pub parent_id: Option<i64>,
}
