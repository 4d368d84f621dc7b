//! API response types
//!
//! Serializable views of the domain models. Passwords and other internal
//! fields never appear here; profile images fall back to Gravatar when the
//! user has not set one.

use crate::models::{Article, PagedResult, Profile, User};
use crate::services::ProfileView;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Account data returned to its owner
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub is_confirmed: bool,
    pub email_notifications: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            is_confirmed: user.is_confirmed,
            email_notifications: user.email_notifications,
            created_at: user.created_at,
        }
    }
}

///// Login / social sign-in result: the account plus a bearer token
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
}

/// Public profile
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub username: String,
    pub bio: Option<String>,
    pub image: String,
    pub following: bool,
    pub followers: i64,
}

impl From<ProfileView> for ProfileResponse {
    fn from(view: ProfileView) -> Self {
        let image = view
            .profile
            .image
            .clone()
            .unwrap_or_else(|| Profile::gravatar_url(&view.email));
        Self {
            username: view.profile.username,
            bio: view.profile.bio,
            image,
            following: view.following,
            followers: view.followers,
        }
    }
}

/// Article data
#[derive(Debug, Serialize)]
pub struct ArticleResponse {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub body: String,
    pub image_url: Option<String>,
    pub author_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Article> for ArticleResponse {
    fn from(article: Article) -> Self {
        Self {
            id: article.id,
            slug: article.slug,
            title: article.title,
            description: article.description,
            body: article.body,
            image_url: article.image_url,
            author_id: article.author_id,
            created_at: article.created_at,
            updated_at: article.updated_at,
        }
    }
}

/// Paginated article listing
#[derive(Debug, Serialize)]
pub struct ArticleListResponse {
    pub articles: Vec<ArticleResponse>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
}

impl From<PagedResult<Article>> for ArticleListResponse {
    fn from(page: PagedResult<Article>) -> Self {
        let total_pages = page.total_pages();
        Self {
            articles: page.items.into_iter().map(ArticleResponse::from).collect(),
            total: page.total,
            page: page.page,
            per_page: page.per_page,
            total_pages,
        }
    }
}

/// Simple message acknowledgement
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
