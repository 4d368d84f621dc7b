//! Profile model
//!
//! A Profile is the public, user-facing identity attached one-to-one to a
//! User account. It carries the bio and image plus the self-referential
//! "follows" relationship between profiles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Profile entity, keyed by the owning user's id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Owning user id (primary key, cascades with the user)
    pub user_id: i64,
    /// Username of the owning user (denormalized for display)
    pub username: String,
    /// Short biography
    pub bio: Option<String>,
    /// Avatar image URL; when absent, responses fall back to Gravatar
    pub image: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Gravatar URL derived from an email address, used when `image` is unset.
    pub fn gravatar_url(email: &str) -> String {
        let hash = format!("{:x}", md5::compute(email.trim().to_lowercase()));
        format!("https://www.gravatar.com/avatar/{}?d=mp&s=160", hash)
    }
}

/// Input for updating the authenticated user's profile
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfileInput {
    /// New bio (optional; empty string clears it)
    pub bio: Option<String>,
    /// New image URL (optional; empty string clears it)
    pub image: Option<String>,
}
