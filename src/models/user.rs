//! User model
//!
//! The User entity holds account credentials and flags. User-facing identity
//! (bio, image, follows) lives in [`crate::models::Profile`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User entity representing a registered account.
///
/// Accounts start unconfirmed; the email verification link flips
/// `is_confirmed` exactly once. Login is refused until then.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Username (unique)
    pub username: String,
    /// Email address (unique)
    pub email: String,
    /// Password hash (argon2 PHC string)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Whether the email address has been verified
    pub is_confirmed: bool,
    /// Whether the user wants transactional notification emails
    pub email_notifications: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new unconfirmed User.
    ///
    /// The password must already be hashed; use
    /// `services::password::hash_password()`.
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // Set by the database
            username,
            email,
            password_hash,
            is_confirmed: false,
            email_notifications: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Input for updating the authenticated account
#[derive(Debug, Clone, Default)]
pub struct UpdateUserInput {
    /// New username (optional)
    pub username: Option<String>,
    /// New email (optional)
    pub email: Option<String>,
    /// New plaintext password (optional, hashed by the service)
    pub password: Option<String>,
    /// New notification preference (optional)
    pub email_notifications: Option<bool>,
}

impl UpdateUserInput {
    /// Check if any field is set
    pub fn has_changes(&self) -> bool {
        self.username.is_some()
            || self.email.is_some()
            || self.password.is_some()
            || self.email_notifications.is_some()
    }
}
