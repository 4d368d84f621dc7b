//! Email-flow token model
//!
//! Single-use tokens backing the verification and password-reset links.
//! A token is deleted when redeemed; expired tokens are rejected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What an [`AuthToken`] may be redeemed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    /// Email verification after registration
    Verify,
    /// Password reset
    PasswordReset,
}

impl fmt::Display for TokenPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenPurpose::Verify => write!(f, "verify"),
            TokenPurpose::PasswordReset => write!(f, "password_reset"),
        }
    }
}

impl FromStr for TokenPurpose {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "verify" => Ok(TokenPurpose::Verify),
            "password_reset" => Ok(TokenPurpose::PasswordReset),
            _ => Err(anyhow::anyhow!("Invalid token purpose: {}", s)),
        }
    }
}

/// Single-use token tied to a user and purpose.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthToken {
    pub id: i64,
    pub user_id: i64,
    pub token: String,
    pub purpose: TokenPurpose,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl AuthToken {
    /// Check if the token has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}
