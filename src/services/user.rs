//! User service
//!
//! Account lifecycle: registration with email verification, login and
//! session management, account updates, and the forgot/reset password flow.
//!
//! Accounts start unconfirmed and cannot log in until the verification link
//! from the welcome email has been followed. Verification and reset tokens
//! are single-use; redeeming one deletes it.

use crate::config::AuthConfig;
use crate::db::repositories::{
    ProfileRepository, SessionRepository, TokenRepository, UserRepository,
};
use crate::models::{AuthToken, Session, TokenPurpose, UpdateUserInput, User};
use crate::services::email::DynMailer;
use crate::services::password::{hash_password, verify_password};
use anyhow::Context;
use chrono::{Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap()
});

const MIN_PASSWORD_LEN: usize = 8;

/// User service errors
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("User not found")]
    NotFound,

    #[error("{0} is already taken")]
    Conflict(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Account email is not verified")]
    NotConfirmed,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Input for registering a new account
#[derive(Debug, Clone, serde::Deserialize)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// User service
pub struct UserService {
    users: Arc<dyn UserRepository>,
    profiles: Arc<dyn ProfileRepository>,
    sessions: Arc<dyn SessionRepository>,
    tokens: Arc<dyn TokenRepository>,
    mailer: DynMailer,
    auth: AuthConfig,
    public_url: String,
}

impl UserService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        users: Arc<dyn UserRepository>,
        profiles: Arc<dyn ProfileRepository>,
        sessions: Arc<dyn SessionRepository>,
        tokens: Arc<dyn TokenRepository>,
        mailer: DynMailer,
        auth: AuthConfig,
        public_url: String,
    ) -> Self {
        Self {
            users,
            profiles,
            sessions,
            tokens,
            mailer,
            auth,
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }

    /// Register a new account.
    ///
    /// Creates the user (unconfirmed), an empty profile, and emails a
    /// verification link. The account cannot log in until verified.
    pub async fn register(&self, input: RegisterInput) -> Result<User, UserServiceError> {
        let username = input.username.trim();
        let email = input.email.trim().to_lowercase();

        if username.is_empty() {
            return Err(UserServiceError::ValidationError(
                "Username cannot be empty".to_string(),
            ));
        }
        if !EMAIL_RE.is_match(&email) {
            return Err(UserServiceError::ValidationError(
                "Invalid email address".to_string(),
            ));
        }
        if input.password.len() < MIN_PASSWORD_LEN {
            return Err(UserServiceError::ValidationError(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        if self
            .users
            .get_by_username(username)
            .await
            .context("Failed to check username")?
            .is_some()
        {
            return Err(UserServiceError::Conflict("Username".to_string()));
        }
        if self
            .users
            .get_by_email(&email)
            .await
            .context("Failed to check email")?
            .is_some()
        {
            return Err(UserServiceError::Conflict("Email".to_string()));
        }

        let password_hash = hash_password(&input.password)?;
        let user = self
            .users
            .create(&User::new(username.to_string(), email, password_hash))
            .await
            .context("Failed to create user")?;

        self.profiles
            .create(user.id)
            .await
            .context("Failed to create profile")?;

        self.send_verification_email(&user).await?;

        info!(user_id = user.id, username = %user.username, "Registered new account");
        Ok(user)
    }

    /// Issue a fresh verification token and email the activation link.
    async fn send_verification_email(&self, user: &User) -> Result<(), UserServiceError> {
        let token = self
            .issue_token(user.id, TokenPurpose::Verify, Duration::hours(self.auth.verify_token_hours))
            .await?;

        let link = format!(
            "{}/api/v1/users/verify/{}/{}",
            self.public_url, user.id, token
        );
        let body = format!(
            "Hi {},\n\nWelcome! Please confirm your email address by visiting:\n\n{}\n\nThe link expires in {} hours. If you did not create this account, ignore this email.\n",
            user.username, link, self.auth.verify_token_hours
        );

        self.mailer
            .send(&user.email, "Verify your account", &body)
            .await
            .context("Failed to send verification email")?;

        Ok(())
    }

    /// Confirm an account from a verification link.
    ///
    /// The token is deleted on success, so a link can only be used once.
    pub async fn verify_email(&self, user_id: i64, token: &str) -> Result<User, UserServiceError> {
        let stored = self
            .tokens
            .find(user_id, token, TokenPurpose::Verify)
            .await
            .context("Failed to look up verification token")?
            .ok_or(UserServiceError::InvalidToken)?;

        if stored.is_expired() {
            self.tokens
                .delete(stored.id)
                .await
                .context("Failed to delete expired token")?;
            return Err(UserServiceError::InvalidToken);
        }

        let mut user = self
            .users
            .get_by_id(user_id)
            .await
            .context("Failed to load user")?
            .ok_or(UserServiceError::NotFound)?;

        user.is_confirmed = true;
        let user = self
            .users
            .update(&user)
            .await
            .context("Failed to confirm user")?;

        self.tokens
            .delete(stored.id)
            .await
            .context("Failed to delete redeemed token")?;

        info!(user_id = user.id, "Account email verified");
        Ok(user)
    }

    /// Log in with email and password.
    ///
    /// Rejects unconfirmed accounts even with correct credentials.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(User, Session), UserServiceError> {
        let email = email.trim().to_lowercase();

        let user = self
            .users
            .get_by_email(&email)
            .await
            .context("Failed to look up user")?
            .ok_or(UserServiceError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash)? {
            warn!(user_id = user.id, "Login failed: wrong password");
            return Err(UserServiceError::InvalidCredentials);
        }

        if !user.is_confirmed {
            return Err(UserServiceError::NotConfirmed);
        }

        let session = self.create_session(user.id).await?;
        info!(user_id = user.id, "Logged in");
        Ok((user, session))
    }

    /// Mint a new session for a user.
    pub async fn create_session(&self, user_id: i64) -> Result<Session, UserServiceError> {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().simple().to_string(),
            user_id,
            expires_at: now + Duration::days(self.auth.session_days),
            created_at: now,
        };
        self.sessions
            .create(&session)
            .await
            .context("Failed to create session")?;
        Ok(session)
    }

    /// Log out by invalidating one session.
    pub async fn logout(&self, session_id: &str) -> Result<(), UserServiceError> {
        self.sessions
            .delete(session_id)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// Resolve a bearer token to its user, if the session is still live.
    pub async fn authenticate(&self, session_id: &str) -> Result<Option<User>, UserServiceError> {
        let session = match self
            .sessions
            .get_by_id(session_id)
            .await
            .context("Failed to look up session")?
        {
            Some(s) => s,
            None => return Ok(None),
        };

        if session.is_expired() {
            self.sessions
                .delete(&session.id)
                .await
                .context("Failed to delete expired session")?;
            return Ok(None);
        }

        let user = self
            .users
            .get_by_id(session.user_id)
            .await
            .context("Failed to load session user")?;
        Ok(user)
    }

    /// Get a user by id.
    pub async fn get_user(&self, user_id: i64) -> Result<User, UserServiceError> {
        self.users
            .get_by_id(user_id)
            .await
            .context("Failed to load user")?
            .ok_or(UserServiceError::NotFound)
    }

    /// Update the authenticated user's account.
    pub async fn update_account(
        &self,
        user_id: i64,
        input: UpdateUserInput,
    ) -> Result<User, UserServiceError> {
        let mut user = self.get_user(user_id).await?;

        if !input.has_changes() {
            return Ok(user);
        }

        if let Some(username) = input.username {
            let username = username.trim().to_string();
            if username.is_empty() {
                return Err(UserServiceError::ValidationError(
                    "Username cannot be empty".to_string(),
                ));
            }
            if username != user.username {
                if self
                    .users
                    .get_by_username(&username)
                    .await
                    .context("Failed to check username")?
                    .is_some()
                {
                    return Err(UserServiceError::Conflict("Username".to_string()));
                }
                user.username = username;
            }
        }

        if let Some(email) = input.email {
            let email = email.trim().to_lowercase();
            if !EMAIL_RE.is_match(&email) {
                return Err(UserServiceError::ValidationError(
                    "Invalid email address".to_string(),
                ));
            }
            if email != user.email {
                if self
                    .users
                    .get_by_email(&email)
                    .await
                    .context("Failed to check email")?
                    .is_some()
                {
                    return Err(UserServiceError::Conflict("Email".to_string()));
                }
                user.email = email;
            }
        }

        if let Some(password) = input.password {
            if password.len() < MIN_PASSWORD_LEN {
                return Err(UserServiceError::ValidationError(format!(
                    "Password must be at least {} characters",
                    MIN_PASSWORD_LEN
                )));
            }
            user.password_hash = hash_password(&password)?;
        }

        if let Some(notifications) = input.email_notifications {
            user.email_notifications = notifications;
        }

        let user = self
            .users
            .update(&user)
            .await
            .context("Failed to update user")?;
        Ok(user)
    }

    /// Start a password reset.
    ///
    /// Always succeeds from the caller's perspective so the endpoint does not
    /// reveal whether an email is registered.
    pub async fn forgot_password(&self, email: &str) -> Result<(), UserServiceError> {
        let email = email.trim().to_lowercase();

        let user = match self
            .users
            .get_by_email(&email)
            .await
            .context("Failed to look up user")?
        {
            Some(user) => user,
            None => {
                info!("Password reset requested for unknown email");
                return Ok(());
            }
        };

        let token = self
            .issue_token(
                user.id,
                TokenPurpose::PasswordReset,
                Duration::minutes(self.auth.reset_token_minutes),
            )
            .await?;

        let link = format!(
            "{}/api/v1/users/reset-password/{}/{}",
            self.public_url, user.id, token
        );
        let body = format!(
            "Hi {},\n\nA password reset was requested for your account. Visit:\n\n{}\n\nThe link expires in {} minutes. If you did not request this, ignore this email.\n",
            user.username, link, self.auth.reset_token_minutes
        );

        self.mailer
            .send(&user.email, "Reset your password", &body)
            .await
            .context("Failed to send reset email")?;

        Ok(())
    }

    /// Complete a password reset.
    ///
    /// Requires a live reset token for the user. On success the token is
    /// deleted and every existing session is invalidated.
    pub async fn reset_password(
        &self,
        user_id: i64,
        token: &str,
        new_password: &str,
    ) -> Result<(), UserServiceError> {
        if new_password.len() < MIN_PASSWORD_LEN {
            return Err(UserServiceError::ValidationError(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let stored = self
            .tokens
            .find(user_id, token, TokenPurpose::PasswordReset)
            .await
            .context("Failed to look up reset token")?
            .ok_or(UserServiceError::InvalidToken)?;

        if stored.is_expired() {
            self.tokens
                .delete(stored.id)
                .await
                .context("Failed to delete expired token")?;
            return Err(UserServiceError::InvalidToken);
        }

        let mut user = self.get_user(user_id).await?;
        user.password_hash = hash_password(new_password)?;
        self.users
            .update(&user)
            .await
            .context("Failed to update password")?;

        self.tokens
            .delete(stored.id)
            .await
            .context("Failed to delete redeemed token")?;
        self.sessions
            .delete_by_user(user_id)
            .await
            .context("Failed to invalidate sessions")?;

        info!(user_id, "Password reset completed");
        Ok(())
    }

    async fn issue_token(
        &self,
        user_id: i64,
        purpose: TokenPurpose,
        ttl: Duration,
    ) -> Result<String, UserServiceError> {
        let now = Utc::now();
        let value = Uuid::new_v4().simple().to_string();
        self.tokens
            .create(&AuthToken {
                id: 0,
                user_id,
                token: value.clone(),
                purpose,
                expires_at: now + ttl,
                created_at: now,
            })
            .await
            .context("Failed to store token")?;
        Ok(value)
    }
}
