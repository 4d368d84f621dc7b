//! Social sign-in
//!
//! OAuth2 "sign in with ..." support. The client application completes the
//! OAuth2 dance itself and posts the provider access token here; we call the
//! provider's userinfo endpoint to learn who the token belongs to, then find
//! or create a matching local account.
//!
//! Accounts created this way are confirmed immediately (the provider has
//! already verified the email) and get a random local password.

use crate::config::OAuthConfig;
use crate::db::repositories::{ProfileRepository, SessionRepository, UserRepository};
use crate::models::{Session, User};
use crate::services::password::{generate_random_password, hash_password};
use anyhow::Context;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use rand::Rng;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Social sign-in errors
#[derive(Debug, thiserror::Error)]
pub enum SocialAuthError {
    #[error("Unknown provider '{0}'")]
    UnknownProvider(String),

    #[error("Provider rejected the token: {0}")]
    ProviderRejected(String),

    #[error("Provider response is missing an email address")]
    MissingEmail,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Fetches identity claims from a provider's userinfo endpoint.
///
/// Abstracted so the service can be tested without network access.
#[async_trait]
pub trait UserInfoClient: Send + Sync {
    async fn fetch(
        &self,
        url: &str,
        access_token: &str,
    ) -> Result<serde_json::Value, SocialAuthError>;
}

/// HTTP userinfo client backed by reqwest
pub struct HttpUserInfoClient {
    client: reqwest::Client,
}

impl HttpUserInfoClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub fn shared() -> Arc<dyn UserInfoClient> {
        Arc::new(Self::new())
    }
}

impl Default for HttpUserInfoClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserInfoClient for HttpUserInfoClient {
    async fn fetch(
        &self,
        url: &str,
        access_token: &str,
    ) -> Result<serde_json::Value, SocialAuthError> {
        let response = self
            .client
            .get(url)
            .bearer_auth(access_token)
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to reach provider")?;

        if !response.status().is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "no response body".to_string());
            return Err(SocialAuthError::ProviderRejected(text));
        }

        let value = response
            .json()
            .await
            .context("Failed to parse provider response")?;
        Ok(value)
    }
}

/// Social sign-in service
pub struct SocialAuthService {
    config: OAuthConfig,
    client: Arc<dyn UserInfoClient>,
    users: Arc<dyn UserRepository>,
    profiles: Arc<dyn ProfileRepository>,
    sessions: Arc<dyn SessionRepository>,
    session_days: i64,
}

impl SocialAuthService {
    pub fn new(
        config: OAuthConfig,
        client: Arc<dyn UserInfoClient>,
        users: Arc<dyn UserRepository>,
        profiles: Arc<dyn ProfileRepository>,
        sessions: Arc<dyn SessionRepository>,
        session_days: i64,
    ) -> Self {
        Self {
            config,
            client,
            users,
            profiles,
            sessions,
            session_days,
        }
    }

    /// Sign in with a provider access token, creating the account on first use.
    pub async fn login(
        &self,
        provider: &str,
        access_token: &str,
    ) -> Result<(User, Session), SocialAuthError> {
        let provider_config = self
            .config
            .providers
            .get(provider)
            .ok_or_else(|| SocialAuthError::UnknownProvider(provider.to_string()))?;

        let claims = self
            .client
            .fetch(&provider_config.user_info_url, access_token)
            .await?;

        let email = extract_email(&claims).ok_or(SocialAuthError::MissingEmail)?;

        let user = match self
            .users
            .get_by_email(&email)
            .await
            .context("Failed to look up user")?
        {
            Some(user) => user,
            None => self.create_account(provider, &email, &claims).await?,
        };

        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().simple().to_string(),
            user_id: user.id,
            expires_at: now + Duration::days(self.session_days),
            created_at: now,
        };
        self.sessions
            .create(&session)
            .await
            .context("Failed to create session")?;

        Ok((user, session))
    }

    async fn create_account(
        &self,
        provider: &str,
        email: &str,
        claims: &serde_json::Value,
    ) -> Result<User, SocialAuthError> {
        let mut username = extract_username(claims, email);

        // Disambiguate if the preferred name is taken
        while self
            .users
            .get_by_username(&username)
            .await
            .context("Failed to check username")?
            .is_some()
        {
            username = format!("{}{}", username, rand::thread_rng().gen_range(100..1000));
        }

        let password_hash = hash_password(&generate_random_password())?;
        let mut new_user = User::new(username, email.to_string(), password_hash);
        // The provider already verified this address
        new_user.is_confirmed = true;

        let user = self
            .users
            .create(&new_user)
            .await
            .context("Failed to create user")?;
        self.profiles
            .create(user.id)
            .await
            .context("Failed to create profile")?;

        info!(user_id = user.id, provider, "Created account from social sign-in");
        Ok(user)
    }
}

/// Pull an email address out of provider claims.
fn extract_email(claims: &serde_json::Value) -> Option<String> {
    claims
        .get("email")
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
}

/// Pick a username from provider claims, falling back to the email local part.
fn extract_username(claims: &serde_json::Value, email: &str) -> String {
    for key in ["preferred_username", "login", "username", "name"] {
        if let Some(name) = claims.get(key).and_then(|v| v.as_str()) {
            let cleaned: String = name
                .chars()
                .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
                .collect();
            if !cleaned.is_empty() {
                return cleaned;
            }
        }
    }
    email.split('@').next().unwrap_or("user").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OAuthProviderConfig;
    use crate::db::repositories::{
        SqlxProfileRepository, SqlxSessionRepository, SqlxUserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use serde_json::json;
    use std::collections::HashMap;

    /// Stub provider returning a canned response
    struct StubClient {
        response: Result<serde_json::Value, String>,
    }

    #[async_trait]
    impl UserInfoClient for StubClient {
        async fn fetch(
            &self,
            _url: &str,
            _access_token: &str,
        ) -> Result<serde_json::Value, SocialAuthError> {
            match &self.response {
                Ok(value) => Ok(value.clone()),
                Err(text) => Err(SocialAuthError::ProviderRejected(text.clone())),
            }
        }
    }

    async fn service(response: Result<serde_json::Value, String>) -> SocialAuthService {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();

        let mut providers = HashMap::new();
        providers.insert(
            "github".to_string(),
            OAuthProviderConfig {
                user_info_url: "https://api.github.com/user".to_string(),
            },
        );

        SocialAuthService::new(
            OAuthConfig { providers },
            Arc::new(StubClient { response }),
            SqlxUserRepository::shared(pool.clone()),
            SqlxProfileRepository::shared(pool.clone()),
            SqlxSessionRepository::shared(pool),
            7,
        )
    }

    #[tokio::test]
    async fn test_unknown_provider() {
        let svc = service(Ok(json!({}))).await;
        assert!(matches!(
            svc.login("myspace", "token").await,
            Err(SocialAuthError::UnknownProvider(_))
        ));
    }

    #[tokio::test]
    async fn test_provider_rejection_is_surfaced() {
        let svc = service(Err("bad credentials".to_string())).await;
        let err = svc.login("github", "expired").await.unwrap_err();
        match err {
            SocialAuthError::ProviderRejected(text) => assert_eq!(text, "bad credentials"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_email_rejected() {
        let svc = service(Ok(json!({"login": "octocat"}))).await;
        assert!(matches!(
            svc.login("github", "token").await,
            Err(SocialAuthError::MissingEmail)
        ));
    }

    #[tokio::test]
    async fn test_first_login_creates_confirmed_account() {
        let svc = service(Ok(json!({
            "login": "octocat",
            "email": "Octo@Example.com"
        })))
        .await;

        let (user, session) = svc.login("github", "token").await.unwrap();
        assert_eq!(user.email, "octo@example.com");
        assert_eq!(user.username, "octocat");
        assert!(user.is_confirmed);
        assert!(!session.is_expired());

        // Second login reuses the account
        let (again, _) = svc.login("github", "token").await.unwrap();
        assert_eq!(again.id, user.id);
    }

    #[test]
    fn test_extract_username_fallbacks() {
        assert_eq!(
            extract_username(&json!({"name": "Jane Doe"}), "jane@example.com"),
            "JaneDoe"
        );
        assert_eq!(extract_username(&json!({}), "jane@example.com"), "jane");
        assert_eq!(
            extract_username(&json!({"login": "!!!"}), "x@example.com"),
            "x"
        );
    }
}
