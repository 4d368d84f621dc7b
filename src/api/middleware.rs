//! API middleware
//!
//! Shared application state, the API error envelope, and the session
//! authentication middleware. Handlers receive the logged-in user through
//! the [`AuthenticatedUser`] request extension.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::models::User;
use crate::services::{
    ArticleService, ArticleServiceError, CommentService, CommentServiceError, ProfileService,
    ProfileServiceError, SocialAuthError, SocialAuthService, UserService, UserServiceError,
};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: crate::db::DynDatabasePool,
    pub user_service: Arc<UserService>,
    pub profile_service: Arc<ProfileService>,
    pub article_service: Arc<ArticleService>,
    pub comment_service: Arc<CommentService>,
    pub social_service: Arc<SocialAuthService>,
}

/// Authenticated user extracted from the request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

/// Error response envelope for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self)).into_response()
    }
}

impl From<UserServiceError> for ApiError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            UserServiceError::NotFound => ApiError::not_found("User not found"),
            UserServiceError::Conflict(what) => {
                ApiError::conflict(format!("{} is already taken", what))
            }
            UserServiceError::InvalidCredentials => {
                ApiError::unauthorized("Invalid email or password")
            }
            UserServiceError::NotConfirmed => {
                ApiError::forbidden("Account email is not verified")
            }
            UserServiceError::InvalidToken => {
                ApiError::validation_error("Invalid or expired token")
            }
            UserServiceError::Internal(e) => {
                tracing::error!(error = %e, "User service error");
                ApiError::internal_error("Internal server error")
            }
        }
    }
}

impl From<ProfileServiceError> for ApiError {
    fn from(err: ProfileServiceError) -> Self {
        match err {
            ProfileServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            ProfileServiceError::NotFound => ApiError::not_found("Profile not found"),
            ProfileServiceError::Internal(e) => {
                tracing::error!(error = %e, "Profile service error");
                ApiError::internal_error("Internal server error")
            }
        }
    }
}

impl From<ArticleServiceError> for ApiError {
    fn from(err: ArticleServiceError) -> Self {
        match err {
            ArticleServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            ArticleServiceError::NotFound => ApiError::not_found("Article not found"),
            ArticleServiceError::Forbidden => {
                ApiError::forbidden("You do not have permission to modify this article")
            }
            ArticleServiceError::Internal(e) => {
                tracing::error!(error = %e, "Article service error");
                ApiError::internal_error("Internal server error")
            }
        }
    }
}

impl From<CommentServiceError> for ApiError {
    fn from(err: CommentServiceError) -> Self {
        match err {
            CommentServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            CommentServiceError::ArticleNotFound => ApiError::not_found("Article not found"),
            CommentServiceError::NotFound => ApiError::not_found("Comment not found"),
            CommentServiceError::Forbidden => {
                ApiError::forbidden("You do not have permission to delete this comment")
            }
            CommentServiceError::Internal(e) => {
                tracing::error!(error = %e, "Comment service error");
                ApiError::internal_error("Internal server error")
            }
        }
    }
}

impl From<SocialAuthError> for ApiError {
    fn from(err: SocialAuthError) -> Self {
        match err {
            SocialAuthError::UnknownProvider(name) => {
                ApiError::not_found(format!("Unknown provider '{}'", name))
            }
            SocialAuthError::ProviderRejected(text) => {
                ApiError::validation_error(format!("Provider rejected the token: {}", text))
            }
            SocialAuthError::MissingEmail => {
                ApiError::validation_error("Provider response is missing an email address")
            }
            SocialAuthError::Internal(e) => {
                tracing::error!(error = %e, "Social auth error");
                ApiError::internal_error("Internal server error")
            }
        }
    }
}

/// Extract the session token from the Authorization header or session cookie
fn extract_session_token(request: &Request) -> Option<String> {
    if let Some(auth_header) = request.headers().get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Some(token.to_string());
            }
        }
    }

    if let Some(cookie_header) = request.headers().get(header::COOKIE) {
        if let Ok(cookie_str) = cookie_header.to_str() {
            for cookie in cookie_str.split(';') {
                let cookie = cookie.trim();
                if let Some(token) = cookie.strip_prefix("session=") {
                    return Some(token.to_string());
                }
            }
        }
    }

    None
}

/// Authentication middleware
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_session_token(&request)
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    let user = state
        .user_service
        .authenticate(&token)
        .await
        .map_err(|e| ApiError::internal_error(format!("Session validation failed: {}", e)))?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired session"))?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

/// Optional authentication middleware
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = extract_session_token(&request) {
        if let Ok(Some(user)) = state.user_service.authenticate(&token).await {
            request.extensions_mut().insert(AuthenticatedUser(user));
        }
    }
    next.run(request).await
}
