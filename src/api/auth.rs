//! Authentication and account endpoints
//!
//! Registration with email verification, login/logout, the current-account
//! endpoints, the forgot/reset password flow, and social sign-in.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::{AuthResponse, MessageResponse, UserResponse};
use crate::models::UpdateUserInput;
use crate::services::RegisterInput;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub email_notifications: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub user_id: i64,
    pub token: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SocialLoginRequest {
    pub access_token: String,
}

/// POST /users - register a new account
pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterInput>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.user_service.register(input).await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// GET /users/verify/{user_id}/{token} - confirm an email address
pub async fn verify_email(
    State(state): State<AppState>,
    Path((user_id, token)): Path<(i64, String)>,
) -> Result<impl IntoResponse, ApiError> {
    state.user_service.verify_email(user_id, &token).await?;
    Ok(Json(MessageResponse::new("Email verified, you can now log in")))
}

/// POST /users/login - log in with email and password
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (user, session) = state.user_service.login(&req.email, &req.password).await?;
    Ok(Json(AuthResponse {
        user: UserResponse::from(user),
        token: session.id,
    }))
}

/// POST /users/logout - invalidate the current session
pub async fn logout(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(_user)): Extension<AuthenticatedUser>,
    headers: axum::http::HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    // The middleware validated the token; pull it again to delete the session
    let token = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    state.user_service.logout(token).await?;
    Ok(Json(MessageResponse::new("Logged out")))
}

/// GET /user - the authenticated account
pub async fn current_user(
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
) -> Json<UserResponse> {
    Json(UserResponse::from(user))
}

/// PUT /user - update the authenticated account
pub async fn update_user(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = state
        .user_service
        .update_account(
            user.id,
            UpdateUserInput {
                username: req.username,
                email: req.email,
                password: req.password,
                email_notifications: req.email_notifications,
            },
        )
        .await?;
    Ok(Json(UserResponse::from(updated)))
}

/// POST /users/forgot-password - start a password reset
///
/// Responds identically whether or not the email is registered.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.user_service.forgot_password(&req.email).await?;
    Ok(Json(MessageResponse::new(
        "If that email is registered, a reset link is on its way",
    )))
}

/// PUT /users/reset-password - complete a password reset
pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .user_service
        .reset_password(req.user_id, &req.token, &req.password)
        .await?;
    Ok(Json(MessageResponse::new("Password updated")))
}

/// POST /users/social/{provider} - sign in with an OAuth2 provider token
pub async fn social_login(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Json(req): Json<SocialLoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (user, session) = state
        .social_service
        .login(&provider, &req.access_token)
        .await?;
    Ok(Json(AuthResponse {
        user: UserResponse::from(user),
        token: session.id,
    }))
}
