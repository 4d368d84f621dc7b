//! Profile endpoints
//!
//! Public profile lookup, editing your own profile, and follow/unfollow.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Extension, Json,
};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::ProfileResponse;
use crate::models::UpdateProfileInput;

/// GET /profiles/{username} - public profile with the viewer's follow state
pub async fn get_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
    viewer: Option<Extension<AuthenticatedUser>>,
) -> Result<impl IntoResponse, ApiError> {
    let viewer_id = viewer.map(|Extension(AuthenticatedUser(user))| user.id);

    let view = state
        .profile_service
        .get_by_username(&username, viewer_id)
        .await?;
    Ok(Json(ProfileResponse::from(view)))
}

/// PUT /profile - update the authenticated user's profile
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    Json(input): Json<UpdateProfileInput>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state.profile_service.update_own(user.id, input).await?;
    Ok(Json(ProfileResponse::from(view)))
}

/// POST /profiles/{username}/follow - follow a user
pub async fn follow(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state.profile_service.follow(user.id, &username).await?;
    Ok(Json(ProfileResponse::from(view)))
}

/// DELETE /profiles/{username}/follow - stop following a user
pub async fn unfollow(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state.profile_service.unfollow(user.id, &username).await?;
    Ok(Json(ProfileResponse::from(view)))
}
