//! Comment endpoints
//!
//! Threaded comments on articles. Reading is public; writing requires a
//! session, and only the comment's author may delete it.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::CreateCommentInput;

/// GET /articles/{slug}/comments - the article's comment thread
pub async fn list_comments(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let thread = state.comment_service.list_threaded(&slug).await?;
    Ok(Json(thread))
}

/// POST /articles/{slug}/comments - comment on an article
pub async fn create_comment(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    Json(input): Json<CreateCommentInput>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = state.comment_service.create(&slug, user.id, input).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// DELETE /articles/{slug}/comments/{id} - delete a comment and its replies
pub async fn delete_comment(
    State(state): State<AppState>,
    Path((slug, comment_id)): Path<(String, i64)>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .comment_service
        .delete(&slug, comment_id, user.id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
