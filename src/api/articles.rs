//! Article endpoints
//!
//! Listing, reading, creating, editing, and deleting articles. Only the
//! author may edit or delete; reading is public.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::{ArticleListResponse, ArticleResponse};
use crate::models::{CreateArticleInput, ListParams, UpdateArticleInput};

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// Filter by author username
    pub author: Option<String>,
}

/// GET /articles - paginated listing, newest first
pub async fn list_articles(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let params = ListParams::new(query.page.unwrap_or(1), query.per_page.unwrap_or(20));
    let page = state
        .article_service
        .list(params, query.author.as_deref())
        .await?;
    Ok(Json(ArticleListResponse::from(page)))
}

/// GET /articles/{slug} - a single article
pub async fn get_article(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let article = state.article_service.get_by_slug(&slug).await?;
    Ok(Json(ArticleResponse::from(article)))
}

/// POST /articles - create an article
pub async fn create_article(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    Json(input): Json<CreateArticleInput>,
) -> Result<impl IntoResponse, ApiError> {
    let article = state.article_service.create(user.id, input).await?;
    Ok((StatusCode::CREATED, Json(ArticleResponse::from(article))))
}

/// PUT /articles/{slug} - edit an article (author only; slug never changes)
pub async fn update_article(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    Json(input): Json<UpdateArticleInput>,
) -> Result<impl IntoResponse, ApiError> {
    let article = state.article_service.update(&slug, user.id, input).await?;
    Ok(Json(ArticleResponse::from(article)))
}

/// DELETE /articles/{slug} - delete an article and its comments (author only)
pub async fn delete_article(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, ApiError> {
    state.article_service.delete(&slug, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
