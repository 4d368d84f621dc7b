//! API layer - HTTP handlers and routing
//!
//! This module contains all HTTP API endpoints for Inkpress:
//! - Account and authentication endpoints (including social sign-in)
//! - Profile endpoints with follow/unfollow
//! - Article endpoints
//! - Comment endpoints
//!
//! Everything is served under `/api/v1`.

pub mod articles;
pub mod auth;
pub mod comments;
pub mod middleware;
pub mod profiles;
pub mod responses;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use middleware::{ApiError, AppState, AuthenticatedUser};

/// Build the main API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Routes that require a valid session
    let protected_routes = Router::new()
        .route("/users/logout", post(auth::logout))
        .route("/user", get(auth::current_user))
        .route("/user", put(auth::update_user))
        .route("/profile", put(profiles::update_profile))
        .route("/profiles/{username}/follow", post(profiles::follow))
        .route("/profiles/{username}/follow", delete(profiles::unfollow))
        .route("/articles", post(articles::create_article))
        .route("/articles/{slug}", put(articles::update_article))
        .route("/articles/{slug}", delete(articles::delete_article))
        .route("/articles/{slug}/comments", post(comments::create_comment))
        .route(
            "/articles/{slug}/comments/{id}",
            delete(comments::delete_comment),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Public routes; optional_auth lets profile lookups see the viewer
    Router::new()
        .route("/users", post(auth::register))
        .route("/users/verify/{user_id}/{token}", get(auth::verify_email))
        .route("/users/login", post(auth::login))
        .route("/users/forgot-password", post(auth::forgot_password))
        .route("/users/reset-password", put(auth::reset_password))
        .route("/users/social/{provider}", post(auth::social_login))
        .route("/profiles/{username}", get(profiles::get_profile))
        .route("/articles", get(articles::list_articles))
        .route("/articles/{slug}", get(articles::get_article))
        .route("/articles/{slug}/comments", get(comments::list_comments))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::optional_auth,
        ))
        .merge(protected_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let cors = match cors_origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
            .allow_credentials(true),
        Err(_) => CorsLayer::permissive(),
    };

    Router::new()
        .nest("/api/v1", build_api_router(state.clone()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
