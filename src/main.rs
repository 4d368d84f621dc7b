//! Inkpress - a publishing platform backend

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use inkpress::{
    api::{self, AppState},
    config::Config,
    db::{
        self,
        repositories::{
            SqlxArticleRepository, SqlxCommentRepository, SqlxProfileRepository,
            SqlxSessionRepository, SqlxTokenRepository, SqlxUserRepository,
        },
    },
    services::{
        ArticleService, CommentService, HttpUserInfoClient, ProfileService, SmtpMailer,
        SocialAuthService, UserService,
    },
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inkpress=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Inkpress...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    // Run migrations
    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    // Create repositories
    let user_repo = SqlxUserRepository::shared(pool.clone());
    let profile_repo = SqlxProfileRepository::shared(pool.clone());
    let session_repo = SqlxSessionRepository::shared(pool.clone());
    let token_repo = SqlxTokenRepository::shared(pool.clone());
    let article_repo = SqlxArticleRepository::shared(pool.clone());
    let comment_repo = SqlxCommentRepository::shared(pool.clone());

    // Create services
    let mailer = SmtpMailer::shared(config.smtp.clone());
    let user_service = Arc::new(UserService::new(
        user_repo.clone(),
        profile_repo.clone(),
        session_repo.clone(),
        token_repo,
        mailer,
        config.auth.clone(),
        config.server.public_url.clone(),
    ));
    let profile_service = Arc::new(ProfileService::new(profile_repo.clone(), user_repo.clone()));
    let article_service = Arc::new(ArticleService::new(article_repo.clone(), user_repo.clone()));
    let comment_service = Arc::new(CommentService::new(comment_repo, article_repo));
    let social_service = Arc::new(SocialAuthService::new(
        config.oauth.clone(),
        HttpUserInfoClient::shared(),
        user_repo,
        profile_repo,
        session_repo.clone(),
        config.auth.session_days,
    ));

    // Periodic cleanup of expired sessions
    {
        let sessions = session_repo.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(3600));
            loop {
                interval.tick().await;
                match sessions.delete_expired().await {
                    Ok(0) => {}
                    Ok(n) => tracing::info!("Removed {} expired sessions", n),
                    Err(e) => tracing::warn!("Session cleanup failed: {}", e),
                }
            }
        });
    }

    // Build application state
    let state = AppState {
        pool: pool.clone(),
        user_service,
        profile_service,
        article_service,
        comment_service,
        social_service,
    };

    // Build router
    let app = api::build_router(state, &config.server.cors_origin);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
