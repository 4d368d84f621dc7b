//! End-to-end API tests
//!
//! Each test spins up the full router on an in-memory SQLite database with a
//! recording mailer and a stubbed social provider, then drives it over HTTP.

use anyhow::Result;
use async_trait::async_trait;
use axum::http::{header, HeaderValue};
use axum_test::TestServer;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

use inkpress::api::{self, AppState};
use inkpress::config::{AuthConfig, OAuthConfig, OAuthProviderConfig};
use inkpress::db::repositories::{
    SqlxArticleRepository, SqlxCommentRepository, SqlxProfileRepository, SqlxSessionRepository,
    SqlxTokenRepository, SqlxUserRepository,
};
use inkpress::db::{create_test_pool, migrations};
use inkpress::services::{
    ArticleService, CommentService, Mailer, ProfileService, SocialAuthError, SocialAuthService,
    UserInfoClient, UserService,
};

/// Mailer that records messages so tests can read verification links
#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<String>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, _to: &str, _subject: &str, body: &str) -> Result<()> {
        self.sent.lock().unwrap().push(body.to_string());
        Ok(())
    }
}

impl RecordingMailer {
    /// The `{user_id}/{token}` tail of the link in the most recent email
    fn last_link_parts(&self) -> (i64, String) {
        let sent = self.sent.lock().unwrap();
        let body = sent.last().expect("no email was sent");
        let line = body
            .lines()
            .find(|l| l.contains("/api/v1/users/"))
            .expect("email has no link");
        let mut parts = line.trim().rsplit('/');
        let token = parts.next().unwrap().to_string();
        let uid = parts.next().unwrap().parse().unwrap();
        (uid, token)
    }
}

/// Social provider stub; `Err` simulates a provider rejecting the token
struct StubProvider {
    response: std::result::Result<Value, String>,
}

#[async_trait]
impl UserInfoClient for StubProvider {
    async fn fetch(
        &self,
        _url: &str,
        _access_token: &str,
    ) -> std::result::Result<Value, SocialAuthError> {
        match &self.response {
            Ok(value) => Ok(value.clone()),
            Err(text) => Err(SocialAuthError::ProviderRejected(text.clone())),
        }
    }
}

async fn spawn_app_with_provider(
    provider_response: std::result::Result<Value, String>,
) -> (TestServer, Arc<RecordingMailer>) {
    let pool = create_test_pool().await.unwrap();
    migrations::run_migrations(&pool).await.unwrap();

    let user_repo = SqlxUserRepository::shared(pool.clone());
    let profile_repo = SqlxProfileRepository::shared(pool.clone());
    let session_repo = SqlxSessionRepository::shared(pool.clone());
    let token_repo = SqlxTokenRepository::shared(pool.clone());
    let article_repo = SqlxArticleRepository::shared(pool.clone());
    let comment_repo = SqlxCommentRepository::shared(pool.clone());

    let mailer = Arc::new(RecordingMailer::default());
    let user_service = Arc::new(UserService::new(
        user_repo.clone(),
        profile_repo.clone(),
        session_repo.clone(),
        token_repo,
        mailer.clone(),
        AuthConfig::default(),
        "http://localhost:8080".to_string(),
    ));

    let mut providers = std::collections::HashMap::new();
    providers.insert(
        "github".to_string(),
        OAuthProviderConfig {
            user_info_url: "https://api.github.com/user".to_string(),
        },
    );

    let state = AppState {
        pool: pool.clone(),
        user_service,
        profile_service: Arc::new(ProfileService::new(profile_repo.clone(), user_repo.clone())),
        article_service: Arc::new(ArticleService::new(article_repo.clone(), user_repo.clone())),
        comment_service: Arc::new(CommentService::new(comment_repo, article_repo)),
        social_service: Arc::new(SocialAuthService::new(
            OAuthConfig { providers },
            Arc::new(StubProvider {
                response: provider_response,
            }),
            user_repo,
            profile_repo,
            session_repo,
            7,
        )),
    };

    let app = api::build_router(state, "http://localhost:3000");
    (TestServer::new(app).unwrap(), mailer)
}

async fn spawn_app() -> (TestServer, Arc<RecordingMailer>) {
    spawn_app_with_provider(Ok(json!({}))).await
}

fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
}

/// Register and verify a user, returning a session token.
async fn signed_up(server: &TestServer, mailer: &RecordingMailer, name: &str) -> String {
    let response = server
        .post("/api/v1/users")
        .json(&json!({
            "username": name,
            "email": format!("{}@example.com", name),
            "password": "hunter2hunter2"
        }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);

    let (uid, token) = mailer.last_link_parts();
    server
        .get(&format!("/api/v1/users/verify/{}/{}", uid, token))
        .await
        .assert_status_ok();

    let login = server
        .post("/api/v1/users/login")
        .json(&json!({
            "email": format!("{}@example.com", name),
            "password": "hunter2hunter2"
        }))
        .await;
    login.assert_status_ok();
    login.json::<Value>()["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn registration_verification_and_login() {
    let (server, mailer) = spawn_app().await;

    let response = server
        .post("/api/v1/users")
        .json(&json!({
            "username": "alice",
            "email": "alice@example.com",
            "password": "hunter2hunter2"
        }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    let body = response.json::<Value>();
    assert_eq!(body["username"], "alice");
    assert_eq!(body["is_confirmed"], false);

    // Duplicate username conflicts
    let dup = server
        .post("/api/v1/users")
        .json(&json!({
            "username": "alice",
            "email": "other@example.com",
            "password": "hunter2hunter2"
        }))
        .await;
    dup.assert_status(axum::http::StatusCode::CONFLICT);
    assert_eq!(dup.json::<Value>()["error"]["code"], "CONFLICT");

    // Login is refused before verification
    let early = server
        .post("/api/v1/users/login")
        .json(&json!({"email": "alice@example.com", "password": "hunter2hunter2"}))
        .await;
    early.assert_status(axum::http::StatusCode::FORBIDDEN);

    // Follow the emailed link, then log in
    let (uid, token) = mailer.last_link_parts();
    server
        .get(&format!("/api/v1/users/verify/{}/{}", uid, token))
        .await
        .assert_status_ok();

    // The link only works once
    server
        .get(&format!("/api/v1/users/verify/{}/{}", uid, token))
        .await
        .assert_status(axum::http::StatusCode::BAD_REQUEST);

    let login = server
        .post("/api/v1/users/login")
        .json(&json!({"email": "alice@example.com", "password": "hunter2hunter2"}))
        .await;
    login.assert_status_ok();
    let session = login.json::<Value>();
    assert_eq!(session["user"]["username"], "alice");
    let token = session["token"].as_str().unwrap();

    // The token authenticates /user
    let me = server
        .get("/api/v1/user")
        .add_header(header::AUTHORIZATION, bearer(token))
        .await;
    me.assert_status_ok();
    assert_eq!(me.json::<Value>()["email"], "alice@example.com");

    // Without it the endpoint is unauthorized
    server
        .get("/api/v1/user")
        .await
        .assert_status(axum::http::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_invalidates_the_session() {
    let (server, mailer) = spawn_app().await;
    let token = signed_up(&server, &mailer, "bob").await;

    server
        .post("/api/v1/users/logout")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await
        .assert_status_ok();

    server
        .get("/api/v1/user")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await
        .assert_status(axum::http::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn password_reset_flow() {
    let (server, mailer) = spawn_app().await;
    signed_up(&server, &mailer, "carol").await;

    // Unknown email still gets a friendly 200
    server
        .post("/api/v1/users/forgot-password")
        .json(&json!({"email": "ghost@example.com"}))
        .await
        .assert_status_ok();

    server
        .post("/api/v1/users/forgot-password")
        .json(&json!({"email": "carol@example.com"}))
        .await
        .assert_status_ok();
    let (uid, reset_token) = mailer.last_link_parts();

    // Wrong token is rejected
    server
        .put("/api/v1/users/reset-password")
        .json(&json!({"user_id": uid, "token": "bogus", "password": "newpassword123"}))
        .await
        .assert_status(axum::http::StatusCode::BAD_REQUEST);

    server
        .put("/api/v1/users/reset-password")
        .json(&json!({"user_id": uid, "token": reset_token, "password": "newpassword123"}))
        .await
        .assert_status_ok();

    // Old password is gone
    server
        .post("/api/v1/users/login")
        .json(&json!({"email": "carol@example.com", "password": "hunter2hunter2"}))
        .await
        .assert_status(axum::http::StatusCode::UNAUTHORIZED);
    server
        .post("/api/v1/users/login")
        .json(&json!({"email": "carol@example.com", "password": "newpassword123"}))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn profiles_and_follows() {
    let (server, mailer) = spawn_app().await;
    let dana = signed_up(&server, &mailer, "dana").await;
    let _finn = signed_up(&server, &mailer, "finn").await;

    // Anonymous lookup works; unknown profile is 404
    let profile = server.get("/api/v1/profiles/finn").await;
    profile.assert_status_ok();
    assert_eq!(profile.json::<Value>()["following"], false);
    server
        .get("/api/v1/profiles/nobody")
        .await
        .assert_status(axum::http::StatusCode::NOT_FOUND);

    // Self-follow is a validation error
    server
        .post("/api/v1/profiles/dana/follow")
        .add_header(header::AUTHORIZATION, bearer(&dana))
        .await
        .assert_status(axum::http::StatusCode::BAD_REQUEST);

    // Follow, observe the flag, unfollow
    let followed = server
        .post("/api/v1/profiles/finn/follow")
        .add_header(header::AUTHORIZATION, bearer(&dana))
        .await;
    followed.assert_status_ok();
    assert_eq!(followed.json::<Value>()["following"], true);
    assert_eq!(followed.json::<Value>()["followers"], 1);

    let seen = server
        .get("/api/v1/profiles/finn")
        .add_header(header::AUTHORIZATION, bearer(&dana))
        .await;
    assert_eq!(seen.json::<Value>()["following"], true);

    let unfollowed = server
        .delete("/api/v1/profiles/finn/follow")
        .add_header(header::AUTHORIZATION, bearer(&dana))
        .await;
    assert_eq!(unfollowed.json::<Value>()["following"], false);
    assert_eq!(unfollowed.json::<Value>()["followers"], 0);

    // Profile editing
    let updated = server
        .put("/api/v1/profile")
        .add_header(header::AUTHORIZATION, bearer(&dana))
        .json(&json!({"bio": "I review plays"}))
        .await;
    updated.assert_status_ok();
    assert_eq!(updated.json::<Value>()["bio"], "I review plays");
}

#[tokio::test]
async fn article_crud_and_permissions() {
    let (server, mailer) = spawn_app().await;
    let gwen = signed_up(&server, &mailer, "gwen").await;
    let hal = signed_up(&server, &mailer, "hal").await;

    // Anonymous users cannot publish
    server
        .post("/api/v1/articles")
        .json(&json!({"title": "Nope", "description": "d", "body": "b"}))
        .await
        .assert_status(axum::http::StatusCode::UNAUTHORIZED);

    let created = server
        .post("/api/v1/articles")
        .add_header(header::AUTHORIZATION, bearer(&gwen))
        .json(&json!({"title": "Hello World", "description": "greeting", "body": "text"}))
        .await;
    created.assert_status(axum::http::StatusCode::CREATED);
    let slug = created.json::<Value>()["slug"].as_str().unwrap().to_string();
    // Slugs always carry a random 6-character suffix
    assert!(slug.starts_with("hello-world-"));
    assert_eq!(slug.len(), "hello-world-".len() + 6);

    // Same title gets a distinct slug
    let second = server
        .post("/api/v1/articles")
        .add_header(header::AUTHORIZATION, bearer(&gwen))
        .json(&json!({"title": "Hello World", "description": "again", "body": "text"}))
        .await;
    let second_slug = second.json::<Value>()["slug"].as_str().unwrap().to_string();
    assert_ne!(second_slug, slug);
    assert!(second_slug.starts_with("hello-world-"));

    // Listing and filtering
    let listing = server.get("/api/v1/articles").await;
    listing.assert_status_ok();
    assert_eq!(listing.json::<Value>()["total"], 2);
    let filtered = server.get("/api/v1/articles?author=hal").await;
    assert_eq!(filtered.json::<Value>()["total"], 0);

    // Only the author can edit; the slug survives a title change
    server
        .put(&format!("/api/v1/articles/{}", slug))
        .add_header(header::AUTHORIZATION, bearer(&hal))
        .json(&json!({"title": "Hijacked"}))
        .await
        .assert_status(axum::http::StatusCode::FORBIDDEN);

    let edited = server
        .put(&format!("/api/v1/articles/{}", slug))
        .add_header(header::AUTHORIZATION, bearer(&gwen))
        .json(&json!({"title": "Hello Again"}))
        .await;
    edited.assert_status_ok();
    assert_eq!(edited.json::<Value>()["slug"], slug.as_str());
    assert_eq!(edited.json::<Value>()["title"], "Hello Again");

    // Only the author can delete
    server
        .delete(&format!("/api/v1/articles/{}", slug))
        .add_header(header::AUTHORIZATION, bearer(&hal))
        .await
        .assert_status(axum::http::StatusCode::FORBIDDEN);
    server
        .delete(&format!("/api/v1/articles/{}", slug))
        .add_header(header::AUTHORIZATION, bearer(&gwen))
        .await
        .assert_status(axum::http::StatusCode::NO_CONTENT);
    server
        .get(&format!("/api/v1/articles/{}", slug))
        .await
        .assert_status(axum::http::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn threaded_comments() {
    let (server, mailer) = spawn_app().await;
    let iris = signed_up(&server, &mailer, "iris").await;
    let jack = signed_up(&server, &mailer, "jack").await;

    let created = server
        .post("/api/v1/articles")
        .add_header(header::AUTHORIZATION, bearer(&iris))
        .json(&json!({"title": "Discussion", "description": "d", "body": "b"}))
        .await;
    let slug = created.json::<Value>()["slug"].as_str().unwrap().to_string();

    let root = server
        .post(&format!("/api/v1/articles/{}/comments", slug))
        .add_header(header::AUTHORIZATION, bearer(&iris))
        .json(&json!({"body": "First!"}))
        .await;
    root.assert_status(axum::http::StatusCode::CREATED);
    let root_id = root.json::<Value>()["id"].as_i64().unwrap();

    server
        .post(&format!("/api/v1/articles/{}/comments", slug))
        .add_header(header::AUTHORIZATION, bearer(&jack))
        .json(&json!({"body": "A reply", "parent_id": root_id}))
        .await
        .assert_status(axum::http::StatusCode::CREATED);

    // Parent from another article is rejected
    let other = server
        .post("/api/v1/articles")
        .add_header(header::AUTHORIZATION, bearer(&iris))
        .json(&json!({"title": "Elsewhere", "description": "d", "body": "b"}))
        .await;
    let other_slug = other.json::<Value>()["slug"].as_str().unwrap().to_string();
    server
        .post(&format!("/api/v1/articles/{}/comments", other_slug))
        .add_header(header::AUTHORIZATION, bearer(&jack))
        .json(&json!({"body": "wrong thread", "parent_id": root_id}))
        .await
        .assert_status(axum::http::StatusCode::BAD_REQUEST);

    // The thread nests the reply under its parent
    let thread = server
        .get(&format!("/api/v1/articles/{}/comments", slug))
        .await;
    thread.assert_status_ok();
    let comments = thread.json::<Value>();
    assert_eq!(comments.as_array().unwrap().len(), 1);
    assert_eq!(comments[0]["body"], "First!");
    assert_eq!(comments[0]["replies"][0]["body"], "A reply");
    assert_eq!(comments[0]["replies"][0]["author_username"], "jack");

    // Only the comment author may delete it
    server
        .delete(&format!("/api/v1/articles/{}/comments/{}", slug, root_id))
        .add_header(header::AUTHORIZATION, bearer(&jack))
        .await
        .assert_status(axum::http::StatusCode::FORBIDDEN);
    server
        .delete(&format!("/api/v1/articles/{}/comments/{}", slug, root_id))
        .add_header(header::AUTHORIZATION, bearer(&iris))
        .await
        .assert_status(axum::http::StatusCode::NO_CONTENT);

    // Deleting the root removed the reply too
    let thread = server
        .get(&format!("/api/v1/articles/{}/comments", slug))
        .await;
    assert!(thread.json::<Value>().as_array().unwrap().is_empty());
}

#[tokio::test]
async fn social_login_creates_a_confirmed_account() {
    let (server, _mailer) = spawn_app_with_provider(Ok(json!({
        "login": "octocat",
        "email": "octo@example.com"
    })))
    .await;

    // Unknown provider
    server
        .post("/api/v1/users/social/myspace")
        .json(&json!({"access_token": "tok"}))
        .await
        .assert_status(axum::http::StatusCode::NOT_FOUND);

    let response = server
        .post("/api/v1/users/social/github")
        .json(&json!({"access_token": "tok"}))
        .await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["user"]["username"], "octocat");
    assert_eq!(body["user"]["is_confirmed"], true);

    // The session works immediately
    let token = body["token"].as_str().unwrap();
    server
        .get("/api/v1/user")
        .add_header(header::AUTHORIZATION, bearer(token))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn social_login_surfaces_provider_rejection() {
    let (server, _mailer) = spawn_app_with_provider(Err("bad credentials".to_string())).await;

    let response = server
        .post("/api/v1/users/social/github")
        .json(&json!({"access_token": "expired"}))
        .await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("bad credentials"));
}
