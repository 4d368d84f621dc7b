//! Repository layer
//!
//! Repositories encapsulate all SQL and row mapping. Each repository is a
//! trait plus a SQLx-backed implementation that dispatches per driver, so
//! services can be tested against an in-memory SQLite database.

mod article;
mod comment;
mod profile;
mod session;
mod token;
mod user;

pub use article::{ArticleRepository, SqlxArticleRepository};
pub use comment::{CommentRepository, CommentWithAuthor, SqlxCommentRepository};
pub use profile::{ProfileRepository, SqlxProfileRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use token::{SqlxTokenRepository, TokenRepository};
pub use user::{SqlxUserRepository, UserRepository};
