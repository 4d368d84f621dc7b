//! Data models
//!
//! This module contains all data structures used throughout Inkpress.
//! Models represent:
//! - Database entities (User, Profile, Article, Comment, Session, AuthToken)
//! - Internal data transfer objects

mod article;
mod comment;
mod profile;
mod session;
mod token;
mod user;

pub use article::{Article, CreateArticleInput, ListParams, PagedResult, UpdateArticleInput};
pub use comment::{Comment, CommentThread, CreateCommentInput};
pub use profile::{Profile, UpdateProfileInput};
pub use session::Session;
pub use token::{AuthToken, TokenPurpose};
pub use user::{UpdateUserInput, User};
