//! Business logic layer
//!
//! Services sit between the HTTP handlers and the repositories. Each service
//! owns the rules for its slice of the domain and reports failures through a
//! dedicated error enum that the API layer maps onto status codes.

pub mod article;
pub mod comment;
pub mod email;
pub mod password;
pub mod profile;
pub mod social;
pub mod user;

pub use article::{ArticleService, ArticleServiceError};
pub use comment::{CommentService, CommentServiceError};
pub use email::{DynMailer, Mailer, SmtpMailer};
pub use profile::{ProfileService, ProfileServiceError, ProfileView};
pub use social::{HttpUserInfoClient, SocialAuthError, SocialAuthService, UserInfoClient};
pub use user::{RegisterInput, UserService, UserServiceError};
