//! Profile service
//!
//! Public profile lookup, profile editing, and the follow relationship.
//! Following yourself is rejected with a validation error.

use crate::db::repositories::{ProfileRepository, UserRepository};
use crate::models::{Profile, UpdateProfileInput};
use anyhow::Context;
use std::sync::Arc;
use tracing::info;

/// Profile service errors
#[derive(Debug, thiserror::Error)]
pub enum ProfileServiceError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Profile not found")]
    NotFound,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// A profile together with the viewer's follow state
#[derive(Debug, Clone)]
pub struct ProfileView {
    pub profile: Profile,
    pub email: String,
    /// Whether the requesting user follows this profile (false when anonymous)
    pub following: bool,
    /// How many users follow this profile
    pub followers: i64,
}

/// Profile service
pub struct ProfileService {
    profiles: Arc<dyn ProfileRepository>,
    users: Arc<dyn UserRepository>,
}

impl ProfileService {
    pub fn new(profiles: Arc<dyn ProfileRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { profiles, users }
    }

    /// Get a profile by username, with the viewer's follow state.
    pub async fn get_by_username(
        &self,
        username: &str,
        viewer_id: Option<i64>,
    ) -> Result<ProfileView, ProfileServiceError> {
        let profile = self
            .profiles
            .get_by_username(username)
            .await
            .context("Failed to load profile")?
            .ok_or(ProfileServiceError::NotFound)?;

        self.view(profile, viewer_id).await
    }

    /// Update the authenticated user's own profile.
    pub async fn update_own(
        &self,
        user_id: i64,
        input: UpdateProfileInput,
    ) -> Result<ProfileView, ProfileServiceError> {
        let mut profile = self
            .profiles
            .get_by_user_id(user_id)
            .await
            .context("Failed to load profile")?
            .ok_or(ProfileServiceError::NotFound)?;

        if let Some(bio) = input.bio {
            profile.bio = if bio.trim().is_empty() { None } else { Some(bio) };
        }
        if let Some(image) = input.image {
            profile.image = if image.trim().is_empty() { None } else { Some(image) };
        }

        let profile = self
            .profiles
            .update(&profile)
            .await
            .context("Failed to update profile")?;

        self.view(profile, Some(user_id)).await
    }

    /// Follow another user by username.
    pub async fn follow(
        &self,
        follower_id: i64,
        username: &str,
    ) -> Result<ProfileView, ProfileServiceError> {
        let target = self
            .profiles
            .get_by_username(username)
            .await
            .context("Failed to load profile")?
            .ok_or(ProfileServiceError::NotFound)?;

        if target.user_id == follower_id {
            return Err(ProfileServiceError::ValidationError(
                "You cannot follow yourself".to_string(),
            ));
        }

        self.profiles
            .follow(follower_id, target.user_id)
            .await
            .context("Failed to follow")?;

        info!(follower_id, followed = target.user_id, "Followed user");
        self.view(target, Some(follower_id)).await
    }

    /// Stop following a user by username.
    pub async fn unfollow(
        &self,
        follower_id: i64,
        username: &str,
    ) -> Result<ProfileView, ProfileServiceError> {
        let target = self
            .profiles
            .get_by_username(username)
            .await
            .context("Failed to load profile")?
            .ok_or(ProfileServiceError::NotFound)?;

        self.profiles
            .unfollow(follower_id, target.user_id)
            .await
            .context("Failed to unfollow")?;

        self.view(target, Some(follower_id)).await
    }

    async fn view(
        &self,
        profile: Profile,
        viewer_id: Option<i64>,
    ) -> Result<ProfileView, ProfileServiceError> {
        let following = match viewer_id {
            Some(viewer) if viewer != profile.user_id => self
                .profiles
                .is_following(viewer, profile.user_id)
                .await
                .context("Failed to check follow state")?,
            _ => false,
        };

        let followers = self
            .profiles
            .follower_count(profile.user_id)
            .await
            .context("Failed to count followers")?;

        let user = self
            .users
            .get_by_id(profile.user_id)
            .await
            .context("Failed to load profile user")?
            .ok_or(ProfileServiceError::NotFound)?;

        Ok(ProfileView {
            profile,
            email: user.email,
            following,
            followers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxProfileRepository, SqlxUserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::User;

    async fn setup() -> (ProfileService, Arc<dyn ProfileRepository>, Arc<dyn UserRepository>) {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let profiles = SqlxProfileRepository::shared(pool.clone());
        let users = SqlxUserRepository::shared(pool);
        (
            ProfileService::new(profiles.clone(), users.clone()),
            profiles,
            users,
        )
    }

    async fn make_user(
        users: &Arc<dyn UserRepository>,
        profiles: &Arc<dyn ProfileRepository>,
        name: &str,
    ) -> i64 {
        let user = users
            .create(&User::new(
                name.to_string(),
                format!("{}@example.com", name),
                "hash".to_string(),
            ))
            .await
            .unwrap();
        profiles.create(user.id).await.unwrap();
        user.id
    }

    #[tokio::test]
    async fn test_lookup_unknown_profile() {
        let (svc, _profiles, _users) = setup().await;
        assert!(matches!(
            svc.get_by_username("nobody", None).await,
            Err(ProfileServiceError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_self_follow_rejected() {
        let (svc, profiles, users) = setup().await;
        let uid = make_user(&users, &profiles, "narcissus").await;

        assert!(matches!(
            svc.follow(uid, "narcissus").await,
            Err(ProfileServiceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_follow_and_unfollow() {
        let (svc, profiles, users) = setup().await;
        let a = make_user(&users, &profiles, "ana").await;
        let _b = make_user(&users, &profiles, "bea").await;

        let view = svc.follow(a, "bea").await.unwrap();
        assert!(view.following);
        assert_eq!(view.followers, 1);

        let view = svc.get_by_username("bea", Some(a)).await.unwrap();
        assert!(view.following);
        // Anonymous viewers never see a follow flag, but do see the count
        let view = svc.get_by_username("bea", None).await.unwrap();
        assert!(!view.following);
        assert_eq!(view.followers, 1);

        let view = svc.unfollow(a, "bea").await.unwrap();
        assert!(!view.following);
        assert_eq!(view.followers, 0);
    }

    #[tokio::test]
    async fn test_update_own_profile() {
        let (svc, profiles, users) = setup().await;
        let uid = make_user(&users, &profiles, "cleo").await;

        let view = svc
            .update_own(
                uid,
                UpdateProfileInput {
                    bio: Some("Writing about writing".to_string()),
                    image: Some("   ".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(view.profile.bio.as_deref(), Some("Writing about writing"));
        // Blank image clears the field
        assert!(view.profile.image.is_none());
    }
}
