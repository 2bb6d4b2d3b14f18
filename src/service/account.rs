//! Account service
//!
//! Registration, login, profile edits and soft deletion.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Deserialize;
use validator::Validate;

use crate::auth::password::{hash_password, verify_password};
use crate::data::{Database, EntityId, Profile, User, UserUpdate, verbs};
use crate::error::AppError;
use crate::metrics::USERS_TOTAL;
use crate::service::{ActionRecorder, SocialGraphService};

const MAX_USERNAME_LEN: usize = 150;

fn normalize_optional_text(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Letters, digits and `@ . + - _`
fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username.chars().count() <= MAX_USERNAME_LEN
        && username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
}

/// Registration form
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewAccount {
    pub username: String,
    #[serde(default)]
    #[validate(length(max = 150))]
    pub first_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    pub password2: String,
}

/// Profile edit form; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ProfileEdit {
    #[validate(length(max = 150))]
    pub first_name: Option<String>,
    #[validate(length(max = 150))]
    pub last_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    #[validate(length(max = 500))]
    pub photo: Option<String>,
}

/// A user as seen from another user's point of view
#[derive(Debug, Clone)]
pub struct UserDetail {
    pub user: User,
    pub profile: Option<Profile>,
    pub followers: i64,
    pub following: i64,
    /// Whether the viewer follows this user
    pub followed_by_viewer: bool,
}

/// Account service
pub struct AccountService {
    db: Arc<Database>,
    actions: Arc<ActionRecorder>,
}

impl AccountService {
    /// Create new account service
    pub fn new(db: Arc<Database>, actions: Arc<ActionRecorder>) -> Self {
        Self { db, actions }
    }

    /// Register a new user
    ///
    /// Creates the user and its profile in one transaction and records
    /// the registration in the activity log.
    ///
    /// # Errors
    /// Returns a validation error for mismatched passwords, a malformed
    /// username or email, or a username/email that is already taken
    pub async fn register(&self, form: NewAccount) -> Result<User, AppError> {
        form.validate()?;

        let username = form.username.trim().to_string();
        if !is_valid_username(&username) {
            return Err(AppError::Validation(
                "username may contain only letters, digits and @/./+/-/_".to_string(),
            ));
        }
        if form.password != form.password2 {
            return Err(AppError::Validation("Passwords don't match.".to_string()));
        }
        let email = form.email.trim().to_string();
        if self.db.username_in_use(&username).await? {
            return Err(AppError::Validation("username already in use".to_string()));
        }
        if self.db.email_in_use(&email, None).await? {
            return Err(AppError::Validation("Email already in use.".to_string()));
        }

        let password = form.password;
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| AppError::Internal(e.into()))??;

        let user = User {
            id: EntityId::new().0,
            username,
            first_name: form.first_name.trim().to_string(),
            last_name: String::new(),
            email,
            password_hash,
            is_active: true,
            date_joined: chrono::Utc::now(),
        };
        let profile = Profile {
            user_id: user.id.clone(),
            date_of_birth: None,
            photo: None,
        };

        // A concurrent registration can still win the unique username index
        self.db
            .insert_user(&user, &profile)
            .await
            .map_err(|error| match error {
                AppError::Database(sqlx::Error::Database(db_error))
                    if db_error.is_unique_violation() =>
                {
                    AppError::Validation("username already in use".to_string())
                }
                other => other,
            })?;

        self.actions
            .record(&user.id, verbs::CREATED_ACCOUNT, None)
            .await?;
        self.refresh_user_gauge().await;

        tracing::info!(user_id = %user.id, username = %user.username, "User registered");
        Ok(user)
    }

    /// Check credentials
    ///
    /// # Errors
    /// `Unauthorized("Invalid login")` for an unknown user or wrong password,
    /// `Forbidden("Disabled account")` for a deactivated user
    pub async fn login(&self, username: &str, password: &str) -> Result<User, AppError> {
        let Some(user) = self.db.get_user_by_username(username.trim()).await? else {
            return Err(AppError::Unauthorized("Invalid login".to_string()));
        };

        let password = password.to_string();
        let hash = user.password_hash.clone();
        let valid = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| AppError::Internal(e.into()))?;
        if !valid {
            tracing::info!(username = %user.username, "Rejected login");
            return Err(AppError::Unauthorized("Invalid login".to_string()));
        }

        if !user.is_active {
            return Err(AppError::Forbidden("Disabled account".to_string()));
        }

        tracing::info!(user_id = %user.id, "User logged in");
        Ok(user)
    }

    /// Get an active user by ID
    pub async fn get_active_user(&self, user_id: &str) -> Result<User, AppError> {
        self.db
            .get_user(user_id)
            .await?
            .filter(|user| user.is_active)
            .ok_or(AppError::NotFound)
    }

    pub async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, AppError> {
        self.db.get_profile(user_id).await
    }

    /// Apply a profile edit
    ///
    /// Blank email or photo values are ignored rather than stored.
    pub async fn edit(&self, user_id: &str, edit: ProfileEdit) -> Result<(User, Profile), AppError> {
        edit.validate()?;

        let update = UserUpdate {
            first_name: edit.first_name.map(|v| v.trim().to_string()),
            last_name: edit.last_name.map(|v| v.trim().to_string()),
            email: edit.email.and_then(normalize_optional_text),
            date_of_birth: edit.date_of_birth,
            photo: edit.photo.and_then(normalize_optional_text),
        };

        if let Some(email) = update.email.as_deref() {
            if self.db.email_in_use(email, Some(user_id)).await? {
                return Err(AppError::Validation("Email already in use.".to_string()));
            }
        }

        if !self.db.update_user(user_id, &update).await? {
            return Err(AppError::NotFound);
        }

        let user = self.get_active_user(user_id).await?;
        let profile = self.db.get_profile(user_id).await?.ok_or(AppError::NotFound)?;

        tracing::info!(user_id, "Profile updated");
        Ok((user, profile))
    }

    /// All active users
    pub async fn list_active(&self) -> Result<Vec<User>, AppError> {
        self.db.list_active_users().await
    }

    /// Active user by username, with follow counts relative to `viewer_id`
    pub async fn detail(&self, viewer_id: &str, username: &str) -> Result<UserDetail, AppError> {
        let user = self
            .db
            .get_user_by_username(username)
            .await?
            .filter(|user| user.is_active)
            .ok_or(AppError::NotFound)?;

        let graph = SocialGraphService::new(self.db.clone());
        let (profile, followers, following, followed_by_viewer) = tokio::try_join!(
            self.db.get_profile(&user.id),
            graph.count_followers(&user.id),
            graph.count_following(&user.id),
            graph.is_following(viewer_id, &user.id),
        )?;

        Ok(UserDetail {
            user,
            profile,
            followers,
            following,
            followed_by_viewer,
        })
    }

    /// Soft delete: the user stays in the database but can no longer log in
    pub async fn deactivate(&self, user_id: &str) -> Result<(), AppError> {
        if !self.db.set_user_active(user_id, false).await? {
            return Err(AppError::NotFound);
        }
        self.refresh_user_gauge().await;

        tracing::info!(user_id, "User deactivated");
        Ok(())
    }

    async fn refresh_user_gauge(&self) {
        match self.db.count_active_users().await {
            Ok(count) => USERS_TOTAL.set(count),
            Err(error) => tracing::warn!(%error, "Failed to refresh user gauge"),
        }
    }
}
