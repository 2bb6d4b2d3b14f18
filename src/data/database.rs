//! SQLite database operations
//!
//! All database access goes through this module.
//! Uses SQLx with runtime-checked queries.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, QueryBuilder, Sqlite};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use super::models::*;
use crate::error::AppError;

/// How long a writer waits on a locked database before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database connection pool wrapper.
pub struct Database {
    pool: Pool<Sqlite>,
}

/// Fields changed by a profile edit. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub photo: Option<String>,
}

impl Database {
    // =========================================================================
    // Connection
    // =========================================================================

    /// Connect to SQLite database
    ///
    /// Creates the database file if it doesn't exist.
    /// Runs pending migrations automatically.
    ///
    /// # Arguments
    /// * `path` - Path to SQLite database file
    ///
    /// # Errors
    /// Returns error if connection or migration fails
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        Self::connect_with_pool_size(path, 8).await
    }

    /// Connect with an explicit upper bound on pooled connections.
    pub async fn connect_with_pool_size(
        path: &Path,
        max_connections: u32,
    ) -> Result<Self, AppError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!(path = %path.display(), "Database connected and migrated successfully");

        Ok(Self { pool })
    }

    /// Close every pooled connection. Used on shutdown.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Cheap liveness probe.
    pub async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Insert a user together with its profile in one transaction
    pub async fn insert_user(&self, user: &User, profile: &Profile) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO users (
                id, username, first_name, last_name, email, password_hash, is_active, date_joined
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.is_active)
        .bind(user.date_joined)
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO profiles (user_id, date_of_birth, photo) VALUES (?, ?, ?)")
            .bind(&profile.user_id)
            .bind(profile.date_of_birth)
            .bind(&profile.photo)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Get user by ID (active or not)
    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Get user by username (active or not)
    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Get users by IDs; missing IDs are skipped
    pub async fn get_users_by_ids(&self, ids: &[String]) -> Result<Vec<User>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query_builder = QueryBuilder::<Sqlite>::new("SELECT * FROM users WHERE id IN (");
        {
            let mut separated = query_builder.separated(", ");
            for id in ids {
                separated.push_bind(id);
            }
        }
        query_builder.push(")");

        let users = query_builder
            .build_query_as::<User>()
            .fetch_all(&self.pool)
            .await?;

        Ok(users)
    }

    /// All active users, by username
    pub async fn list_active_users(&self) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE is_active = 1 ORDER BY username ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    /// Count active users.
    pub async fn count_active_users(&self) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn username_in_use(&self, username: &str) -> Result<bool, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ?")
            .bind(username)
            .fetch_one(&self.pool)
            .await?;

        Ok(count > 0)
    }

    /// Check whether an email belongs to some user other than `exclude_user_id`
    pub async fn email_in_use(
        &self,
        email: &str,
        exclude_user_id: Option<&str>,
    ) -> Result<bool, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE email = ? COLLATE NOCASE AND id != COALESCE(?, '')",
        )
        .bind(email)
        .bind(exclude_user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    /// Apply a profile edit to the user and profile rows
    ///
    /// # Returns
    /// `true` if the user exists.
    pub async fn update_user(&self, user_id: &str, update: &UserUpdate) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE users
            SET first_name = COALESCE(?, first_name),
                last_name = COALESCE(?, last_name),
                email = COALESCE(?, email)
            WHERE id = ?
            "#,
        )
        .bind(&update.first_name)
        .bind(&update.last_name)
        .bind(&update.email)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            r#"
            UPDATE profiles
            SET date_of_birth = COALESCE(?, date_of_birth),
                photo = COALESCE(?, photo)
            WHERE user_id = ?
            "#,
        )
        .bind(update.date_of_birth)
        .bind(&update.photo)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Flip the active flag (soft delete / reactivate)
    pub async fn set_user_active(&self, user_id: &str, active: bool) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE users SET is_active = ? WHERE id = ?")
            .bind(active)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, AppError> {
        let profile = sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(profile)
    }

    /// Get profiles for the given users; users without a profile are skipped
    pub async fn get_profiles_by_user_ids(&self, ids: &[String]) -> Result<Vec<Profile>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query_builder =
            QueryBuilder::<Sqlite>::new("SELECT * FROM profiles WHERE user_id IN (");
        {
            let mut separated = query_builder.separated(", ");
            for id in ids {
                separated.push_bind(id);
            }
        }
        query_builder.push(")");

        let profiles = query_builder
            .build_query_as::<Profile>()
            .fetch_all(&self.pool)
            .await?;

        Ok(profiles)
    }

    // =========================================================================
    // Follow relationships
    // =========================================================================

    /// Insert a follow edge unless it already exists.
    ///
    /// Relies on the `(user_from, user_to)` unique constraint, so concurrent
    /// duplicates converge to a single row.
    ///
    /// # Returns
    /// `true` if a new edge was inserted.
    pub async fn insert_contact_if_absent(&self, contact: &Contact) -> Result<bool, AppError> {
        let inserted = sqlx::query(
            "INSERT OR IGNORE INTO contacts (id, user_from, user_to, created) VALUES (?, ?, ?, ?)",
        )
        .bind(&contact.id)
        .bind(&contact.user_from)
        .bind(&contact.user_to)
        .bind(contact.created)
        .execute(&self.pool)
        .await?;

        Ok(inserted.rows_affected() > 0)
    }

    /// Delete a follow edge
    ///
    /// # Returns
    /// `true` if an edge was removed.
    pub async fn delete_contact(&self, user_from: &str, user_to: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM contacts WHERE user_from = ? AND user_to = ?")
            .bind(user_from)
            .bind(user_to)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// IDs of users `user_id` follows, most recent first
    pub async fn get_followee_ids(&self, user_id: &str) -> Result<Vec<String>, AppError> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT user_to FROM contacts WHERE user_from = ? ORDER BY created DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    /// IDs of users following `user_id`, most recent first
    pub async fn get_follower_ids(&self, user_id: &str) -> Result<Vec<String>, AppError> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT user_from FROM contacts WHERE user_to = ? ORDER BY created DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    pub async fn is_following(&self, user_from: &str, user_to: &str) -> Result<bool, AppError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM contacts WHERE user_from = ? AND user_to = ?")
                .bind(user_from)
                .bind(user_to)
                .fetch_one(&self.pool)
                .await?;

        Ok(count > 0)
    }

    pub async fn count_followers(&self, user_id: &str) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM contacts WHERE user_to = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn count_following(&self, user_id: &str) -> Result<i64, AppError> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM contacts WHERE user_from = ?")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    // =========================================================================
    // Activity
    // =========================================================================

    /// Append an action to the activity log
    pub async fn insert_action(&self, action: &Action) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO actions (id, user_id, verb, target_type, target_id, created)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&action.id)
        .bind(&action.user_id)
        .bind(&action.verb)
        .bind(&action.target_type)
        .bind(&action.target_id)
        .bind(action.created)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Whether `user_id` already recorded `verb` on `target` at or after `since`
    pub async fn has_similar_action_since(
        &self,
        user_id: &str,
        verb: &str,
        target: Option<&TargetRef>,
        since: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM actions
            WHERE user_id = ? AND verb = ? AND created >= ?
              AND target_type IS ? AND target_id IS ?
            "#,
        )
        .bind(user_id)
        .bind(verb)
        .bind(since)
        .bind(target.map(TargetRef::kind))
        .bind(target.map(TargetRef::id))
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    /// Most recent actions shown on `viewer_id`'s feed, newest first
    ///
    /// Actions come from the active users the viewer follows. A viewer with
    /// no active followees sees every active user's actions instead. The
    /// viewer's own actions are always left out.
    pub async fn get_feed_actions(
        &self,
        viewer_id: &str,
        limit: usize,
    ) -> Result<Vec<Action>, AppError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let actions = sqlx::query_as::<_, Action>(
            r#"
            SELECT a.* FROM actions a
            JOIN users actor ON actor.id = a.user_id AND actor.is_active = 1
            WHERE a.user_id != ?
              AND (
                NOT EXISTS (
                    SELECT 1 FROM contacts c
                    JOIN users followee ON followee.id = c.user_to AND followee.is_active = 1
                    WHERE c.user_from = ?
                )
                OR a.user_id IN (SELECT user_to FROM contacts WHERE user_from = ?)
              )
            ORDER BY a.created DESC, a.id DESC
            LIMIT ?
            "#,
        )
        .bind(viewer_id)
        .bind(viewer_id)
        .bind(viewer_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(actions)
    }

    // =========================================================================
    // Images
    // =========================================================================

    pub async fn insert_image(&self, image: &Image) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO images (id, user_id, title, slug, url, description, created)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&image.id)
        .bind(&image.user_id)
        .bind(&image.title)
        .bind(&image.slug)
        .bind(&image.url)
        .bind(&image.description)
        .bind(image.created)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_image(&self, id: &str) -> Result<Option<Image>, AppError> {
        let image = sqlx::query_as::<_, Image>("SELECT * FROM images WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(image)
    }

    /// Get images by IDs; missing IDs are skipped, order is unspecified
    pub async fn get_images_by_ids(&self, ids: &[String]) -> Result<Vec<Image>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query_builder = QueryBuilder::<Sqlite>::new("SELECT * FROM images WHERE id IN (");
        {
            let mut separated = query_builder.separated(", ");
            for id in ids {
                separated.push_bind(id);
            }
        }
        query_builder.push(")");

        let images = query_builder
            .build_query_as::<Image>()
            .fetch_all(&self.pool)
            .await?;

        Ok(images)
    }

    pub async fn count_images(&self) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM images")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// One page of images, newest first
    pub async fn get_images_page(&self, offset: u64, limit: u64) -> Result<Vec<Image>, AppError> {
        let images = sqlx::query_as::<_, Image>(
            "SELECT * FROM images ORDER BY created DESC, id DESC LIMIT ? OFFSET ?",
        )
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(images)
    }

    /// Delete an image and its likes
    ///
    /// # Returns
    /// `true` if the image existed.
    pub async fn delete_image(&self, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM images WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Likes
    // =========================================================================

    /// # Returns
    /// `true` if the like is new.
    pub async fn insert_like(&self, image_id: &str, user_id: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO image_likes (image_id, user_id, created) VALUES (?, ?, ?)",
        )
        .bind(image_id)
        .bind(user_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// # Returns
    /// `true` if a like was removed.
    pub async fn delete_like(&self, image_id: &str, user_id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM image_likes WHERE image_id = ? AND user_id = ?")
            .bind(image_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Users who like an image, oldest like first
    pub async fn get_like_user_ids(&self, image_id: &str) -> Result<Vec<String>, AppError> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT user_id FROM image_likes WHERE image_id = ? ORDER BY created ASC",
        )
        .bind(image_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    /// Image IDs among `image_ids` liked by `user_id`
    pub async fn get_liked_image_ids_batch(
        &self,
        user_id: &str,
        image_ids: &[String],
    ) -> Result<HashSet<String>, AppError> {
        if image_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let mut query_builder =
            QueryBuilder::<Sqlite>::new("SELECT image_id FROM image_likes WHERE user_id = ");
        query_builder.push_bind(user_id);
        query_builder.push(" AND image_id IN (");
        {
            let mut separated = query_builder.separated(", ");
            for image_id in image_ids {
                separated.push_bind(image_id);
            }
        }
        query_builder.push(")");

        let ids = query_builder
            .build_query_scalar::<String>()
            .fetch_all(&self.pool)
            .await?;

        Ok(ids.into_iter().collect())
    }
}
