//! Social graph service
//!
//! Directed follow edges between users. Edges are unique per pair, so
//! repeated or concurrent follows converge to a single edge.

use std::collections::HashSet;
use std::sync::Arc;

use crate::data::{Contact, Database, EntityId};
use crate::error::AppError;
use crate::metrics::{DB_QUERIES_TOTAL, DB_QUERY_DURATION_SECONDS, FOLLOW_EVENTS_TOTAL};

/// Social graph service
pub struct SocialGraphService {
    db: Arc<Database>,
}

impl SocialGraphService {
    /// Create new social graph service
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Make `user_from` follow `user_to`
    ///
    /// # Returns
    /// `true` if a new edge was created, `false` if it already existed
    ///
    /// # Errors
    /// Returns a validation error for a self-follow
    pub async fn follow(&self, user_from: &str, user_to: &str) -> Result<bool, AppError> {
        if user_from == user_to {
            return Err(AppError::Validation("users cannot follow themselves".to_string()));
        }

        let contact = Contact {
            id: EntityId::new().0,
            user_from: user_from.to_string(),
            user_to: user_to.to_string(),
            created: chrono::Utc::now(),
        };

        let timer = DB_QUERY_DURATION_SECONDS
            .with_label_values(&["INSERT", "contacts"])
            .start_timer();
        let created = self.db.insert_contact_if_absent(&contact).await?;
        timer.observe_duration();
        DB_QUERIES_TOTAL
            .with_label_values(&["INSERT", "contacts"])
            .inc();

        if created {
            FOLLOW_EVENTS_TOTAL.with_label_values(&["follow"]).inc();
            tracing::info!(user_from, user_to, "Follow edge created");
        } else {
            tracing::debug!(user_from, user_to, "Follow edge already present");
        }

        Ok(created)
    }

    /// Remove the edge `user_from -> user_to` if present
    ///
    /// # Returns
    /// `true` if an edge was removed
    pub async fn unfollow(&self, user_from: &str, user_to: &str) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION_SECONDS
            .with_label_values(&["DELETE", "contacts"])
            .start_timer();
        let removed = self.db.delete_contact(user_from, user_to).await?;
        timer.observe_duration();
        DB_QUERIES_TOTAL
            .with_label_values(&["DELETE", "contacts"])
            .inc();

        if removed {
            FOLLOW_EVENTS_TOTAL.with_label_values(&["unfollow"]).inc();
            tracing::info!(user_from, user_to, "Follow edge removed");
        }

        Ok(removed)
    }

    /// IDs of the users `user_id` follows
    pub async fn followees_of(&self, user_id: &str) -> Result<HashSet<String>, AppError> {
        Ok(self
            .db
            .get_followee_ids(user_id)
            .await?
            .into_iter()
            .collect())
    }

    /// IDs of the users following `user_id`
    pub async fn followers_of(&self, user_id: &str) -> Result<HashSet<String>, AppError> {
        Ok(self
            .db
            .get_follower_ids(user_id)
            .await?
            .into_iter()
            .collect())
    }

    pub async fn is_following(&self, user_from: &str, user_to: &str) -> Result<bool, AppError> {
        self.db.is_following(user_from, user_to).await
    }

    pub async fn count_followers(&self, user_id: &str) -> Result<i64, AppError> {
        self.db.count_followers(user_id).await
    }

    pub async fn count_following(&self, user_id: &str) -> Result<i64, AppError> {
        self.db.count_following(user_id).await
    }
}
