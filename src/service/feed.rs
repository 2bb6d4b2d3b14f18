//! Activity feed service
//!
//! Builds a user's dashboard from the activity of the people they follow.
//! A user who follows no active account sees everyone's activity instead.
//! Deactivated users never appear as actors or user targets.

use std::collections::HashMap;
use std::sync::Arc;

use crate::data::{Action, Database, Image, TargetRef, User};
use crate::error::AppError;
use crate::metrics::{DB_QUERIES_TOTAL, DB_QUERY_DURATION_SECONDS};

/// Public summary of a user shown next to feed entries
#[derive(Debug, Clone)]
pub struct ActorSummary {
    pub id: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub photo: Option<String>,
}

/// Resolved target of an action
#[derive(Debug, Clone)]
pub enum FeedTarget {
    User(ActorSummary),
    Image(Image),
}

/// One action with its actor and target resolved
#[derive(Debug, Clone)]
pub struct FeedEntry {
    pub action: Action,
    pub actor: Option<ActorSummary>,
    /// `None` when the action has no target, or the target is gone or
    /// deactivated
    pub target: Option<FeedTarget>,
}

/// Activity feed service
pub struct FeedService {
    db: Arc<Database>,
}

impl FeedService {
    /// Create new feed service
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Most recent actions visible to `user_id`, newest first
    ///
    /// Never includes the user's own actions or those of deactivated users.
    /// Restricted to active followees, or global when there are none.
    pub async fn feed_for(&self, user_id: &str, limit: usize) -> Result<Vec<Action>, AppError> {
        let timer = DB_QUERY_DURATION_SECONDS
            .with_label_values(&["SELECT", "actions"])
            .start_timer();
        let actions = self.db.get_feed_actions(user_id, limit).await?;
        timer.observe_duration();
        DB_QUERIES_TOTAL
            .with_label_values(&["SELECT", "actions"])
            .inc();

        tracing::debug!(user_id, entries = actions.len(), "Feed built");

        Ok(actions)
    }

    /// Feed with actors and targets resolved in batched lookups
    pub async fn dashboard(&self, user_id: &str, limit: usize) -> Result<Vec<FeedEntry>, AppError> {
        let actions = self.feed_for(user_id, limit).await?;
        if actions.is_empty() {
            return Ok(Vec::new());
        }

        let mut user_ids: Vec<String> = Vec::new();
        let mut image_ids: Vec<String> = Vec::new();
        for action in &actions {
            user_ids.push(action.user_id.clone());
            match action.target() {
                Some(TargetRef::User(id)) => user_ids.push(id),
                Some(TargetRef::Image(id)) => image_ids.push(id),
                None => {}
            }
        }
        user_ids.sort_unstable();
        user_ids.dedup();
        image_ids.sort_unstable();
        image_ids.dedup();

        let summaries = self.load_summaries(&user_ids).await?;
        let images: HashMap<String, Image> = self
            .db
            .get_images_by_ids(&image_ids)
            .await?
            .into_iter()
            .map(|image| (image.id.clone(), image))
            .collect();

        let entries = actions
            .into_iter()
            .map(|action| {
                let target = match action.target() {
                    Some(TargetRef::User(id)) => summaries.get(&id).cloned().map(FeedTarget::User),
                    Some(TargetRef::Image(id)) => images.get(&id).cloned().map(FeedTarget::Image),
                    None => None,
                };
                FeedEntry {
                    actor: summaries.get(&action.user_id).cloned(),
                    target,
                    action,
                }
            })
            .collect();

        Ok(entries)
    }

    async fn load_summaries(
        &self,
        user_ids: &[String],
    ) -> Result<HashMap<String, ActorSummary>, AppError> {
        let users = self.db.get_users_by_ids(user_ids).await?;
        let mut photos: HashMap<String, Option<String>> = self
            .db
            .get_profiles_by_user_ids(user_ids)
            .await?
            .into_iter()
            .map(|profile| (profile.user_id, profile.photo))
            .collect();

        Ok(users
            .into_iter()
            .filter(|user| user.is_active)
            .map(|user: User| {
                let photo = photos.remove(&user.id).flatten();
                let summary = ActorSummary {
                    id: user.id.clone(),
                    username: user.username,
                    first_name: user.first_name,
                    last_name: user.last_name,
                    photo,
                };
                (user.id, summary)
            })
            .collect())
    }
}
