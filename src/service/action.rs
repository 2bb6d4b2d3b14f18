//! Activity recorder
//!
//! Appends entries to the activity log, collapsing repeats of the same
//! action performed within a short window.

use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::data::{Action, Database, EntityId, TargetRef};
use crate::error::AppError;
use crate::metrics::ACTIONS_RECORDED_TOTAL;

/// Activity recorder
pub struct ActionRecorder {
    db: Arc<Database>,
    dedupe_window: Duration,
}

impl ActionRecorder {
    /// Create a recorder that ignores identical actions repeated within
    /// `dedupe_seconds`; 0 records every action
    pub fn new(db: Arc<Database>, dedupe_seconds: i64) -> Self {
        Self {
            db,
            dedupe_window: Duration::seconds(dedupe_seconds.max(0)),
        }
    }

    /// Record `user_id` performing `verb` on an optional target
    ///
    /// # Returns
    /// `true` if an entry was appended, `false` if it was deduplicated
    pub async fn record(
        &self,
        user_id: &str,
        verb: &str,
        target: Option<&TargetRef>,
    ) -> Result<bool, AppError> {
        let now = Utc::now();

        if self.dedupe_window > Duration::zero()
            && self
                .db
                .has_similar_action_since(user_id, verb, target, now - self.dedupe_window)
                .await?
        {
            tracing::debug!(user_id, verb, "Similar action recorded recently, skipping");
            return Ok(false);
        }

        let action = Action {
            id: EntityId::new().0,
            user_id: user_id.to_string(),
            verb: verb.to_string(),
            target_type: target.map(|t| t.kind().to_string()),
            target_id: target.map(|t| t.id().to_string()),
            created: now,
        };
        self.db.insert_action(&action).await?;

        ACTIONS_RECORDED_TOTAL.with_label_values(&[verb]).inc();
        tracing::debug!(user_id, verb, target = ?target, "Action recorded");

        Ok(true)
    }
}
