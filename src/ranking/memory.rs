//! In-process ranking store
//!
//! Mirrors the Redis semantics (including tie ordering) so development
//! setups and tests behave like production.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{RankingKeys, RankingStore};
use crate::error::AppError;
use crate::metrics::observe_ranking_operation;

#[derive(Default)]
struct State {
    /// Counter key -> count
    counters: HashMap<String, u64>,
    /// Item id -> score
    scores: HashMap<String, f64>,
}

/// Ranking store held in process memory
pub struct MemoryRankingStore {
    keys: RankingKeys,
    state: Mutex<State>,
}

impl MemoryRankingStore {
    pub fn new(keys: RankingKeys) -> Self {
        Self {
            keys,
            state: Mutex::new(State::default()),
        }
    }
}

impl Default for MemoryRankingStore {
    fn default() -> Self {
        Self::new(RankingKeys::default())
    }
}

/// Descending score, then descending member (ZREVRANGE order)
fn rank_order(a: &(&String, &f64), b: &(&String, &f64)) -> Ordering {
    b.1.partial_cmp(a.1)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.0.cmp(a.0))
}

#[async_trait]
impl RankingStore for MemoryRankingStore {
    async fn record_view(&self, item_id: &str) -> Result<u64, AppError> {
        let started = Instant::now();
        let mut state = self.state.lock().await;
        let counter = state.counters.entry(self.keys.views(item_id)).or_insert(0);
        *counter += 1;
        let count = *counter;
        drop(state);

        observe_ranking_operation("record_view", true, started.elapsed());
        Ok(count)
    }

    async fn view_count(&self, item_id: &str) -> Result<u64, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .counters
            .get(&self.keys.views(item_id))
            .copied()
            .unwrap_or(0))
    }

    async fn bump_rank(&self, item_id: &str, delta: f64) -> Result<f64, AppError> {
        let started = Instant::now();
        let mut state = self.state.lock().await;
        let score = state.scores.entry(item_id.to_string()).or_insert(0.0);
        *score += delta;
        let score = *score;
        drop(state);

        observe_ranking_operation("bump_rank", true, started.elapsed());
        Ok(score)
    }

    async fn top_n(&self, n: usize) -> Result<Vec<String>, AppError> {
        let state = self.state.lock().await;
        let mut entries: Vec<(&String, &f64)> = state.scores.iter().collect();
        entries.sort_by(rank_order);

        Ok(entries
            .into_iter()
            .take(n)
            .map(|(item_id, _)| item_id.clone())
            .collect())
    }

    async fn forget(&self, item_id: &str) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        state.counters.remove(&self.keys.views(item_id));
        state.scores.remove(item_id);
        Ok(())
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}
