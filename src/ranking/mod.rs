//! Ranking store
//!
//! View counters and the global popularity ranking live outside the
//! relational database, in a sorted-set key-value store. Updates here are
//! best-effort relative to the primary records: there is no transaction
//! spanning both stores.
//!
//! Backends:
//! - `RedisRankingStore`: `INCR` / `ZINCRBY` / `ZREVRANGE` on Redis
//! - `MemoryRankingStore`: process-local, same semantics

mod memory;
mod redis_store;

use async_trait::async_trait;

use crate::config::{RankingBackend, RankingConfig};
use crate::error::AppError;

pub use self::memory::MemoryRankingStore;
pub use self::redis_store::RedisRankingStore;

/// Key layout shared by every backend
#[derive(Debug, Clone)]
pub struct RankingKeys {
    key_prefix: String,
    ranking_key: String,
}

impl RankingKeys {
    pub fn new(key_prefix: impl Into<String>, ranking_key: impl Into<String>) -> Self {
        Self {
            key_prefix: key_prefix.into(),
            ranking_key: ranking_key.into(),
        }
    }

    /// Per-item view counter key, e.g. `image:01HX...:views`
    pub fn views(&self, item_id: &str) -> String {
        format!("{}:{}:views", self.key_prefix, item_id)
    }

    /// Sorted set of item id -> score
    pub fn ranking(&self) -> &str {
        &self.ranking_key
    }
}

impl Default for RankingKeys {
    fn default() -> Self {
        Self::new("image", "image_ranking")
    }
}

/// Popularity counters and ranking
///
/// Every operation must be atomic at the store level so concurrent
/// interactions on the same item are never lost. An unreachable store
/// surfaces as [`AppError::RankingUnavailable`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RankingStore: Send + Sync {
    /// Increment the item's view counter and return the new count.
    async fn record_view(&self, item_id: &str) -> Result<u64, AppError>;

    /// Current view count; 0 when the item was never viewed.
    async fn view_count(&self, item_id: &str) -> Result<u64, AppError>;

    /// Adjust the item's ranking score by `delta` and return the new score.
    async fn bump_rank(&self, item_id: &str, delta: f64) -> Result<f64, AppError>;

    /// Up to `n` item ids ordered by descending score.
    async fn top_n(&self, n: usize) -> Result<Vec<String>, AppError>;

    /// Drop the item's counter and ranking entry.
    async fn forget(&self, item_id: &str) -> Result<(), AppError>;

    /// Health probe.
    async fn ping(&self) -> Result<(), AppError>;
}

/// Build the configured ranking store backend.
///
/// # Errors
/// Returns error if the Redis URL is missing or the initial connection fails
pub async fn connect(config: &RankingConfig) -> Result<std::sync::Arc<dyn RankingStore>, AppError> {
    let keys = RankingKeys::new(&config.key_prefix, &config.ranking_key);

    match config.backend {
        RankingBackend::Redis => {
            let url = config.redis_url.as_deref().ok_or_else(|| {
                AppError::Config(
                    "ranking.redis_url is required when ranking.backend=redis".to_string(),
                )
            })?;
            let store = RedisRankingStore::connect(url, keys).await?;
            tracing::info!(backend = "redis", "Ranking store connected");
            Ok(std::sync::Arc::new(store))
        }
        RankingBackend::Memory => {
            tracing::info!(backend = "memory", "Ranking store initialized");
            Ok(std::sync::Arc::new(MemoryRankingStore::new(keys)))
        }
    }
}
