//! Redis-backed ranking store

use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use super::{RankingKeys, RankingStore};
use crate::error::AppError;
use crate::metrics::observe_ranking_operation;

/// Upper bound for a single Redis round trip
const COMMAND_TIMEOUT: Duration = Duration::from_secs(2);

/// Ranking store on a Redis server
///
/// The connection manager reconnects transparently; each call clones it,
/// which only clones a handle to the shared multiplexed connection.
#[derive(Clone)]
pub struct RedisRankingStore {
    redis: ConnectionManager,
    keys: RankingKeys,
}

impl RedisRankingStore {
    /// Connect to Redis and verify the connection with a PING.
    pub async fn connect(redis_url: &str, keys: RankingKeys) -> Result<Self, AppError> {
        let client = Client::open(redis_url)?;
        let redis = tokio::time::timeout(COMMAND_TIMEOUT, ConnectionManager::new(client))
            .await
            .map_err(|_| {
                AppError::RankingUnavailable("timed out connecting to Redis".to_string())
            })??;

        let store = Self { redis, keys };
        store.ping().await?;
        Ok(store)
    }

    async fn run<T, F>(&self, operation: &'static str, command: F) -> Result<T, AppError>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        let started = Instant::now();
        let result = match tokio::time::timeout(COMMAND_TIMEOUT, command).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(error)) => Err(AppError::from(error)),
            Err(_) => Err(AppError::RankingUnavailable(format!(
                "{operation} timed out after {}ms",
                COMMAND_TIMEOUT.as_millis()
            ))),
        };

        observe_ranking_operation(operation, result.is_ok(), started.elapsed());
        if let Err(error) = &result {
            tracing::warn!(operation, %error, "Ranking store call failed");
        }
        result
    }
}

#[async_trait]
impl RankingStore for RedisRankingStore {
    async fn record_view(&self, item_id: &str) -> Result<u64, AppError> {
        let key = self.keys.views(item_id);
        let mut conn = self.redis.clone();
        let count: i64 = self
            .run("record_view", async move { conn.incr(&key, 1_i64).await })
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn view_count(&self, item_id: &str) -> Result<u64, AppError> {
        let key = self.keys.views(item_id);
        let mut conn = self.redis.clone();
        let count: Option<i64> = self
            .run("view_count", async move { conn.get(&key).await })
            .await?;
        Ok(count.unwrap_or(0).max(0) as u64)
    }

    async fn bump_rank(&self, item_id: &str, delta: f64) -> Result<f64, AppError> {
        let key = self.keys.ranking().to_string();
        let member = item_id.to_string();
        let mut conn = self.redis.clone();
        self.run("bump_rank", async move { conn.zincr(&key, &member, delta).await })
            .await
    }

    async fn top_n(&self, n: usize) -> Result<Vec<String>, AppError> {
        // ZREVRANGE 0 -1 would return the whole set
        if n == 0 {
            return Ok(Vec::new());
        }

        let key = self.keys.ranking().to_string();
        let stop = isize::try_from(n - 1).unwrap_or(isize::MAX);
        let mut conn = self.redis.clone();
        self.run("top_n", async move { conn.zrevrange(&key, 0, stop).await })
            .await
    }

    async fn forget(&self, item_id: &str) -> Result<(), AppError> {
        let views_key = self.keys.views(item_id);
        let ranking_key = self.keys.ranking().to_string();
        let member = item_id.to_string();
        let mut conn = self.redis.clone();
        self.run("forget", async move {
            let mut pipe = redis::pipe();
            pipe.atomic()
                .del(&views_key)
                .ignore()
                .zrem(&ranking_key, &member)
                .ignore();
            pipe.query_async::<_, ()>(&mut conn).await
        })
        .await
    }

    async fn ping(&self) -> Result<(), AppError> {
        let mut conn = self.redis.clone();
        let _: String = self
            .run("ping", async move {
                let ping = redis::cmd("PING");
                ping.query_async::<_, String>(&mut conn).await
            })
            .await?;
        Ok(())
    }
}
