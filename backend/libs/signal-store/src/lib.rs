//! Shared low-latency signal store backed by Redis.
//!
//! Holds the per-user state every feed component reads or writes:
//! - engagement counters (sorted set per user, atomic ZINCRBY)
//! - a bounded recent-interaction log (list, LPUSH + LTRIM)
//! - the serialized ranking profile (string with TTL)
//! - the hidden-content set
//! - per-content-type view counters for recent feed history
//!
//! Key layout:
//! - engagement:{user_id}   → ZSET content_id → signal score
//! - interactions:{user_id} → LIST of serialized events, newest first
//! - profile:{user_id}      → JSON ranking profile
//! - hidden:{user_id}       → SET of content ids
//! - feedhist:{user_id}     → HASH content_type → view count
//! - active:users           → SET of recently active user ids
//!
//! Every key carries an expiration; entries age out rather than being
//! deleted explicitly. All counter updates are native Redis increments,
//! never read-modify-write.

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        StoreError::Redis(err.to_string())
    }
}

/// Expiration policy for the store's key families.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Engagement counter TTL in seconds (7 days)
    pub counter_ttl: i64,
    /// Interaction log TTL in seconds (7 days)
    pub log_ttl: i64,
    /// Max entries kept in the per-user interaction log
    pub log_cap: usize,
    /// Ranking profile TTL in seconds (30 days)
    pub profile_ttl: u64,
    /// Hidden-content set TTL in seconds (30 days)
    pub hidden_ttl: i64,
    /// Feed-history hash TTL in seconds (24 hours)
    pub history_ttl: i64,
    /// Active-user set TTL in seconds (1 hour)
    pub active_ttl: i64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            counter_ttl: 7 * 24 * 3600,
            log_ttl: 7 * 24 * 3600,
            log_cap: 500,
            profile_ttl: 30 * 24 * 3600,
            hidden_ttl: 30 * 24 * 3600,
            history_ttl: 24 * 3600,
            active_ttl: 3600,
        }
    }
}

/// Redis-backed signal store shared by the feed pipeline and the
/// feedback recorder.
#[derive(Clone)]
pub struct SignalStore {
    client: Arc<ConnectionManager>,
    config: StoreConfig,
}

impl SignalStore {
    pub async fn connect(redis_url: &str, config: StoreConfig) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| StoreError::Connection(format!("failed to create Redis client: {}", e)))?;

        let manager = ConnectionManager::new(client).await.map_err(|e| {
            StoreError::Connection(format!("failed to create Redis connection: {}", e))
        })?;

        Ok(Self {
            client: Arc::new(manager),
            config,
        })
    }

    /// Ping Redis to check connection health.
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.conn();
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await?;
        Ok(())
    }

    fn conn(&self) -> ConnectionManager {
        self.client.as_ref().clone()
    }

    fn engagement_key(user_id: &str) -> String {
        format!("engagement:{}", user_id)
    }

    fn interactions_key(user_id: &str) -> String {
        format!("interactions:{}", user_id)
    }

    fn profile_key(user_id: &str) -> String {
        format!("profile:{}", user_id)
    }

    fn hidden_key(user_id: &str) -> String {
        format!("hidden:{}", user_id)
    }

    fn history_key(user_id: &str) -> String {
        format!("feedhist:{}", user_id)
    }

    const ACTIVE_KEY: &'static str = "active:users";

    /// Apply a signed engagement weight to a user's counter for one
    /// content id. Returns the counter value after the increment.
    pub async fn record_engagement(
        &self,
        user_id: &str,
        content_id: &str,
        weight: f64,
    ) -> Result<f64> {
        let key = Self::engagement_key(user_id);
        let mut conn = self.conn();

        let score: f64 = conn.zincr(&key, content_id, weight).await?;
        let _: () = conn.expire(&key, self.config.counter_ttl).await?;

        debug!(user_id, content_id, weight, score, "engagement recorded");
        Ok(score)
    }

    /// Current engagement counter for a user-content pair, if any.
    pub async fn engagement_score(&self, user_id: &str, content_id: &str) -> Result<Option<f64>> {
        let mut conn = self.conn();
        let score: Option<f64> = conn
            .zscore(Self::engagement_key(user_id), content_id)
            .await?;
        Ok(score)
    }

    /// Append an entry to the bounded recent-interaction log, evicting
    /// the oldest entries beyond the configured cap.
    pub async fn push_interaction<T: Serialize>(&self, user_id: &str, entry: &T) -> Result<()> {
        let json =
            serde_json::to_string(entry).map_err(|e| StoreError::InvalidData(e.to_string()))?;
        let key = Self::interactions_key(user_id);
        let mut conn = self.conn();

        let _: () = conn.lpush(&key, &json).await?;
        let _: () = conn
            .ltrim(&key, 0, self.config.log_cap as isize - 1)
            .await?;
        let _: () = conn.expire(&key, self.config.log_ttl).await?;
        Ok(())
    }

    /// Most recent interaction log entries, newest first. Entries that
    /// no longer deserialize are skipped.
    pub async fn recent_interactions<T: DeserializeOwned>(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<T>> {
        let mut conn = self.conn();
        let raw: Vec<String> = conn
            .lrange(Self::interactions_key(user_id), 0, limit as isize - 1)
            .await?;

        let mut entries = Vec::with_capacity(raw.len());
        for json in raw {
            match serde_json::from_str::<T>(&json) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(user_id, error = %e, "skipping undecodable log entry"),
            }
        }
        Ok(entries)
    }

    pub async fn get_profile<T: DeserializeOwned>(&self, user_id: &str) -> Result<Option<T>> {
        let mut conn = self.conn();
        let json: Option<String> = conn.get(Self::profile_key(user_id)).await?;
        match json {
            Some(json) => {
                let profile = serde_json::from_str(&json)
                    .map_err(|e| StoreError::InvalidData(e.to_string()))?;
                Ok(Some(profile))
            }
            None => Ok(None),
        }
    }

    pub async fn set_profile<T: Serialize>(&self, user_id: &str, profile: &T) -> Result<()> {
        let json =
            serde_json::to_string(profile).map_err(|e| StoreError::InvalidData(e.to_string()))?;
        let mut conn = self.conn();
        let _: () = conn
            .set_ex(Self::profile_key(user_id), json, self.config.profile_ttl)
            .await?;
        Ok(())
    }

    pub async fn hide_content(&self, user_id: &str, content_id: &str) -> Result<()> {
        let key = Self::hidden_key(user_id);
        let mut conn = self.conn();
        let _: () = conn.sadd(&key, content_id).await?;
        let _: () = conn.expire(&key, self.config.hidden_ttl).await?;
        Ok(())
    }

    pub async fn hidden_content(&self, user_id: &str) -> Result<HashSet<String>> {
        let mut conn = self.conn();
        let members: HashSet<String> = conn.smembers(Self::hidden_key(user_id)).await?;
        Ok(members)
    }

    /// Bump the recent-feed-history counter for one content type.
    pub async fn incr_type_view(&self, user_id: &str, content_type: &str) -> Result<()> {
        let key = Self::history_key(user_id);
        let mut conn = self.conn();
        let _: () = conn.hincr(&key, content_type, 1i64).await?;
        let _: () = conn.expire(&key, self.config.history_ttl).await?;
        Ok(())
    }

    /// Per-content-type view counts from the user's recent feed history.
    pub async fn type_view_counts(&self, user_id: &str) -> Result<HashMap<String, u64>> {
        let mut conn = self.conn();
        let counts: HashMap<String, u64> = conn.hgetall(Self::history_key(user_id)).await?;
        Ok(counts)
    }

    /// Mark a user as recently active so periodic jobs can find them.
    pub async fn mark_active(&self, user_id: &str) -> Result<()> {
        let mut conn = self.conn();
        let _: () = conn.sadd(Self::ACTIVE_KEY, user_id).await?;
        let _: () = conn.expire(Self::ACTIVE_KEY, self.config.active_ttl).await?;
        Ok(())
    }

    pub async fn active_users(&self) -> Result<Vec<String>> {
        let mut conn = self.conn();
        let users: Vec<String> = conn.smembers(Self::ACTIVE_KEY).await?;
        Ok(users)
    }
}
