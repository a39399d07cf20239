//! Redis-backed cache for generated feed pages.
//!
//! Pages are cached per (user, algorithm, feed type, page, limit) with a
//! short TTL per feed type. Explicit user actions (preference update,
//! manual refresh, hide) invalidate every entry keyed to that user
//! before the action reports success.
//!
//! Cache keys follow the pattern:
//! - feed:{user_id}:{algorithm}:{feed_type}:{page}:{limit} → serialized FeedPage

use crate::config::CacheTtlConfig;
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{Algorithm, FeedPage, FeedType};
use redis::aio::ConnectionManager;
use std::sync::Arc;
use tracing::{debug, warn};

/// Cache configuration: TTL per feed type, in seconds.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub home_ttl: u64,
    pub explore_ttl: u64,
    pub reels_ttl: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            home_ttl: 300,    // 5 minutes
            explore_ttl: 600, // 10 minutes
            reels_ttl: 300,   // 5 minutes
        }
    }
}

impl From<&CacheTtlConfig> for CacheConfig {
    fn from(cfg: &CacheTtlConfig) -> Self {
        Self {
            home_ttl: cfg.home_ttl,
            explore_ttl: cfg.explore_ttl,
            reels_ttl: cfg.reels_ttl,
        }
    }
}

/// Feed page cache layer using Redis.
#[derive(Clone)]
pub struct FeedCache {
    client: Arc<ConnectionManager>,
    config: CacheConfig,
}

impl FeedCache {
    pub async fn new(redis_url: &str, config: CacheConfig) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| AppError::Internal(format!("Failed to create Redis client: {}", e)))?;

        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create Redis connection: {}", e)))?;

        Ok(Self {
            client: Arc::new(manager),
            config,
        })
    }

    fn key(user_id: &str, algorithm: Algorithm, feed_type: FeedType, page: u32, limit: u32) -> String {
        format!(
            "feed:{}:{}:{}:{}:{}",
            user_id,
            algorithm.as_str(),
            feed_type.as_str(),
            page,
            limit
        )
    }

    fn ttl_for(&self, feed_type: FeedType) -> u64 {
        match feed_type {
            FeedType::Home => self.config.home_ttl,
            FeedType::Explore => self.config.explore_ttl,
            FeedType::Reels => self.config.reels_ttl,
        }
    }

    /// Look up a cached page. A store error counts as a miss, never as a
    /// request failure.
    pub async fn get_page(
        &self,
        user_id: &str,
        algorithm: Algorithm,
        feed_type: FeedType,
        page: u32,
        limit: u32,
    ) -> Option<FeedPage> {
        let key = Self::key(user_id, algorithm, feed_type, page, limit);

        let value: Option<String> = match redis::cmd("GET")
            .arg(&key)
            .query_async(&mut self.client.as_ref().clone())
            .await
        {
            Ok(value) => value,
            Err(e) => {
                warn!("Redis GET failed for {}: {}", key, e);
                metrics::record_cache_miss();
                return None;
            }
        };

        match value {
            Some(json) => match serde_json::from_str::<FeedPage>(&json) {
                Ok(cached) => {
                    debug!("Cache hit for {}", key);
                    metrics::record_cache_hit();
                    Some(cached)
                }
                Err(e) => {
                    warn!("Cache deserialization failed for {}: {}", key, e);
                    metrics::record_cache_miss();
                    None
                }
            },
            None => {
                debug!("Cache miss for {}", key);
                metrics::record_cache_miss();
                None
            }
        }
    }

    /// Store a generated page with the feed type's TTL. Failures degrade
    /// to uncached operation.
    pub async fn set_page(
        &self,
        user_id: &str,
        algorithm: Algorithm,
        feed_type: FeedType,
        page: u32,
        limit: u32,
        feed: &FeedPage,
    ) {
        let key = Self::key(user_id, algorithm, feed_type, page, limit);
        let ttl = self.ttl_for(feed_type);

        let json = match serde_json::to_string(feed) {
            Ok(json) => json,
            Err(e) => {
                warn!("Cache serialization failed for {}: {}", key, e);
                return;
            }
        };

        if let Err(e) = redis::cmd("SETEX")
            .arg(&key)
            .arg(ttl)
            .arg(&json)
            .query_async::<_, ()>(&mut self.client.as_ref().clone())
            .await
        {
            warn!("Redis SETEX failed for {}: {}", key, e);
            return;
        }

        debug!("Cached {} with TTL={}s", key, ttl);
    }

    /// Invalidate every cached page for a user, across algorithms, feed
    /// types and pagination. Uses SCAN instead of KEYS to avoid blocking
    /// Redis.
    pub async fn invalidate_user(&self, user_id: &str) -> Result<usize> {
        let pattern = format!("feed:{}:*", user_id);
        let mut cursor: u64 = 0;
        let mut total_deleted = 0;

        loop {
            let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut self.client.as_ref().clone())
                .await
                .map_err(|e| {
                    warn!("Redis SCAN failed for {}: {}", pattern, e);
                    AppError::Internal(format!("Redis error: {}", e))
                })?;

            if !keys.is_empty() {
                redis::cmd("DEL")
                    .arg(&keys)
                    .query_async::<_, ()>(&mut self.client.as_ref().clone())
                    .await
                    .map_err(|e| {
                        warn!("Redis DEL failed: {}", e);
                        AppError::Internal(format!("Redis error: {}", e))
                    })?;
                total_deleted += keys.len();
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        if total_deleted > 0 {
            debug!("Invalidated {} feed caches for user {}", total_deleted, user_id);
        }

        Ok(total_deleted)
    }
}
