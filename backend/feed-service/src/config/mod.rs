use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub redis: RedisConfig,
    pub sources: SourcesConfig,
    pub ranking: RankingConfig,
    pub cache: CacheTtlConfig,
    pub feedback: FeedbackConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub env: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

/// Content-collaborator endpoints. Every call is independently
/// time-boxed; a slow origin never stalls the whole aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    pub base_url: String,
    #[serde(default = "default_source_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_sponsored_limit")]
    pub sponsored_limit: u32,
    #[serde(default = "default_suggested_limit")]
    pub suggested_limit: u32,
}

/// Composite-score weights. Operator-tunable; never hardcoded at the
/// call sites.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub relevance: f64,
    pub recency: f64,
    pub engagement: f64,
    pub relationship: f64,
    pub diversity: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            relevance: 0.35,
            recency: 0.25,
            engagement: 0.20,
            relationship: 0.15,
            diversity: 0.05,
        }
    }
}

/// Additive boosts applied by the real-time adapter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RealtimeBoosts {
    pub optimal_hour: f64,
    pub short_form_mobile: f64,
    pub nearby: f64,
    pub nearby_radius_km: f64,
}

impl Default for RealtimeBoosts {
    fn default() -> Self {
        Self {
            optimal_hour: 0.10,
            short_form_mobile: 0.15,
            nearby: 0.20,
            nearby_radius_km: 50.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    #[serde(default)]
    pub weights: ScoringWeights,
    #[serde(default = "default_half_life_hours")]
    pub recency_half_life_hours: f64,
    #[serde(default = "default_pool_budget")]
    pub pool_budget: usize,
    #[serde(default = "default_max_per_type")]
    pub max_per_type: usize,
    #[serde(default = "default_max_per_author")]
    pub max_per_author: usize,
    /// Sponsored items occupy every n-th slot
    #[serde(default = "default_sponsored_interval")]
    pub sponsored_interval: usize,
    /// 1-based slot of the suggested-accounts group
    #[serde(default = "default_suggested_slot")]
    pub suggested_slot: usize,
    #[serde(default)]
    pub boosts: RealtimeBoosts,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            recency_half_life_hours: default_half_life_hours(),
            pool_budget: default_pool_budget(),
            max_per_type: default_max_per_type(),
            max_per_author: default_max_per_author(),
            sponsored_interval: default_sponsored_interval(),
            suggested_slot: default_suggested_slot(),
            boosts: RealtimeBoosts::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheTtlConfig {
    #[serde(default = "default_home_ttl")]
    pub home_ttl: u64,
    #[serde(default = "default_explore_ttl")]
    pub explore_ttl: u64,
    #[serde(default = "default_reels_ttl")]
    pub reels_ttl: u64,
}

impl Default for CacheTtlConfig {
    fn default() -> Self {
        Self {
            home_ttl: default_home_ttl(),
            explore_ttl: default_explore_ttl(),
            reels_ttl: default_reels_ttl(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackConfig {
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    #[serde(default = "default_affinity_interval_secs")]
    pub affinity_interval_secs: u64,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            affinity_interval_secs: default_affinity_interval_secs(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Config {
            app: AppConfig {
                env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
                port: std::env::var("APP_PORT")
                    .unwrap_or_else(|_| "8000".to_string())
                    .parse()?,
                log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            },
            redis: RedisConfig {
                url: std::env::var("REDIS_URL")
                    .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            },
            sources: SourcesConfig {
                base_url: std::env::var("CONTENT_BASE_URL")
                    .unwrap_or_else(|_| "http://127.0.0.1:8300".to_string()),
                timeout_ms: env_parse("SOURCE_TIMEOUT_MS", default_source_timeout_ms()),
                sponsored_limit: env_parse("SPONSORED_LIMIT", default_sponsored_limit()),
                suggested_limit: env_parse("SUGGESTED_LIMIT", default_suggested_limit()),
            },
            ranking: RankingConfig {
                weights: ScoringWeights {
                    relevance: env_parse("FEED_WEIGHT_RELEVANCE", 0.35),
                    recency: env_parse("FEED_WEIGHT_RECENCY", 0.25),
                    engagement: env_parse("FEED_WEIGHT_ENGAGEMENT", 0.20),
                    relationship: env_parse("FEED_WEIGHT_RELATIONSHIP", 0.15),
                    diversity: env_parse("FEED_WEIGHT_DIVERSITY", 0.05),
                },
                recency_half_life_hours: env_parse(
                    "FEED_RECENCY_HALF_LIFE_HOURS",
                    default_half_life_hours(),
                ),
                pool_budget: env_parse("FEED_POOL_BUDGET", default_pool_budget()),
                max_per_type: env_parse("FEED_MAX_PER_TYPE", default_max_per_type()),
                max_per_author: env_parse("FEED_MAX_PER_AUTHOR", default_max_per_author()),
                sponsored_interval: env_parse(
                    "FEED_SPONSORED_INTERVAL",
                    default_sponsored_interval(),
                ),
                suggested_slot: env_parse("FEED_SUGGESTED_SLOT", default_suggested_slot()),
                boosts: RealtimeBoosts {
                    optimal_hour: env_parse("FEED_BOOST_OPTIMAL_HOUR", 0.10),
                    short_form_mobile: env_parse("FEED_BOOST_SHORT_FORM_MOBILE", 0.15),
                    nearby: env_parse("FEED_BOOST_NEARBY", 0.20),
                    nearby_radius_km: env_parse("FEED_BOOST_NEARBY_RADIUS_KM", 50.0),
                },
            },
            cache: CacheTtlConfig {
                home_ttl: env_parse("FEED_CACHE_HOME_TTL", default_home_ttl()),
                explore_ttl: env_parse("FEED_CACHE_EXPLORE_TTL", default_explore_ttl()),
                reels_ttl: env_parse("FEED_CACHE_REELS_TTL", default_reels_ttl()),
            },
            feedback: FeedbackConfig {
                channel_capacity: env_parse("FEEDBACK_CHANNEL_CAPACITY", default_channel_capacity()),
                affinity_interval_secs: env_parse(
                    "AFFINITY_REFRESH_INTERVAL_SECS",
                    default_affinity_interval_secs(),
                ),
            },
        })
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn default_source_timeout_ms() -> u64 {
    2000
}

fn default_sponsored_limit() -> u32 {
    5
}

fn default_suggested_limit() -> u32 {
    5
}

fn default_half_life_hours() -> f64 {
    24.0
}

fn default_pool_budget() -> usize {
    50
}

fn default_max_per_type() -> usize {
    3
}

fn default_max_per_author() -> usize {
    2
}

fn default_sponsored_interval() -> usize {
    5
}

fn default_suggested_slot() -> usize {
    3
}

fn default_home_ttl() -> u64 {
    300
}

fn default_explore_ttl() -> u64 {
    600
}

fn default_reels_ttl() -> u64 {
    300
}

fn default_channel_capacity() -> usize {
    1024
}

fn default_affinity_interval_secs() -> u64 {
    300
}
