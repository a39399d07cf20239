pub mod engagement;
pub mod feed;

pub use engagement::{hide_post, post_engagement, put_preferences};
pub use feed::{get_explore_feed, get_home_feed, get_reels_feed};

use crate::cache::FeedCache;
use crate::error::{AppError, Result};
use crate::services::{CandidateAggregator, ContentClient, FeedPipeline, FeedbackHandle};
use actix_web::HttpRequest;
use serde::Serialize;
use signal_store::SignalStore;
use std::sync::Arc;

/// Shared state for all feed handlers.
pub struct AppState {
    pub store: SignalStore,
    /// None when the cache store was unreachable at startup; every
    /// lookup is then a miss and the pipeline runs uncached.
    pub cache: Option<FeedCache>,
    pub content_client: Arc<ContentClient>,
    pub aggregator: CandidateAggregator,
    pub pipeline: FeedPipeline,
    pub feedback: FeedbackHandle,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub success: bool,
    pub message: String,
}

impl StatusResponse {
    pub fn ok(message: &str) -> Self {
        Self {
            success: true,
            message: message.to_string(),
        }
    }
}

/// Caller identity comes from the gateway as a header; identity and
/// auth themselves live outside this service.
pub(crate) fn require_user_id(req: &HttpRequest) -> Result<String> {
    req.headers()
        .get("x-user-id")
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(String::from)
        .ok_or_else(|| AppError::Authentication("Missing X-User-Id header".to_string()))
}
