use actix_web::{get, web, HttpRequest, HttpResponse};
use chrono::{Timelike, Utc};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use super::{require_user_id, AppState};
use crate::error::{AppError, Result};
use crate::models::{
    Algorithm, DeviceClass, FeedType, GeoPoint, RankingProfile, RequestContext,
};
use crate::services::SourceRequest;

#[derive(Debug, Deserialize)]
pub struct FeedQueryParams {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Absent means the profile's preferred algorithm, then "ranked"
    pub algorithm: Option<String>,
    #[serde(default)]
    pub refresh: bool,
    pub category: Option<String>,
    pub device: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    20
}

impl FeedQueryParams {
    /// Validate pagination before any pipeline work happens.
    fn validate(&self) -> Result<(u32, u32)> {
        if self.page < 1 {
            return Err(AppError::BadRequest("page must be >= 1".to_string()));
        }
        if self.limit < 1 || self.limit > 100 {
            return Err(AppError::BadRequest(
                "limit must be between 1 and 100".to_string(),
            ));
        }
        Ok((self.page, self.limit))
    }

    /// Explicit algorithm parameter; unknown names are rejected before
    /// any pipeline work.
    fn algorithm(&self) -> Result<Option<Algorithm>> {
        match &self.algorithm {
            Some(name) => Algorithm::parse(name).map(Some).ok_or_else(|| {
                AppError::BadRequest(format!(
                    "Invalid algorithm '{}'. Must be 'ranked' or 'recent'",
                    name
                ))
            }),
            None => Ok(None),
        }
    }

    fn request_context(&self) -> RequestContext {
        let geo = match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some(GeoPoint { lat, lon }),
            _ => None,
        };
        RequestContext {
            hour: Utc::now().hour(),
            device: self
                .device
                .as_deref()
                .map(DeviceClass::parse)
                .unwrap_or(DeviceClass::Unknown),
            geo,
        }
    }
}

#[get("/home")]
pub async fn get_home_feed(
    query: web::Query<FeedQueryParams>,
    http_req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let user_id = require_user_id(&http_req)?;
    serve_feed(&state, &user_id, FeedType::Home, &query).await
}

#[get("/explore")]
pub async fn get_explore_feed(
    query: web::Query<FeedQueryParams>,
    http_req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let user_id = require_user_id(&http_req)?;
    serve_feed(&state, &user_id, FeedType::Explore, &query).await
}

#[get("/reels")]
pub async fn get_reels_feed(
    query: web::Query<FeedQueryParams>,
    http_req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let user_id = require_user_id(&http_req)?;
    serve_feed(&state, &user_id, FeedType::Reels, &query).await
}

/// Cache-first feed serving: validate, resolve the algorithm, consult
/// the cache, and only on a miss drive the aggregation → scoring →
/// diversification → realtime chain.
async fn serve_feed(
    state: &AppState,
    user_id: &str,
    feed_type: FeedType,
    query: &FeedQueryParams,
) -> Result<HttpResponse> {
    let (page, limit) = query.validate()?;
    let explicit_algorithm = query.algorithm()?;

    // Explicit refresh invalidates everything for this user before any
    // page is served. A failed invalidation still regenerates below; it
    // never serves from cache on this path.
    if query.refresh {
        if let Some(cache) = &state.cache {
            if let Err(e) = cache.invalidate_user(user_id).await {
                warn!(user_id, error = %e, "refresh invalidation failed, regenerating anyway");
            }
        }
    }

    let profile = load_profile(state, user_id).await;

    let algorithm = explicit_algorithm
        .or_else(|| {
            profile
                .as_ref()
                .and_then(|p| p.preferred_algorithm.as_deref())
                .and_then(Algorithm::parse)
        })
        .unwrap_or(Algorithm::Ranked);

    if !query.refresh {
        if let Some(cache) = &state.cache {
            if let Some(mut cached) = cache
                .get_page(user_id, algorithm, feed_type, page, limit)
                .await
            {
                cached.metadata.cached = true;
                return Ok(HttpResponse::Ok().json(cached));
            }
        }
    }

    let hidden = match state.store.hidden_content(user_id).await {
        Ok(hidden) => hidden,
        Err(e) => {
            warn!(user_id, error = %e, "hidden set unavailable, proceeding without it");
            HashSet::new()
        }
    };
    let type_history = match state.store.type_view_counts(user_id).await {
        Ok(counts) => counts,
        Err(e) => {
            warn!(user_id, error = %e, "feed history unavailable, proceeding without it");
            HashMap::new()
        }
    };

    // Following list feeds the followed-author relationship baseline;
    // unavailable means no baseline, not a failed request.
    let following: HashSet<String> = match state.content_client.following_list(user_id).await {
        Ok(user_ids) => user_ids.into_iter().collect(),
        Err(e) => {
            warn!(user_id, error = %e, "following list unavailable, proceeding without it");
            HashSet::new()
        }
    };

    let request = SourceRequest::with_category(feed_type, query.category.clone());
    let aggregation = state
        .aggregator
        .collect(user_id, profile.as_ref(), &request)
        .await;

    if aggregation.all_sources_failed() {
        return Err(AppError::ServiceUnavailable(
            "all candidate sources failed".to_string(),
        ));
    }

    let feed = state.pipeline.build_feed(
        aggregation.candidates,
        profile.as_ref(),
        &following,
        &query.request_context(),
        &hidden,
        &type_history,
        Utc::now(),
        algorithm,
        feed_type,
        page,
        limit,
    );

    if let Some(cache) = &state.cache {
        cache
            .set_page(user_id, algorithm, feed_type, page, limit, &feed)
            .await;
    }

    debug!(
        user_id,
        feed_type = feed_type.as_str(),
        algorithm = algorithm.as_str(),
        items = feed.items.len(),
        "feed generated"
    );

    Ok(HttpResponse::Ok().json(feed))
}

/// Missing or unreadable profile degrades to fallback scoring instead
/// of failing the request.
async fn load_profile(state: &AppState, user_id: &str) -> Option<RankingProfile> {
    match state.store.get_profile::<RankingProfile>(user_id).await {
        Ok(profile) => profile,
        Err(e) => {
            warn!(user_id, error = %e, "ranking profile unavailable, falling back");
            None
        }
    }
}
