use actix_web::{post, put, web, HttpRequest, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::{require_user_id, AppState, StatusResponse};
use crate::error::{AppError, Result};
use crate::models::{
    Algorithm, ContentType, EngagementAction, EngagementContext, EngagementEvent, RankingProfile,
};
use crate::services::FeedbackRecorder;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementRequest {
    pub user_id: String,
    pub content_id: String,
    pub action: String,
    #[serde(default)]
    pub metadata: Option<EngagementMetadata>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementMetadata {
    #[serde(default)]
    pub duration_ms: Option<u32>,
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub content_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesRequest {
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub preferred_content_types: Vec<String>,
    #[serde(default)]
    pub feed_algorithm: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HideRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

/// Accept an engagement event for asynchronous processing. Malformed
/// events are logged and dropped, never bounced back to the producer —
/// losing an event beats blocking a user interaction.
#[post("/engagement")]
pub async fn post_engagement(
    body: web::Json<EngagementRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let request = body.into_inner();

    let Some(action) = EngagementAction::parse(&request.action) else {
        warn!(action = %request.action, "dropping engagement event with unknown action");
        return Ok(HttpResponse::Accepted().finish());
    };

    let (duration_ms, context) = match request.metadata {
        Some(metadata) => (
            metadata.duration_ms,
            Some(EngagementContext {
                author_id: metadata.author_id,
                topics: metadata.topics,
                content_type: metadata.content_type.as_deref().and_then(ContentType::parse),
            }),
        ),
        None => (None, None),
    };

    let event = EngagementEvent {
        event_id: Uuid::new_v4().to_string(),
        user_id: request.user_id,
        content_id: request.content_id,
        action,
        occurred_at: Utc::now(),
        duration_ms,
        context,
    };

    state.feedback.ingest(event);
    Ok(HttpResponse::Accepted().finish())
}

/// Update feed preferences. The user's cached pages are invalidated
/// before this returns success, so no page generated under the old
/// preferences outlives the update.
#[put("/preferences")]
pub async fn put_preferences(
    http_req: HttpRequest,
    body: web::Json<PreferencesRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let user_id = require_user_id(&http_req)?;
    let request = body.into_inner();

    if let Some(algorithm) = &request.feed_algorithm {
        if Algorithm::parse(algorithm).is_none() {
            return Err(AppError::BadRequest(format!(
                "Invalid feedAlgorithm '{}'. Must be 'ranked' or 'recent'",
                algorithm
            )));
        }
    }

    let mut profile = state
        .store
        .get_profile::<RankingProfile>(&user_id)
        .await?
        .unwrap_or_else(|| RankingProfile::new(&user_id));

    for interest in &request.interests {
        profile.topic_interests.insert(interest.clone(), 1.0);
    }
    for type_name in &request.preferred_content_types {
        match ContentType::parse(type_name) {
            Some(content_type) => {
                profile
                    .content_type_weights
                    .insert(content_type.as_str().to_string(), 1.0);
            }
            None => warn!(content_type = %type_name, "ignoring unknown content type"),
        }
    }
    if request.feed_algorithm.is_some() {
        profile.preferred_algorithm = request.feed_algorithm.clone();
    }
    profile.updated_at = Utc::now();

    state.store.set_profile(&user_id, &profile).await?;

    if let Some(cache) = &state.cache {
        cache.invalidate_user(&user_id).await?;
    }

    info!(user_id = %user_id, "preferences updated, caches invalidated");
    Ok(HttpResponse::Ok().json(StatusResponse::ok("Preferences updated")))
}

/// Hide a post: record the negative signal and drop the content from
/// every future page. The hidden-set write and cache invalidation are
/// synchronous so a refresh issued right after this call can never
/// resurface the post.
#[post("/hide/{post_id}")]
pub async fn hide_post(
    http_req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<HideRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let user_id = require_user_id(&http_req)?;
    let post_id = path.into_inner();
    if post_id.is_empty() {
        return Err(AppError::BadRequest("post id must not be empty".to_string()));
    }

    let event = EngagementEvent {
        event_id: Uuid::new_v4().to_string(),
        user_id: user_id.clone(),
        content_id: post_id.clone(),
        action: EngagementAction::Hide,
        occurred_at: Utc::now(),
        duration_ms: None,
        context: None,
    };

    FeedbackRecorder::apply(&state.store, &event).await?;

    if let Some(cache) = &state.cache {
        cache.invalidate_user(&user_id).await?;
    }

    info!(
        user_id = %user_id,
        post_id = %post_id,
        reason = body.reason.as_deref().unwrap_or("unspecified"),
        "post hidden, caches invalidated"
    );
    Ok(HttpResponse::Ok().json(StatusResponse::ok("Content hidden")))
}
