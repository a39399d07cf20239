//! Engagement feedback recorder.
//!
//! Events enter through an explicit ingestion handle (a bounded mpsc
//! channel) and are drained by a single worker task, decoupled from any
//! in-flight feed generation. The worker applies each event to the
//! signal store: a signed counter increment, an append to the bounded
//! interaction log, and an incremental ranking-profile update.
//!
//! Delivery is at-least-once; updates are increments, never replaces,
//! so a redelivered event double-counts slightly instead of requiring
//! exactly-once coordination. Malformed events are logged and dropped —
//! event loss is preferable to failing the producer.

use crate::models::{EngagementAction, EngagementEvent, RankingProfile};
use chrono::Timelike;
use signal_store::{SignalStore, StoreError};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Ingestion entry point handed to the HTTP layer. Cheap to clone.
#[derive(Clone)]
pub struct FeedbackHandle {
    tx: mpsc::Sender<EngagementEvent>,
}

impl FeedbackHandle {
    /// Enqueue an event without blocking the request path. Returns
    /// false when the queue is full and the event was dropped.
    pub fn ingest(&self, event: EngagementEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!(
                    user_id = %event.user_id,
                    content_id = %event.content_id,
                    "feedback queue full, dropping event"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("feedback recorder is gone, dropping event");
                false
            }
        }
    }
}

pub struct FeedbackRecorder;

impl FeedbackRecorder {
    /// Start the worker task and return the ingestion handle. The
    /// single consumer serializes processing, so no two events for the
    /// same user-content pair ever race a counter.
    pub fn spawn(store: SignalStore, channel_capacity: usize) -> FeedbackHandle {
        let (tx, mut rx) = mpsc::channel::<EngagementEvent>(channel_capacity);

        tokio::spawn(async move {
            info!("feedback recorder started");
            while let Some(event) = rx.recv().await {
                if !Self::validate(&event) {
                    warn!(event_id = %event.event_id, "dropping malformed engagement event");
                    continue;
                }
                if let Err(e) = Self::apply(&store, &event).await {
                    // Store failures lose this event's effect; the
                    // at-least-once model tolerates that.
                    warn!(
                        user_id = %event.user_id,
                        content_id = %event.content_id,
                        error = %e,
                        "failed to apply engagement event"
                    );
                }
            }
            info!("feedback recorder stopped");
        });

        FeedbackHandle { tx }
    }

    fn validate(event: &EngagementEvent) -> bool {
        !event.user_id.is_empty() && !event.content_id.is_empty()
    }

    /// Apply one event to the signal store.
    pub async fn apply(store: &SignalStore, event: &EngagementEvent) -> Result<(), StoreError> {
        let weight = event.action.signal_weight();

        store
            .record_engagement(&event.user_id, &event.content_id, weight)
            .await?;
        store.push_interaction(&event.user_id, event).await?;
        store.mark_active(&event.user_id).await?;

        if event.action == EngagementAction::Hide {
            store.hide_content(&event.user_id, &event.content_id).await?;
        }

        if event.action == EngagementAction::View {
            if let Some(content_type) = event.context.as_ref().and_then(|c| c.content_type) {
                store
                    .incr_type_view(&event.user_id, content_type.as_str())
                    .await?;
            }
        }

        let mut profile = store
            .get_profile::<RankingProfile>(&event.user_id)
            .await?
            .unwrap_or_else(|| RankingProfile::new(&event.user_id));
        Self::update_profile(&mut profile, event);
        store.set_profile(&event.user_id, &profile).await?;

        debug!(
            user_id = %event.user_id,
            content_id = %event.content_id,
            action = event.action.as_str(),
            weight,
            "engagement applied"
        );
        Ok(())
    }

    /// Incremental profile update: author/topic affinity deltas and
    /// running engagement rates.
    fn update_profile(profile: &mut RankingProfile, event: &EngagementEvent) {
        let delta = event.action.affinity_delta();

        if let Some(context) = &event.context {
            if let Some(author_id) = &context.author_id {
                let affinity = profile.author_affinity.entry(author_id.clone()).or_insert(0.0);
                *affinity = (*affinity + delta).clamp(0.0, 1.0);
            }
            for topic in &context.topics {
                let interest = profile.topic_interests.entry(topic.clone()).or_insert(0.0);
                *interest = (*interest + delta).clamp(0.0, 1.0);
            }
            if let Some(content_type) = context.content_type {
                let weight = profile
                    .content_type_weights
                    .entry(content_type.as_str().to_string())
                    .or_insert(0.0);
                *weight = (*weight + delta).clamp(0.0, 1.0);
            }
        }

        let rates = &mut profile.engagement_rates;
        rates.events += 1;
        let n = rates.events as f64;
        let bump = |rate: &mut f64, hit: bool| {
            *rate += ((hit as u8) as f64 - *rate) / n;
        };
        bump(&mut rates.like_rate, event.action == EngagementAction::Like);
        bump(&mut rates.comment_rate, event.action == EngagementAction::Comment);
        bump(&mut rates.share_rate, event.action == EngagementAction::Share);
        bump(&mut rates.skip_rate, event.action == EngagementAction::Skip);

        // Engaging during an hour nudges it into the optimal window
        let hour = event.occurred_at.hour();
        if !event.action.is_negative() && !profile.optimal_hours.contains(&hour) {
            profile.optimal_hours.push(hour);
            profile.optimal_hours.sort_unstable();
            if profile.optimal_hours.len() > 6 {
                profile.optimal_hours.remove(0);
            }
        }

        profile.updated_at = event.occurred_at;
    }
}
