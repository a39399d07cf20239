//! Affinity refresh background job.
//!
//! Periodically recomputes topic and author affinities for recently
//! active users from their bounded interaction log, blending the
//! recomputed values into the stored ranking profile. The per-event
//! deltas applied by the feedback recorder give immediate signal; this
//! job keeps long-lived affinities anchored to the actual recent
//! history instead of drifting on increments alone.

use crate::models::{EngagementEvent, RankingProfile};
use signal_store::{SignalStore, StoreError};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// How many log entries feed one recompute
const LOG_WINDOW: usize = 200;

/// Weight of the recomputed value when blending into the profile
const BLEND: f64 = 0.5;

pub async fn start_affinity_refresh(store: SignalStore, interval_secs: u64) {
    let interval = Duration::from_secs(interval_secs);
    info!(
        interval_secs,
        "starting affinity refresh background job"
    );

    loop {
        sleep(interval).await;

        let cycle_start = Instant::now();
        match run_cycle(&store).await {
            Ok(refreshed) => {
                info!(
                    refreshed,
                    duration_ms = cycle_start.elapsed().as_millis() as u64,
                    "affinity refresh cycle completed"
                );
            }
            Err(e) => {
                warn!(
                    error = %e,
                    duration_ms = cycle_start.elapsed().as_millis() as u64,
                    "affinity refresh cycle failed"
                );
            }
        }
    }
}

async fn run_cycle(store: &SignalStore) -> Result<usize, StoreError> {
    let users = store.active_users().await?;
    if users.is_empty() {
        debug!("no recently active users");
        return Ok(0);
    }

    let mut refreshed = 0;
    for user_id in users {
        let events: Vec<EngagementEvent> = store.recent_interactions(&user_id, LOG_WINDOW).await?;
        if events.is_empty() {
            continue;
        }

        let mut profile = store
            .get_profile::<RankingProfile>(&user_id)
            .await?
            .unwrap_or_else(|| RankingProfile::new(&user_id));

        recompute(&mut profile, &events);
        store.set_profile(&user_id, &profile).await?;
        refreshed += 1;
    }

    Ok(refreshed)
}

/// Aggregate signal weights per author/topic over the log window,
/// normalize by the largest magnitude, and blend into the profile.
fn recompute(profile: &mut RankingProfile, events: &[EngagementEvent]) {
    let mut author_signal: HashMap<String, f64> = HashMap::new();
    let mut topic_signal: HashMap<String, f64> = HashMap::new();

    for event in events {
        let weight = event.action.signal_weight();
        if let Some(context) = &event.context {
            if let Some(author_id) = &context.author_id {
                *author_signal.entry(author_id.clone()).or_insert(0.0) += weight;
            }
            for topic in &context.topics {
                *topic_signal.entry(topic.clone()).or_insert(0.0) += weight;
            }
        }
    }

    blend_into(&mut profile.author_affinity, author_signal);
    blend_into(&mut profile.topic_interests, topic_signal);
}

fn blend_into(target: &mut HashMap<String, f64>, signal: HashMap<String, f64>) {
    let max = signal.values().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    if max <= 0.0 {
        return;
    }

    for (key, raw) in signal {
        let normalized = (raw / max).clamp(0.0, 1.0);
        let current = target.get(&key).copied().unwrap_or(0.0);
        target.insert(key, current * (1.0 - BLEND) + normalized * BLEND);
    }
}
