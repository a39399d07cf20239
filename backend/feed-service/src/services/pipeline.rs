//! Feed assembly: hidden filtering, scoring, diversification, real-time
//! boosts, committed-slot interleaving and pagination.
//!
//! The assembly core is pure — every input (candidate pool, profile,
//! context, hidden set, history, clock) is passed in, so two runs over
//! the same snapshot produce identical pages.

use crate::config::RankingConfig;
use crate::models::{
    Algorithm, ContentType, FeedItem, FeedMetadata, FeedPage, FeedType, Pagination,
    RankingProfile, RequestContext, ScoredCandidate, SourcedCandidate,
};
use crate::services::diversity::Diversifier;
use crate::services::realtime::RealtimeAdapter;
use crate::services::scoring::ScoringEngine;
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tracing::debug;

pub struct FeedPipeline {
    scoring: ScoringEngine,
    diversifier: Diversifier,
    realtime: RealtimeAdapter,
    sponsored_interval: usize,
    suggested_slot: usize,
}

impl FeedPipeline {
    pub fn new(cfg: &RankingConfig) -> Self {
        Self {
            scoring: ScoringEngine::new(cfg),
            diversifier: Diversifier::new(cfg),
            realtime: RealtimeAdapter::new(cfg),
            sponsored_interval: cfg.sponsored_interval,
            suggested_slot: cfg.suggested_slot,
        }
    }

    /// Run the scoring → diversify → boost chain over a candidate
    /// snapshot and assemble one page.
    #[allow(clippy::too_many_arguments)]
    pub fn build_feed(
        &self,
        mut pool: Vec<SourcedCandidate>,
        profile: Option<&RankingProfile>,
        following: &HashSet<String>,
        ctx: &RequestContext,
        hidden: &HashSet<String>,
        type_history: &HashMap<String, u64>,
        now: DateTime<Utc>,
        algorithm: Algorithm,
        feed_type: FeedType,
        page: u32,
        limit: u32,
    ) -> FeedPage {
        pool.retain(|c| !hidden.contains(c.candidate.id()));

        if feed_type == FeedType::Reels {
            pool.retain(|c| c.candidate.content_type() == ContentType::Reel);
        }

        // Sponsored and suggested items bypass diversification; they
        // occupy committed slots instead of competing for organic ones.
        let mut organic: Vec<SourcedCandidate> = Vec::new();
        let mut sponsored: Vec<SourcedCandidate> = Vec::new();
        let mut suggested: Vec<SourcedCandidate> = Vec::new();
        for candidate in pool {
            match candidate.candidate.content_type() {
                ContentType::Sponsored => sponsored.push(candidate),
                ContentType::SuggestedAccounts => suggested.push(candidate),
                _ => organic.push(candidate),
            }
        }

        let mut organic = self.scoring.score(organic, profile, following, type_history, now);
        let sponsored = self.scoring.score(sponsored, profile, following, type_history, now);
        let suggested = self
            .scoring
            .score(suggested, profile, following, type_history, now)
            .into_iter()
            .next();

        let organic = match algorithm {
            Algorithm::Ranked => {
                let selection = self.diversifier.select(organic);
                let mut strict = selection.items;
                let relaxed = strict.split_off(selection.strict_len.min(strict.len()));
                // Boosts re-sort within each tier; cap-relaxed items
                // never climb back above the capped selection.
                let mut boosted = self.realtime.apply(strict, ctx, profile);
                boosted.extend(self.realtime.apply(relaxed, ctx, profile));
                boosted
            }
            Algorithm::Recent => {
                organic.sort_by(|a, b| b.candidate.created_at().cmp(&a.candidate.created_at()));
                organic
            }
        };

        let interleave_slots = feed_type != FeedType::Reels;
        let assembled = if interleave_slots {
            self.interleave(organic, sponsored, suggested)
        } else {
            organic
        };

        debug!(
            feed_type = feed_type.as_str(),
            algorithm = algorithm.as_str(),
            assembled = assembled.len(),
            "feed assembled"
        );

        paginate(assembled, algorithm, now, page, limit)
    }

    /// Merge the ordered organic list with committed-slot items: the
    /// suggested-accounts group at `suggested_slot`, a sponsored item at
    /// every `sponsored_interval`-th slot. Slot numbering is 1-based.
    fn interleave(
        &self,
        organic: Vec<ScoredCandidate>,
        sponsored: Vec<ScoredCandidate>,
        suggested: Option<ScoredCandidate>,
    ) -> Vec<ScoredCandidate> {
        let mut out: Vec<ScoredCandidate> =
            Vec::with_capacity(organic.len() + sponsored.len() + 1);
        let mut organic = organic.into_iter();
        let mut sponsored = sponsored.into_iter();
        let mut suggested = suggested;
        let mut next_organic = organic.next();

        loop {
            let slot = out.len() + 1;

            if slot == self.suggested_slot {
                if let Some(group) = suggested.take() {
                    out.push(group);
                    continue;
                }
            }

            if self.sponsored_interval > 0 && slot % self.sponsored_interval == 0 {
                if let Some(ad) = sponsored.next() {
                    out.push(ad);
                    continue;
                }
            }

            match next_organic.take() {
                Some(candidate) => {
                    out.push(candidate);
                    next_organic = organic.next();
                }
                // Out of organic items: remaining committed-slot items
                // are dropped rather than bunched at the tail.
                None => break,
            }
        }

        out
    }
}

fn paginate(
    assembled: Vec<ScoredCandidate>,
    algorithm: Algorithm,
    now: DateTime<Utc>,
    page: u32,
    limit: u32,
) -> FeedPage {
    let start = ((page as usize).saturating_sub(1)) * limit as usize;
    let end = (start + limit as usize).min(assembled.len());
    let has_more = assembled.len() > start + limit as usize;

    let items: Vec<FeedItem> = if start < assembled.len() {
        assembled[start..end].iter().map(FeedItem::from).collect()
    } else {
        Vec::new()
    };

    let cursor = has_more.then(|| general_purpose::STANDARD.encode((page + 1).to_string()));

    FeedPage {
        items,
        pagination: Pagination {
            page,
            limit,
            has_more,
        },
        metadata: FeedMetadata {
            algorithm: algorithm.as_str().to_string(),
            generated_at: now,
            cached: false,
            cursor,
        },
    }
}
