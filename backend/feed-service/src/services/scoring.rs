//! Composite relevance scoring for the merged candidate pool.
//!
//! score = relevance·w1 + recency·w2 + engagement·w3 + relationship·w4
//!         + diversity·w5
//!
//! Every sub-score is normalized to [0, 1]; the weights come from
//! configuration. Scores are deterministic for a fixed (pool, profile,
//! weights, now) — ties keep the original pool order.
//!
//! When no ranking profile is available (new user, store outage) the
//! engine falls back to recency + raw engagement: the relevance and
//! relationship terms read as zero and the request still succeeds.

use crate::config::{RankingConfig, ScoringWeights};
use crate::models::{
    ContentCandidate, RankingProfile, ScoreBreakdown, ScoredCandidate, SourcedCandidate,
};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Relationship floor for authors the requester follows but has not yet
/// interacted with
const FOLLOWED_BASELINE: f64 = 0.3;

pub struct ScoringEngine {
    weights: ScoringWeights,
    half_life_hours: f64,
}

impl ScoringEngine {
    pub fn new(cfg: &RankingConfig) -> Self {
        Self {
            weights: cfg.weights,
            half_life_hours: cfg.recency_half_life_hours,
        }
    }

    /// Score every candidate in the pool and return them sorted by
    /// composite score, descending. The sort is stable so equal scores
    /// keep their original pool order.
    pub fn score(
        &self,
        pool: Vec<SourcedCandidate>,
        profile: Option<&RankingProfile>,
        following: &HashSet<String>,
        type_history: &HashMap<String, u64>,
        now: DateTime<Utc>,
    ) -> Vec<ScoredCandidate> {
        let history_total: u64 = type_history.values().sum();

        let mut scored: Vec<ScoredCandidate> = pool
            .into_iter()
            .map(|sourced| {
                let breakdown = self.breakdown(
                    &sourced.candidate,
                    profile,
                    following,
                    type_history,
                    history_total,
                    now,
                );
                let score = self.weights.relevance * breakdown.relevance
                    + self.weights.recency * breakdown.recency
                    + self.weights.engagement * breakdown.engagement
                    + self.weights.relationship * breakdown.relationship
                    + self.weights.diversity * breakdown.diversity;
                ScoredCandidate {
                    candidate: sourced.candidate,
                    source: sourced.source,
                    score,
                    breakdown,
                }
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

        debug!(
            scored = scored.len(),
            top_score = scored.first().map(|c| c.score),
            fallback = profile.is_none(),
            "scoring complete"
        );

        scored
    }

    fn breakdown(
        &self,
        candidate: &ContentCandidate,
        profile: Option<&RankingProfile>,
        following: &HashSet<String>,
        type_history: &HashMap<String, u64>,
        history_total: u64,
        now: DateTime<Utc>,
    ) -> ScoreBreakdown {
        ScoreBreakdown {
            relevance: relevance(candidate, profile),
            recency: self.recency(candidate.created_at(), now),
            engagement: candidate.engagement().map(|e| e.rate()).unwrap_or(0.0),
            relationship: relationship(candidate, profile, following),
            diversity: diversity(candidate, type_history, history_total),
        }
    }

    /// Exponential decay halving roughly every `half_life_hours`.
    fn recency(&self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
        let age_hours = (now - created_at).num_minutes().max(0) as f64 / 60.0;
        0.5_f64.powf(age_hours / self.half_life_hours).clamp(0.0, 1.0)
    }
}

/// Overlap between the user's topic affinities and the candidate's
/// hashtag set, normalized by the candidate's tag count.
fn relevance(candidate: &ContentCandidate, profile: Option<&RankingProfile>) -> f64 {
    let Some(profile) = profile else { return 0.0 };
    let tags = candidate.hashtags();
    if tags.is_empty() {
        return 0.0;
    }

    let matched: f64 = tags
        .iter()
        .filter_map(|tag| profile.topic_interests.get(tag))
        .map(|affinity| affinity.clamp(0.0, 1.0))
        .sum();

    (matched / tags.len() as f64).clamp(0.0, 1.0)
}

/// The requester's affinity for the candidate's author; zero for
/// unknown authors. Followed authors never score below the baseline,
/// even before any interaction history accrues.
fn relationship(
    candidate: &ContentCandidate,
    profile: Option<&RankingProfile>,
    following: &HashSet<String>,
) -> f64 {
    let Some(profile) = profile else { return 0.0 };
    let Some(author) = candidate.author_id() else { return 0.0 };
    let affinity = profile
        .author_affinity
        .get(author)
        .map(|affinity| affinity.clamp(0.0, 1.0))
        .unwrap_or(0.0);
    if following.contains(author) {
        affinity.max(FOLLOWED_BASELINE)
    } else {
        affinity
    }
}

/// Small bonus for content types underrepresented in the user's recent
/// feed history. No history means every type counts as fresh.
fn diversity(
    candidate: &ContentCandidate,
    type_history: &HashMap<String, u64>,
    history_total: u64,
) -> f64 {
    if history_total == 0 {
        return 1.0;
    }
    let seen = type_history
        .get(candidate.content_type().as_str())
        .copied()
        .unwrap_or(0);
    1.0 - (seen as f64 / history_total as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RankingConfig;
    use crate::models::{EngagementCounts, SourceTag};
    use chrono::Duration;

    fn engine() -> ScoringEngine {
        ScoringEngine::new(&RankingConfig::default())
    }

    fn post(id: &str, author: &str, age_hours: i64, engagement: EngagementCounts, tags: &[&str]) -> SourcedCandidate {
        SourcedCandidate {
            candidate: ContentCandidate::Post {
                id: id.to_string(),
                author_id: author.to_string(),
                created_at: Utc::now() - Duration::hours(age_hours),
                engagement,
                hashtags: tags.iter().map(|t| t.to_string()).collect(),
                geo: None,
            },
            source: SourceTag::Following,
        }
    }

    #[test]
    fn test_newer_posts_score_higher_all_else_equal() {
        let now = Utc::now();
        let scored = engine().score(
            vec![
                post("old", "a", 48, EngagementCounts::default(), &[]),
                post("new", "b", 1, EngagementCounts::default(), &[]),
            ],
            None,
            &HashSet::new(),
            &HashMap::new(),
            now,
        );
        assert_eq!(scored[0].candidate.id(), "new");
        assert_eq!(scored[1].candidate.id(), "old");
    }

    #[test]
    fn test_recency_halves_every_24_hours() {
        let e = engine();
        let now = Utc::now();
        let fresh = e.recency(now, now);
        let day_old = e.recency(now - Duration::hours(24), now);
        let two_days = e.recency(now - Duration::hours(48), now);
        assert!((fresh - 1.0).abs() < 1e-6);
        assert!((day_old - 0.5).abs() < 1e-3);
        assert!((two_days - 0.25).abs() < 1e-3);
    }

    #[test]
    fn test_zero_views_yields_finite_zero_engagement() {
        let now = Utc::now();
        let scored = engine().score(
            vec![post(
                "p",
                "a",
                1,
                EngagementCounts {
                    likes: 100,
                    comments: 50,
                    shares: 10,
                    views: 0,
                },
                &[],
            )],
            None,
            &HashSet::new(),
            &HashMap::new(),
            now,
        );
        assert_eq!(scored[0].breakdown.engagement, 0.0);
        assert!(scored[0].score.is_finite());
    }

    #[test]
    fn test_fallback_mode_zeroes_profile_terms() {
        let now = Utc::now();
        let scored = engine().score(
            vec![post("p", "a", 1, EngagementCounts::default(), &["rust"])],
            None,
            &HashSet::new(),
            &HashMap::new(),
            now,
        );
        assert_eq!(scored[0].breakdown.relevance, 0.0);
        assert_eq!(scored[0].breakdown.relationship, 0.0);
        assert!(scored[0].breakdown.recency > 0.0);
    }

    #[test]
    fn test_relationship_boosts_known_authors() {
        let now = Utc::now();
        let mut profile = RankingProfile::new("u1");
        profile.author_affinity.insert("friend".to_string(), 0.9);

        let scored = engine().score(
            vec![
                post("stranger-post", "stranger", 1, EngagementCounts::default(), &[]),
                post("friend-post", "friend", 1, EngagementCounts::default(), &[]),
            ],
            Some(&profile),
            &HashSet::new(),
            &HashMap::new(),
            now,
        );
        assert_eq!(scored[0].candidate.id(), "friend-post");
        assert!((scored[0].breakdown.relationship - 0.9).abs() < 1e-9);
        assert_eq!(scored[1].breakdown.relationship, 0.0);
    }

    #[test]
    fn test_relevance_matches_interest_overlap() {
        let mut profile = RankingProfile::new("u1");
        profile.topic_interests.insert("rust".to_string(), 1.0);
        profile.topic_interests.insert("food".to_string(), 0.5);

        let candidate = ContentCandidate::Post {
            id: "p".into(),
            author_id: "a".into(),
            created_at: Utc::now(),
            engagement: EngagementCounts::default(),
            hashtags: vec!["rust".into(), "food".into()],
            geo: None,
        };
        let score = relevance(&candidate, Some(&profile));
        assert!((score - 0.75).abs() < 1e-9);

        let untagged = ContentCandidate::Post {
            id: "q".into(),
            author_id: "a".into(),
            created_at: Utc::now(),
            engagement: EngagementCounts::default(),
            hashtags: vec![],
            geo: None,
        };
        assert_eq!(relevance(&untagged, Some(&profile)), 0.0);
    }

    #[test]
    fn test_diversity_favors_underrepresented_types() {
        let mut history = HashMap::new();
        history.insert("post".to_string(), 9u64);
        history.insert("reel".to_string(), 1u64);

        let post_candidate = ContentCandidate::Post {
            id: "p".into(),
            author_id: "a".into(),
            created_at: Utc::now(),
            engagement: EngagementCounts::default(),
            hashtags: vec![],
            geo: None,
        };
        let reel_candidate = ContentCandidate::Reel {
            id: "r".into(),
            author_id: "a".into(),
            created_at: Utc::now(),
            engagement: EngagementCounts::default(),
            hashtags: vec![],
            geo: None,
            duration_secs: 30,
        };

        let post_div = diversity(&post_candidate, &history, 10);
        let reel_div = diversity(&reel_candidate, &history, 10);
        assert!(reel_div > post_div);
        assert!((post_div - 0.1).abs() < 1e-9);
        assert!((reel_div - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_deterministic_given_fixed_inputs() {
        let now = Utc::now();
        let mut profile = RankingProfile::new("u1");
        profile.topic_interests.insert("rust".to_string(), 0.8);
        profile.author_affinity.insert("a".to_string(), 0.6);

        let pool = || {
            vec![
                post("p1", "a", 2, EngagementCounts { likes: 5, comments: 1, shares: 0, views: 100 }, &["rust"]),
                post("p2", "b", 5, EngagementCounts { likes: 50, comments: 10, shares: 5, views: 1000 }, &[]),
                post("p3", "c", 1, EngagementCounts::default(), &["rust"]),
            ]
        };

        let first = engine().score(pool(), Some(&profile), &HashSet::new(), &HashMap::new(), now);
        let second = engine().score(pool(), Some(&profile), &HashSet::new(), &HashMap::new(), now);

        let ids: Vec<&str> = first.iter().map(|c| c.candidate.id()).collect();
        let ids2: Vec<&str> = second.iter().map(|c| c.candidate.id()).collect();
        assert_eq!(ids, ids2);
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.score, b.score);
        }
    }

    #[test]
    fn test_stable_tie_break_keeps_pool_order() {
        let now = Utc::now();
        let created = now - Duration::hours(3);
        let make = |id: &str| SourcedCandidate {
            candidate: ContentCandidate::Post {
                id: id.to_string(),
                author_id: "same".to_string(),
                created_at: created,
                engagement: EngagementCounts::default(),
                hashtags: vec![],
                geo: None,
            },
            source: SourceTag::Following,
        };

        let scored = engine().score(
            vec![make("first"), make("second"), make("third")],
            None,
            &HashSet::new(),
            &HashMap::new(),
            now,
        );
        let ids: Vec<&str> = scored.iter().map(|c| c.candidate.id()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_followed_author_gets_relationship_baseline() {
        let now = Utc::now();
        let profile = RankingProfile::new("u1");
        let following: HashSet<String> = ["friend".to_string()].into_iter().collect();

        let scored = engine().score(
            vec![
                post("friend-post", "friend", 1, EngagementCounts::default(), &[]),
                post("stranger-post", "stranger", 1, EngagementCounts::default(), &[]),
            ],
            Some(&profile),
            &following,
            &HashMap::new(),
            now,
        );

        let friend = scored.iter().find(|c| c.candidate.id() == "friend-post").unwrap();
        let stranger = scored.iter().find(|c| c.candidate.id() == "stranger-post").unwrap();
        assert!((friend.breakdown.relationship - 0.3).abs() < 1e-9);
        assert_eq!(stranger.breakdown.relationship, 0.0);

        // Accrued affinity above the baseline wins
        let mut profile = RankingProfile::new("u1");
        profile.author_affinity.insert("friend".to_string(), 0.9);
        let scored = engine().score(
            vec![post("friend-post", "friend", 1, EngagementCounts::default(), &[])],
            Some(&profile),
            &following,
            &HashMap::new(),
            now,
        );
        assert!((scored[0].breakdown.relationship - 0.9).abs() < 1e-9);
    }
}
