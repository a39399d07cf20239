//! End-to-end pipeline tests over stub candidate sources.
//!
//! Drives the aggregation → scoring → diversification → realtime →
//! assembly chain without Redis or HTTP: sources are in-memory stubs
//! and the assembly core is pure, so every assertion is deterministic.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use feed_service::config::RankingConfig;
use feed_service::models::{
    AccountSummary, Algorithm, ContentCandidate, ContentType, EngagementCounts, DeviceClass,
    FeedType, RankingProfile, RequestContext, SourceTag,
};
use feed_service::{CandidateAggregator, CandidateSource, FeedPipeline, SourceRequest};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

struct StubSource {
    tag: SourceTag,
    candidates: Vec<ContentCandidate>,
}

#[async_trait]
impl CandidateSource for StubSource {
    async fn fetch(
        &self,
        _user_id: &str,
        _profile: Option<&RankingProfile>,
        _request: &SourceRequest,
    ) -> anyhow::Result<Vec<ContentCandidate>> {
        Ok(self.candidates.clone())
    }

    fn source(&self) -> SourceTag {
        self.tag
    }
}

struct DownSource(SourceTag);

#[async_trait]
impl CandidateSource for DownSource {
    async fn fetch(
        &self,
        _user_id: &str,
        _profile: Option<&RankingProfile>,
        _request: &SourceRequest,
    ) -> anyhow::Result<Vec<ContentCandidate>> {
        anyhow::bail!("origin down")
    }

    fn source(&self) -> SourceTag {
        self.0
    }
}

fn post(id: &str, author: &str, age_hours: i64, engagement: EngagementCounts) -> ContentCandidate {
    ContentCandidate::Post {
        id: id.to_string(),
        author_id: author.to_string(),
        created_at: Utc::now() - ChronoDuration::hours(age_hours),
        engagement,
        hashtags: vec![],
        geo: None,
    }
}

fn hot() -> EngagementCounts {
    EngagementCounts {
        likes: 80,
        comments: 20,
        shares: 10,
        views: 200,
    }
}

fn cold() -> EngagementCounts {
    EngagementCounts {
        likes: 1,
        comments: 0,
        shares: 0,
        views: 100,
    }
}

fn ctx() -> RequestContext {
    RequestContext {
        hour: 12,
        device: DeviceClass::Desktop,
        geo: None,
    }
}

fn aggregator(sources: Vec<Arc<dyn CandidateSource>>) -> CandidateAggregator {
    CandidateAggregator::new(sources, Duration::from_millis(500))
}

fn pipeline() -> FeedPipeline {
    FeedPipeline::new(&RankingConfig::default())
}

/// User follows A and B; A dominates the raw scores with 10 recent,
/// high-engagement posts, B contributes 2 older ones, and 5 trending
/// items come from C. The diversifier must cap A at 2 despite A's raw
/// dominance.
#[tokio::test]
async fn author_cap_overrides_raw_score_order() {
    let a_posts: Vec<ContentCandidate> = (0..10)
        .map(|i| post(&format!("a{}", i), "author-a", 1 + i, hot()))
        .collect();
    let mut following = a_posts;
    following.push(post("b0", "author-b", 30, cold()));
    following.push(post("b1", "author-b", 40, cold()));

    let trending: Vec<ContentCandidate> = (0..5)
        .map(|i| post(&format!("c{}", i), "author-c", 5 + i, cold()))
        .collect();

    let aggregator = aggregator(vec![
        Arc::new(StubSource {
            tag: SourceTag::Following,
            candidates: following,
        }),
        Arc::new(StubSource {
            tag: SourceTag::Trending,
            candidates: trending,
        }),
    ]);

    let result = aggregator
        .collect("u1", None, &SourceRequest::new(FeedType::Home))
        .await;
    assert_eq!(result.candidates.len(), 17);

    let page = pipeline().build_feed(
        result.candidates,
        None,
        &HashSet::new(),
        &ctx(),
        &HashSet::new(),
        &HashMap::new(),
        Utc::now(),
        Algorithm::Ranked,
        FeedType::Home,
        1,
        50,
    );

    // Pool (17) is below the 50-item budget, so the documented
    // relaxation eventually returns everything available...
    assert_eq!(page.items.len(), 17);

    // ...but the cap-honoring selection leads the page: pure score
    // order would have filled every top slot with A.
    let top_a = page
        .items
        .iter()
        .take(3)
        .filter(|item| item.author_id.as_deref() == Some("author-a"))
        .count();
    assert_eq!(top_a, 2, "author cap must override raw score dominance");

    // A's two capped slots still rank first: their scores dominate
    assert_eq!(page.items[0].author_id.as_deref(), Some("author-a"));
    assert_eq!(page.items[1].author_id.as_deref(), Some("author-a"));
    assert_ne!(page.items[2].author_id.as_deref(), Some("author-a"));
}

#[tokio::test]
async fn hidden_content_never_resurfaces_on_refresh() {
    let aggregator = aggregator(vec![Arc::new(StubSource {
        tag: SourceTag::Following,
        candidates: vec![
            post("keep", "a1", 2, hot()),
            post("hidden-x", "a2", 1, hot()),
        ],
    })]);

    let result = aggregator
        .collect("u1", None, &SourceRequest::new(FeedType::Home))
        .await;

    // The hide handler records the id synchronously before any refresh
    let hidden: HashSet<String> = ["hidden-x".to_string()].into_iter().collect();

    let page = pipeline().build_feed(
        result.candidates,
        None,
        &HashSet::new(),
        &ctx(),
        &hidden,
        &HashMap::new(),
        Utc::now(),
        Algorithm::Ranked,
        FeedType::Home,
        1,
        50,
    );

    assert!(page.items.iter().all(|item| item.id != "hidden-x"));
    assert_eq!(page.items.len(), 1);
}

#[tokio::test]
async fn duplicate_ids_across_sources_collapse_to_first_seen() {
    let shared = post("shared", "a1", 2, hot());
    let aggregator = aggregator(vec![
        Arc::new(StubSource {
            tag: SourceTag::Following,
            candidates: vec![shared.clone(), post("f1", "a2", 3, cold())],
        }),
        Arc::new(StubSource {
            tag: SourceTag::Recommended,
            candidates: vec![shared],
        }),
    ]);

    let result = aggregator
        .collect("u1", None, &SourceRequest::new(FeedType::Home))
        .await;

    let page = pipeline().build_feed(
        result.candidates,
        None,
        &HashSet::new(),
        &ctx(),
        &HashSet::new(),
        &HashMap::new(),
        Utc::now(),
        Algorithm::Ranked,
        FeedType::Home,
        1,
        50,
    );

    let mut seen = HashSet::new();
    for item in &page.items {
        assert!(seen.insert(item.id.clone()), "duplicate id {}", item.id);
    }
    let shared_item = page.items.iter().find(|i| i.id == "shared").unwrap();
    assert_eq!(shared_item.source, SourceTag::Following);
}

#[tokio::test]
async fn partial_source_failure_still_serves() {
    let aggregator = aggregator(vec![
        Arc::new(DownSource(SourceTag::Recommended)),
        Arc::new(StubSource {
            tag: SourceTag::Following,
            candidates: vec![post("f1", "a1", 1, hot())],
        }),
    ]);

    let result = aggregator
        .collect("u1", None, &SourceRequest::new(FeedType::Home))
        .await;

    assert!(!result.all_sources_failed());
    assert_eq!(result.sources_failed, 1);

    let page = pipeline().build_feed(
        result.candidates,
        None,
        &HashSet::new(),
        &ctx(),
        &HashSet::new(),
        &HashMap::new(),
        Utc::now(),
        Algorithm::Ranked,
        FeedType::Home,
        1,
        50,
    );
    assert_eq!(page.items.len(), 1);
}

#[tokio::test]
async fn total_source_failure_is_detectable() {
    let aggregator = aggregator(vec![
        Arc::new(DownSource(SourceTag::Following)),
        Arc::new(DownSource(SourceTag::Trending)),
    ]);

    let result = aggregator
        .collect("u1", None, &SourceRequest::new(FeedType::Home))
        .await;

    assert!(result.all_sources_failed());
}

#[tokio::test]
async fn committed_slots_hold_sponsored_and_suggested() {
    let organic: Vec<ContentCandidate> = (0..12)
        .map(|i| post(&format!("p{}", i), &format!("a{}", i), 1 + i, cold()))
        .collect();

    let aggregator = aggregator(vec![
        Arc::new(StubSource {
            tag: SourceTag::Following,
            candidates: organic,
        }),
        Arc::new(StubSource {
            tag: SourceTag::Sponsored,
            candidates: vec![ContentCandidate::Sponsored {
                id: "ad1".to_string(),
                advertiser_id: "adv".to_string(),
                created_at: Utc::now(),
                engagement: EngagementCounts::default(),
                hashtags: vec![],
            }],
        }),
        Arc::new(StubSource {
            tag: SourceTag::SuggestedUsers,
            candidates: vec![ContentCandidate::SuggestedAccounts {
                id: "suggested:u1".to_string(),
                accounts: vec![AccountSummary {
                    user_id: "s1".to_string(),
                    username: "sam".to_string(),
                    follower_count: 42,
                }],
                created_at: Utc::now(),
            }],
        }),
    ]);

    let result = aggregator
        .collect("u1", None, &SourceRequest::new(FeedType::Home))
        .await;

    let page = pipeline().build_feed(
        result.candidates,
        None,
        &HashSet::new(),
        &ctx(),
        &HashSet::new(),
        &HashMap::new(),
        Utc::now(),
        Algorithm::Ranked,
        FeedType::Home,
        1,
        50,
    );

    // Suggested group at slot 3 (index 2), sponsored at slot 5 (index 4)
    assert_eq!(page.items[2].content_type, ContentType::SuggestedAccounts);
    assert_eq!(page.items[4].content_type, ContentType::Sponsored);
    for (idx, item) in page.items.iter().enumerate() {
        if item.content_type == ContentType::Sponsored {
            assert_eq!((idx + 1) % 5, 0);
        }
    }
}

#[tokio::test]
async fn identical_snapshot_yields_identical_pages() {
    let now = Utc::now();
    let candidates: Vec<ContentCandidate> = (0..20)
        .map(|i| {
            post(
                &format!("p{}", i),
                &format!("a{}", i % 7),
                1 + (i % 10),
                if i % 2 == 0 { hot() } else { cold() },
            )
        })
        .collect();

    let mut profile = RankingProfile::new("u1");
    profile.author_affinity.insert("a3".to_string(), 0.8);
    profile.topic_interests.insert("rust".to_string(), 0.9);

    let aggregator = aggregator(vec![Arc::new(StubSource {
        tag: SourceTag::Following,
        candidates,
    })]);

    let result = aggregator
        .collect("u1", Some(&profile), &SourceRequest::new(FeedType::Home))
        .await;

    let p = pipeline();
    let run = |pool: Vec<_>| {
        p.build_feed(
            pool,
            Some(&profile),
            &HashSet::new(),
            &ctx(),
            &HashSet::new(),
            &HashMap::new(),
            now,
            Algorithm::Ranked,
            FeedType::Home,
            1,
            50,
        )
    };

    let first = run(result.candidates.clone());
    let second = run(result.candidates);

    let ids1: Vec<&str> = first.items.iter().map(|i| i.id.as_str()).collect();
    let ids2: Vec<&str> = second.items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids1, ids2);
    for (a, b) in first.items.iter().zip(second.items.iter()) {
        assert_eq!(a.score, b.score);
        assert_eq!(a.breakdown.recency, b.breakdown.recency);
    }
}

#[tokio::test]
async fn reels_feed_filters_to_reels() {
    let aggregator = aggregator(vec![Arc::new(StubSource {
        tag: SourceTag::Following,
        candidates: vec![
            post("p1", "a1", 1, hot()),
            ContentCandidate::Reel {
                id: "r1".to_string(),
                author_id: "a2".to_string(),
                created_at: Utc::now(),
                engagement: hot(),
                hashtags: vec![],
                geo: None,
                duration_secs: 22,
            },
        ],
    })]);

    let result = aggregator
        .collect("u1", None, &SourceRequest::new(FeedType::Reels))
        .await;

    let page = pipeline().build_feed(
        result.candidates,
        None,
        &HashSet::new(),
        &ctx(),
        &HashSet::new(),
        &HashMap::new(),
        Utc::now(),
        Algorithm::Ranked,
        FeedType::Reels,
        1,
        10,
    );

    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].content_type, ContentType::Reel);
}
