//! Candidate source adapters and the aggregation fan-out.
//!
//! One adapter per content origin; each returns a bounded list of
//! candidates. The aggregator calls every adapter concurrently with a
//! bounded per-source timeout, tolerates partial failure, and merges
//! the results into one deduplicated pool tagged by source.

mod content_client;
mod following;
mod recommended;
mod sponsored;
mod suggested;
mod trending;

use crate::models::{ContentCandidate, FeedType, RankingProfile, SourceTag, SourcedCandidate};
use async_trait::async_trait;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub use content_client::ContentClient;
pub use following::FollowingSource;
pub use recommended::RecommendedSource;
pub use sponsored::SponsoredSource;
pub use suggested::SuggestedAccountsSource;
pub use trending::TrendingSource;

/// Per-request parameters passed down to every adapter.
#[derive(Debug, Clone)]
pub struct SourceRequest {
    pub feed_type: FeedType,
    /// Explore category narrowing the trending topics
    pub category: Option<String>,
}

impl SourceRequest {
    pub fn new(feed_type: FeedType) -> Self {
        Self {
            feed_type,
            category: None,
        }
    }

    pub fn with_category(feed_type: FeedType, category: Option<String>) -> Self {
        Self {
            feed_type,
            category,
        }
    }
}

/// A single content origin.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    async fn fetch(
        &self,
        user_id: &str,
        profile: Option<&RankingProfile>,
        request: &SourceRequest,
    ) -> anyhow::Result<Vec<ContentCandidate>>;

    fn source(&self) -> SourceTag;
}

/// Outcome of one aggregation fan-out.
#[derive(Debug, Default)]
pub struct AggregationResult {
    pub candidates: Vec<SourcedCandidate>,
    pub sources_ok: usize,
    pub sources_failed: usize,
}

impl AggregationResult {
    /// True when every configured source failed outright. An empty pool
    /// from healthy sources is not a failure.
    pub fn all_sources_failed(&self) -> bool {
        self.sources_ok == 0 && self.sources_failed > 0
    }
}

/// Fans out to all configured candidate sources concurrently and merges
/// their results. Read-only; mutates no persistent state.
pub struct CandidateAggregator {
    sources: Vec<Arc<dyn CandidateSource>>,
    timeout: Duration,
}

impl CandidateAggregator {
    pub fn new(sources: Vec<Arc<dyn CandidateSource>>, timeout: Duration) -> Self {
        Self { sources, timeout }
    }

    /// Collect candidates from every source. Each call is time-boxed
    /// independently so a slow source cannot starve fast ones; a
    /// timed-out or failing source contributes an empty list.
    pub async fn collect(
        &self,
        user_id: &str,
        profile: Option<&RankingProfile>,
        request: &SourceRequest,
    ) -> AggregationResult {
        let fetches = self.sources.iter().map(|source| {
            let tag = source.source();
            async move {
                let outcome =
                    tokio::time::timeout(self.timeout, source.fetch(user_id, profile, request))
                        .await;
                (tag, outcome)
            }
        });

        let mut result = AggregationResult::default();
        let mut seen: HashSet<String> = HashSet::new();

        for (tag, outcome) in join_all(fetches).await {
            match outcome {
                Ok(Ok(candidates)) => {
                    result.sources_ok += 1;
                    for candidate in candidates {
                        // First-seen source tag wins on duplicates
                        if seen.insert(candidate.id().to_string()) {
                            result.candidates.push(SourcedCandidate {
                                candidate,
                                source: tag,
                            });
                        }
                    }
                }
                Ok(Err(e)) => {
                    result.sources_failed += 1;
                    warn!(source = tag.as_str(), error = %e, "candidate source failed");
                }
                Err(_) => {
                    result.sources_failed += 1;
                    warn!(
                        source = tag.as_str(),
                        timeout_ms = self.timeout.as_millis() as u64,
                        "candidate source timed out"
                    );
                }
            }
        }

        info!(
            user_id,
            feed_type = request.feed_type.as_str(),
            candidates = result.candidates.len(),
            sources_ok = result.sources_ok,
            sources_failed = result.sources_failed,
            "aggregation completed"
        );

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EngagementCounts;
    use chrono::Utc;

    struct StaticSource {
        tag: SourceTag,
        ids: Vec<&'static str>,
    }

    #[async_trait]
    impl CandidateSource for StaticSource {
        async fn fetch(
            &self,
            _user_id: &str,
            _profile: Option<&RankingProfile>,
            _request: &SourceRequest,
        ) -> anyhow::Result<Vec<ContentCandidate>> {
            Ok(self
                .ids
                .iter()
                .map(|id| ContentCandidate::Post {
                    id: id.to_string(),
                    author_id: "author".to_string(),
                    created_at: Utc::now(),
                    engagement: EngagementCounts::default(),
                    hashtags: vec![],
                    geo: None,
                })
                .collect())
        }

        fn source(&self) -> SourceTag {
            self.tag
        }
    }

    struct FailingSource;

    #[async_trait]
    impl CandidateSource for FailingSource {
        async fn fetch(
            &self,
            _user_id: &str,
            _profile: Option<&RankingProfile>,
            _request: &SourceRequest,
        ) -> anyhow::Result<Vec<ContentCandidate>> {
            anyhow::bail!("origin unavailable")
        }

        fn source(&self) -> SourceTag {
            SourceTag::Trending
        }
    }

    struct SlowSource;

    #[async_trait]
    impl CandidateSource for SlowSource {
        async fn fetch(
            &self,
            _user_id: &str,
            _profile: Option<&RankingProfile>,
            _request: &SourceRequest,
        ) -> anyhow::Result<Vec<ContentCandidate>> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(vec![])
        }

        fn source(&self) -> SourceTag {
            SourceTag::Recommended
        }
    }

    #[tokio::test]
    async fn test_collect_dedupes_keeping_first_seen_source() {
        let aggregator = CandidateAggregator::new(
            vec![
                Arc::new(StaticSource {
                    tag: SourceTag::Following,
                    ids: vec!["a", "b"],
                }),
                Arc::new(StaticSource {
                    tag: SourceTag::Trending,
                    ids: vec!["b", "c"],
                }),
            ],
            Duration::from_millis(500),
        );

        let result = aggregator
            .collect("u1", None, &SourceRequest::new(FeedType::Home))
            .await;

        assert_eq!(result.candidates.len(), 3);
        let b = result
            .candidates
            .iter()
            .find(|c| c.candidate.id() == "b")
            .unwrap();
        assert_eq!(b.source, SourceTag::Following);
    }

    #[tokio::test]
    async fn test_collect_tolerates_partial_failure() {
        let aggregator = CandidateAggregator::new(
            vec![
                Arc::new(StaticSource {
                    tag: SourceTag::Following,
                    ids: vec!["a"],
                }),
                Arc::new(FailingSource),
            ],
            Duration::from_millis(500),
        );

        let result = aggregator
            .collect("u1", None, &SourceRequest::new(FeedType::Home))
            .await;

        assert_eq!(result.candidates.len(), 1);
        assert_eq!(result.sources_ok, 1);
        assert_eq!(result.sources_failed, 1);
        assert!(!result.all_sources_failed());
    }

    #[tokio::test]
    async fn test_collect_times_out_slow_source() {
        let aggregator = CandidateAggregator::new(
            vec![
                Arc::new(SlowSource),
                Arc::new(StaticSource {
                    tag: SourceTag::Following,
                    ids: vec!["a"],
                }),
            ],
            Duration::from_millis(50),
        );

        let result = aggregator
            .collect("u1", None, &SourceRequest::new(FeedType::Home))
            .await;

        assert_eq!(result.candidates.len(), 1);
        assert_eq!(result.sources_failed, 1);
    }

    #[tokio::test]
    async fn test_all_sources_failed() {
        let aggregator =
            CandidateAggregator::new(vec![Arc::new(FailingSource)], Duration::from_millis(50));

        let result = aggregator
            .collect("u1", None, &SourceRequest::new(FeedType::Home))
            .await;

        assert!(result.all_sources_failed());
        assert!(result.candidates.is_empty());
    }
}
