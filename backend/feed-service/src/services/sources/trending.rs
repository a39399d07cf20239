use super::{CandidateSource, ContentClient, SourceRequest};
use crate::models::{ContentCandidate, RankingProfile, SourceTag};
use async_trait::async_trait;
use std::sync::Arc;

const TOPIC_LIMIT: usize = 5;

/// Trending content, narrowed to the user's top interests or to an
/// explicit explore category.
pub struct TrendingSource {
    client: Arc<ContentClient>,
}

impl TrendingSource {
    pub fn new(client: Arc<ContentClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CandidateSource for TrendingSource {
    async fn fetch(
        &self,
        _user_id: &str,
        profile: Option<&RankingProfile>,
        request: &SourceRequest,
    ) -> anyhow::Result<Vec<ContentCandidate>> {
        let topics = match &request.category {
            Some(category) => vec![category.clone()],
            None => profile
                .map(|p| p.top_interests(TOPIC_LIMIT))
                .unwrap_or_default(),
        };
        self.client.trending_content(&topics).await
    }

    fn source(&self) -> SourceTag {
        SourceTag::Trending
    }
}
