use super::{CandidateSource, ContentClient, SourceRequest};
use crate::models::{ContentCandidate, RankingProfile, SourceTag};
use async_trait::async_trait;
use std::sync::Arc;

/// Relationship-based recommendations from the content collaborator.
pub struct RecommendedSource {
    client: Arc<ContentClient>,
}

impl RecommendedSource {
    pub fn new(client: Arc<ContentClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CandidateSource for RecommendedSource {
    async fn fetch(
        &self,
        user_id: &str,
        profile: Option<&RankingProfile>,
        _request: &SourceRequest,
    ) -> anyhow::Result<Vec<ContentCandidate>> {
        self.client.recommended_content(user_id, profile).await
    }

    fn source(&self) -> SourceTag {
        SourceTag::Recommended
    }
}
