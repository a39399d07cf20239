use super::{CandidateSource, ContentClient, SourceRequest};
use crate::models::{ContentCandidate, RankingProfile, SourceTag};
use async_trait::async_trait;
use std::sync::Arc;

/// Sponsored placements; bounded by the configured per-page limit.
pub struct SponsoredSource {
    client: Arc<ContentClient>,
    limit: u32,
}

impl SponsoredSource {
    pub fn new(client: Arc<ContentClient>, limit: u32) -> Self {
        Self { client, limit }
    }
}

#[async_trait]
impl CandidateSource for SponsoredSource {
    async fn fetch(
        &self,
        user_id: &str,
        _profile: Option<&RankingProfile>,
        _request: &SourceRequest,
    ) -> anyhow::Result<Vec<ContentCandidate>> {
        self.client.sponsored_content(user_id, self.limit).await
    }

    fn source(&self) -> SourceTag {
        SourceTag::Sponsored
    }
}
