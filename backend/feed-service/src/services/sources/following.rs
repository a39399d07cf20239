use super::{CandidateSource, ContentClient, SourceRequest};
use crate::models::{ContentCandidate, RankingProfile, SourceTag};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::Arc;

/// Content from accounts the user follows, bounded to a recent window.
pub struct FollowingSource {
    client: Arc<ContentClient>,
    lookback_hours: i64,
}

impl FollowingSource {
    pub fn new(client: Arc<ContentClient>) -> Self {
        Self {
            client,
            lookback_hours: 24,
        }
    }
}

#[async_trait]
impl CandidateSource for FollowingSource {
    async fn fetch(
        &self,
        user_id: &str,
        _profile: Option<&RankingProfile>,
        _request: &SourceRequest,
    ) -> anyhow::Result<Vec<ContentCandidate>> {
        let since = Utc::now() - Duration::hours(self.lookback_hours);
        self.client.following_content(user_id, since).await
    }

    fn source(&self) -> SourceTag {
        SourceTag::Following
    }
}
