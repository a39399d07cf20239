use super::{CandidateSource, ContentClient, SourceRequest};
use crate::models::{ContentCandidate, RankingProfile, SourceTag};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

/// Suggested accounts, wrapped into a single group candidate so the
/// pipeline can place it at its committed slot.
pub struct SuggestedAccountsSource {
    client: Arc<ContentClient>,
    limit: u32,
}

impl SuggestedAccountsSource {
    pub fn new(client: Arc<ContentClient>, limit: u32) -> Self {
        Self { client, limit }
    }
}

#[async_trait]
impl CandidateSource for SuggestedAccountsSource {
    async fn fetch(
        &self,
        user_id: &str,
        _profile: Option<&RankingProfile>,
        _request: &SourceRequest,
    ) -> anyhow::Result<Vec<ContentCandidate>> {
        let accounts = self.client.suggested_accounts(user_id, self.limit).await?;
        if accounts.is_empty() {
            return Ok(vec![]);
        }
        Ok(vec![ContentCandidate::SuggestedAccounts {
            id: format!("suggested:{}", user_id),
            accounts,
            created_at: Utc::now(),
        }])
    }

    fn source(&self) -> SourceTag {
        SourceTag::SuggestedUsers
    }
}
