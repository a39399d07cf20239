//! HTTP client for the content/identity collaborators.
//!
//! Every call is independently time-boxed via the reqwest client
//! timeout; callers above the aggregator never see these errors.

use crate::config::SourcesConfig;
use crate::models::{AccountSummary, ContentCandidate, RankingProfile};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecommendedRequest<'a> {
    user_id: &'a str,
    interests: Vec<String>,
}

pub struct ContentClient {
    http: reqwest::Client,
    base_url: String,
}

impl ContentClient {
    pub fn new(cfg: &SourcesConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .context("failed to build content HTTP client")?;

        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Posts and reels from accounts the user follows, newer than `since`.
    pub async fn following_content(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<ContentCandidate>> {
        let url = format!("{}/content/following", self.base_url);
        let items = self
            .http
            .get(&url)
            .query(&[("userId", user_id.to_string()), ("since", since.to_rfc3339())])
            .send()
            .await
            .context("following content request failed")?
            .error_for_status()
            .context("following content returned error status")?
            .json()
            .await
            .context("following content response was not valid JSON")?;
        Ok(items)
    }

    /// Relationship-based recommendations, personalized by the caller's
    /// current interests when a profile is available.
    pub async fn recommended_content(
        &self,
        user_id: &str,
        profile: Option<&RankingProfile>,
    ) -> Result<Vec<ContentCandidate>> {
        let url = format!("{}/content/recommended", self.base_url);
        let interests = profile.map(|p| p.top_interests(10)).unwrap_or_default();
        let items = self
            .http
            .post(&url)
            .json(&RecommendedRequest { user_id, interests })
            .send()
            .await
            .context("recommended content request failed")?
            .error_for_status()
            .context("recommended content returned error status")?
            .json()
            .await
            .context("recommended content response was not valid JSON")?;
        Ok(items)
    }

    pub async fn trending_content(&self, topics: &[String]) -> Result<Vec<ContentCandidate>> {
        let url = format!("{}/content/trending", self.base_url);
        let items = self
            .http
            .get(&url)
            .query(&[("topics", topics.join(","))])
            .send()
            .await
            .context("trending content request failed")?
            .error_for_status()
            .context("trending content returned error status")?
            .json()
            .await
            .context("trending content response was not valid JSON")?;
        Ok(items)
    }

    pub async fn sponsored_content(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<ContentCandidate>> {
        let url = format!("{}/content/sponsored", self.base_url);
        let items = self
            .http
            .get(&url)
            .query(&[("userId", user_id.to_string()), ("limit", limit.to_string())])
            .send()
            .await
            .context("sponsored content request failed")?
            .error_for_status()
            .context("sponsored content returned error status")?
            .json()
            .await
            .context("sponsored content response was not valid JSON")?;
        Ok(items)
    }

    /// Ids of the accounts the user follows, used for the
    /// followed-author relationship baseline.
    pub async fn following_list(&self, user_id: &str) -> Result<Vec<String>> {
        let url = format!("{}/accounts/following", self.base_url);
        let user_ids = self
            .http
            .get(&url)
            .query(&[("userId", user_id.to_string())])
            .send()
            .await
            .context("following list request failed")?
            .error_for_status()
            .context("following list returned error status")?
            .json()
            .await
            .context("following list response was not valid JSON")?;
        Ok(user_ids)
    }

    pub async fn suggested_accounts(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<AccountSummary>> {
        let url = format!("{}/accounts/suggested", self.base_url);
        let accounts = self
            .http
            .get(&url)
            .query(&[("userId", user_id.to_string()), ("limit", limit.to_string())])
            .send()
            .await
            .context("suggested accounts request failed")?
            .error_for_status()
            .context("suggested accounts returned error status")?
            .json()
            .await
            .context("suggested accounts response was not valid JSON")?;
        Ok(accounts)
    }
}
