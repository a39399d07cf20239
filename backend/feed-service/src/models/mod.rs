use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Origin of a candidate within the aggregation fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTag {
    Following,
    Recommended,
    Trending,
    Sponsored,
    SuggestedUsers,
}

impl SourceTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTag::Following => "following",
            SourceTag::Recommended => "recommended",
            SourceTag::Trending => "trending",
            SourceTag::Sponsored => "sponsored",
            SourceTag::SuggestedUsers => "suggested_users",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Post,
    Reel,
    Sponsored,
    SuggestedAccounts,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Post => "post",
            ContentType::Reel => "reel",
            ContentType::Sponsored => "sponsored",
            ContentType::SuggestedAccounts => "suggested_accounts",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "post" => Some(ContentType::Post),
            "reel" => Some(ContentType::Reel),
            "sponsored" => Some(ContentType::Sponsored),
            "suggested_accounts" => Some(ContentType::SuggestedAccounts),
            _ => None,
        }
    }
}

/// Raw engagement counters as fetched from a content origin.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct EngagementCounts {
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub comments: u64,
    #[serde(default)]
    pub shares: u64,
    #[serde(default)]
    pub views: u64,
}

impl EngagementCounts {
    /// Weighted engagement rate, clipped to [0, 1].
    ///
    /// Zero views means zero engagement; the rate is always finite.
    pub fn rate(&self) -> f64 {
        if self.views == 0 {
            return 0.0;
        }
        let weighted = self.likes as f64 + 2.0 * self.comments as f64 + 3.0 * self.shares as f64;
        (weighted / self.views as f64).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    /// Great-circle distance in kilometers (haversine).
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        const EARTH_RADIUS_KM: f64 = 6371.0;
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lon = (other.lon - self.lon).to_radians();
        let a = (d_lat / 2.0).sin().powi(2)
            + self.lat.to_radians().cos() * other.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub user_id: String,
    pub username: String,
    #[serde(default)]
    pub follower_count: u64,
}

/// A content or account item eligible for inclusion in a feed page,
/// before scoring. Immutable once fetched within one generation pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentCandidate {
    Post {
        id: String,
        author_id: String,
        created_at: DateTime<Utc>,
        #[serde(default)]
        engagement: EngagementCounts,
        #[serde(default)]
        hashtags: Vec<String>,
        #[serde(default)]
        geo: Option<GeoPoint>,
    },
    Reel {
        id: String,
        author_id: String,
        created_at: DateTime<Utc>,
        #[serde(default)]
        engagement: EngagementCounts,
        #[serde(default)]
        hashtags: Vec<String>,
        #[serde(default)]
        geo: Option<GeoPoint>,
        #[serde(default)]
        duration_secs: u32,
    },
    Sponsored {
        id: String,
        advertiser_id: String,
        created_at: DateTime<Utc>,
        #[serde(default)]
        engagement: EngagementCounts,
        #[serde(default)]
        hashtags: Vec<String>,
    },
    SuggestedAccounts {
        id: String,
        accounts: Vec<AccountSummary>,
        created_at: DateTime<Utc>,
    },
}

const NO_TAGS: &[String] = &[];

impl ContentCandidate {
    pub fn id(&self) -> &str {
        match self {
            ContentCandidate::Post { id, .. }
            | ContentCandidate::Reel { id, .. }
            | ContentCandidate::Sponsored { id, .. }
            | ContentCandidate::SuggestedAccounts { id, .. } => id,
        }
    }

    /// Author identity used for relationship scoring and the per-author
    /// diversity cap. Suggested-account groups have no single author.
    pub fn author_id(&self) -> Option<&str> {
        match self {
            ContentCandidate::Post { author_id, .. }
            | ContentCandidate::Reel { author_id, .. } => Some(author_id),
            ContentCandidate::Sponsored { advertiser_id, .. } => Some(advertiser_id),
            ContentCandidate::SuggestedAccounts { .. } => None,
        }
    }

    pub fn content_type(&self) -> ContentType {
        match self {
            ContentCandidate::Post { .. } => ContentType::Post,
            ContentCandidate::Reel { .. } => ContentType::Reel,
            ContentCandidate::Sponsored { .. } => ContentType::Sponsored,
            ContentCandidate::SuggestedAccounts { .. } => ContentType::SuggestedAccounts,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            ContentCandidate::Post { created_at, .. }
            | ContentCandidate::Reel { created_at, .. }
            | ContentCandidate::Sponsored { created_at, .. }
            | ContentCandidate::SuggestedAccounts { created_at, .. } => *created_at,
        }
    }

    pub fn engagement(&self) -> Option<&EngagementCounts> {
        match self {
            ContentCandidate::Post { engagement, .. }
            | ContentCandidate::Reel { engagement, .. }
            | ContentCandidate::Sponsored { engagement, .. } => Some(engagement),
            ContentCandidate::SuggestedAccounts { .. } => None,
        }
    }

    pub fn hashtags(&self) -> &[String] {
        match self {
            ContentCandidate::Post { hashtags, .. }
            | ContentCandidate::Reel { hashtags, .. }
            | ContentCandidate::Sponsored { hashtags, .. } => hashtags,
            ContentCandidate::SuggestedAccounts { .. } => NO_TAGS,
        }
    }

    pub fn geo(&self) -> Option<&GeoPoint> {
        match self {
            ContentCandidate::Post { geo, .. } | ContentCandidate::Reel { geo, .. } => geo.as_ref(),
            _ => None,
        }
    }
}

/// Candidate annotated with the source that produced it.
#[derive(Debug, Clone)]
pub struct SourcedCandidate {
    pub candidate: ContentCandidate,
    pub source: SourceTag,
}

/// The five weighted sub-scores behind a composite score.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub relevance: f64,
    pub recency: f64,
    pub engagement: f64,
    pub relationship: f64,
    pub diversity: f64,
}

/// Candidate plus its composite score. Lives only for the duration of
/// one request; never persisted.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub candidate: ContentCandidate,
    pub source: SourceTag,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

/// Rolling engagement-rate statistics, updated incrementally.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementRates {
    pub like_rate: f64,
    pub comment_rate: f64,
    pub share_rate: f64,
    pub skip_rate: f64,
    pub events: u64,
}

/// Per-user ranking signals derived from the signal store.
///
/// Mutated only by the feedback recorder and the affinity refresh job;
/// read-only to the scoring engine. Ages out via the store's TTL.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingProfile {
    pub user_id: String,
    #[serde(default)]
    pub content_type_weights: HashMap<String, f64>,
    #[serde(default)]
    pub topic_interests: HashMap<String, f64>,
    #[serde(default)]
    pub author_affinity: HashMap<String, f64>,
    #[serde(default)]
    pub engagement_rates: EngagementRates,
    #[serde(default)]
    pub optimal_hours: Vec<u32>,
    /// Default feed algorithm chosen via preferences
    #[serde(default)]
    pub preferred_algorithm: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl RankingProfile {
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            content_type_weights: HashMap::new(),
            topic_interests: HashMap::new(),
            author_affinity: HashMap::new(),
            engagement_rates: EngagementRates::default(),
            optimal_hours: Vec::new(),
            preferred_algorithm: None,
            updated_at: Utc::now(),
        }
    }

    /// Top interest topics by affinity, highest first. Ties break on
    /// topic name so the ordering is stable across runs.
    pub fn top_interests(&self, limit: usize) -> Vec<String> {
        let mut topics: Vec<(&String, &f64)> = self.topic_interests.iter().collect();
        topics.sort_by(|a, b| {
            b.1.partial_cmp(a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });
        topics.into_iter().take(limit).map(|(t, _)| t.clone()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementAction {
    View,
    Like,
    Comment,
    Share,
    Save,
    Skip,
    Hide,
}

impl EngagementAction {
    /// Signed weight applied to the signal-store counter.
    pub fn signal_weight(&self) -> f64 {
        match self {
            EngagementAction::View => 1.0,
            EngagementAction::Like => 5.0,
            EngagementAction::Comment => 10.0,
            EngagementAction::Share => 15.0,
            EngagementAction::Save => 12.0,
            EngagementAction::Skip => -2.0,
            EngagementAction::Hide => -10.0,
        }
    }

    /// Delta applied to author/topic affinities, scaled so that
    /// affinities stay in [0, 1] over a realistic interaction history.
    pub fn affinity_delta(&self) -> f64 {
        self.signal_weight() / 100.0
    }

    pub fn is_negative(&self) -> bool {
        self.signal_weight() < 0.0
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "view" => Some(EngagementAction::View),
            "like" => Some(EngagementAction::Like),
            "comment" => Some(EngagementAction::Comment),
            "share" => Some(EngagementAction::Share),
            "save" => Some(EngagementAction::Save),
            "skip" => Some(EngagementAction::Skip),
            "hide" => Some(EngagementAction::Hide),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EngagementAction::View => "view",
            EngagementAction::Like => "like",
            EngagementAction::Comment => "comment",
            EngagementAction::Share => "share",
            EngagementAction::Save => "save",
            EngagementAction::Skip => "skip",
            EngagementAction::Hide => "hide",
        }
    }
}

/// Client-supplied hints accompanying an engagement event, used for
/// direct affinity updates without a content lookup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementContext {
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub content_type: Option<ContentType>,
}

/// One user action against a content item. Immutable; consumed once by
/// the feedback recorder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementEvent {
    /// Delivery id, for log correlation only
    #[serde(default)]
    pub event_id: String,
    pub user_id: String,
    pub content_id: String,
    pub action: EngagementAction,
    pub occurred_at: DateTime<Utc>,
    #[serde(default)]
    pub duration_ms: Option<u32>,
    #[serde(default)]
    pub context: Option<EngagementContext>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    Mobile,
    Desktop,
    Tablet,
    Unknown,
}

impl DeviceClass {
    pub fn parse(s: &str) -> Self {
        match s {
            "mobile" => DeviceClass::Mobile,
            "desktop" => DeviceClass::Desktop,
            "tablet" => DeviceClass::Tablet,
            _ => DeviceClass::Unknown,
        }
    }
}

/// Request-time context consumed by the real-time adapter.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext {
    pub hour: u32,
    pub device: DeviceClass,
    pub geo: Option<GeoPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedType {
    Home,
    Explore,
    Reels,
}

impl FeedType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedType::Home => "home",
            FeedType::Explore => "explore",
            FeedType::Reels => "reels",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Ranked,
    Recent,
}

impl Algorithm {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ranked" => Some(Algorithm::Ranked),
            "recent" => Some(Algorithm::Recent),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Ranked => "ranked",
            Algorithm::Recent => "recent",
        }
    }
}

/// One item of a returned feed page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    pub id: String,
    pub source: SourceTag,
    pub content_type: ContentType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
    pub created_at: i64,
    /// Present only for suggested-account groups
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accounts: Option<Vec<AccountSummary>>,
}

impl From<&ScoredCandidate> for FeedItem {
    fn from(scored: &ScoredCandidate) -> Self {
        let accounts = match &scored.candidate {
            ContentCandidate::SuggestedAccounts { accounts, .. } => Some(accounts.clone()),
            _ => None,
        };
        FeedItem {
            id: scored.candidate.id().to_string(),
            source: scored.source,
            content_type: scored.candidate.content_type(),
            author_id: scored.candidate.author_id().map(String::from),
            score: scored.score,
            breakdown: scored.breakdown,
            created_at: scored.candidate.created_at().timestamp(),
            accounts,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub has_more: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedMetadata {
    pub algorithm: String,
    pub generated_at: DateTime<Utc>,
    pub cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

/// An ordered, paginated feed result. Never mutated after creation; a
/// refresh produces a new page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPage {
    pub items: Vec<FeedItem>,
    pub pagination: Pagination,
    pub metadata: FeedMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engagement_rate_zero_views_is_finite() {
        let counts = EngagementCounts {
            likes: 10,
            comments: 5,
            shares: 2,
            views: 0,
        };
        let rate = counts.rate();
        assert!(rate.is_finite());
        assert_eq!(rate, 0.0);
    }

    #[test]
    fn test_engagement_rate_weighting() {
        let counts = EngagementCounts {
            likes: 10,
            comments: 10,
            shares: 10,
            views: 100,
        };
        // (10 + 20 + 30) / 100
        assert!((counts.rate() - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_engagement_rate_clipped() {
        let counts = EngagementCounts {
            likes: 500,
            comments: 0,
            shares: 0,
            views: 10,
        };
        assert_eq!(counts.rate(), 1.0);
    }

    #[test]
    fn test_signal_weights() {
        assert_eq!(EngagementAction::View.signal_weight(), 1.0);
        assert_eq!(EngagementAction::Like.signal_weight(), 5.0);
        assert_eq!(EngagementAction::Comment.signal_weight(), 10.0);
        assert_eq!(EngagementAction::Share.signal_weight(), 15.0);
        assert_eq!(EngagementAction::Save.signal_weight(), 12.0);
        assert_eq!(EngagementAction::Skip.signal_weight(), -2.0);
        assert_eq!(EngagementAction::Hide.signal_weight(), -10.0);
        assert!(EngagementAction::Hide.is_negative());
        assert!(!EngagementAction::Save.is_negative());
    }

    #[test]
    fn test_candidate_union_accessors() {
        let post = ContentCandidate::Post {
            id: "p1".into(),
            author_id: "a1".into(),
            created_at: Utc::now(),
            engagement: EngagementCounts::default(),
            hashtags: vec!["rust".into()],
            geo: None,
        };
        assert_eq!(post.id(), "p1");
        assert_eq!(post.author_id(), Some("a1"));
        assert_eq!(post.content_type(), ContentType::Post);
        assert_eq!(post.hashtags(), ["rust".to_string()]);

        let group = ContentCandidate::SuggestedAccounts {
            id: "sug:u1".into(),
            accounts: vec![],
            created_at: Utc::now(),
        };
        assert_eq!(group.author_id(), None);
        assert!(group.engagement().is_none());
        assert!(group.hashtags().is_empty());
    }

    #[test]
    fn test_geo_distance() {
        let paris = GeoPoint { lat: 48.8566, lon: 2.3522 };
        let london = GeoPoint { lat: 51.5074, lon: -0.1278 };
        let d = paris.distance_km(&london);
        assert!(d > 300.0 && d < 400.0, "unexpected distance {}", d);
        assert!(paris.distance_km(&paris) < 1e-6);
    }

    #[test]
    fn test_top_interests_stable_order() {
        let mut profile = RankingProfile::new("u1");
        profile.topic_interests.insert("rust".into(), 0.9);
        profile.topic_interests.insert("music".into(), 0.9);
        profile.topic_interests.insert("food".into(), 0.2);

        let top = profile.top_interests(2);
        // Equal affinities fall back to name order
        assert_eq!(top, vec!["music".to_string(), "rust".to_string()]);
    }

    #[test]
    fn test_candidate_serde_tagged() {
        let json = r#"{"kind":"reel","id":"r1","author_id":"a2","created_at":"2026-01-01T00:00:00Z","duration_secs":30}"#;
        let candidate: ContentCandidate = serde_json::from_str(json).unwrap();
        assert_eq!(candidate.content_type(), ContentType::Reel);
        assert_eq!(candidate.engagement().unwrap().views, 0);
    }
}
