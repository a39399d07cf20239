//! Request-time contextual boosts over the diversified list.
//!
//! Stateless per request: reads the context and profile, writes
//! nothing. Boosts are additive on the composite score; the list is
//! re-sorted (stable) afterwards.

use crate::config::{RankingConfig, RealtimeBoosts};
use crate::models::{ContentType, DeviceClass, RankingProfile, RequestContext, ScoredCandidate};

pub struct RealtimeAdapter {
    boosts: RealtimeBoosts,
}

impl RealtimeAdapter {
    pub fn new(cfg: &RankingConfig) -> Self {
        Self { boosts: cfg.boosts }
    }

    pub fn apply(
        &self,
        mut scored: Vec<ScoredCandidate>,
        ctx: &RequestContext,
        profile: Option<&RankingProfile>,
    ) -> Vec<ScoredCandidate> {
        let in_optimal_window = profile
            .map(|p| p.optimal_hours.contains(&ctx.hour))
            .unwrap_or(false);

        for item in &mut scored {
            let mut boost = 0.0;

            if in_optimal_window {
                boost += self.boosts.optimal_hour;
            }

            if item.candidate.content_type() == ContentType::Reel
                && ctx.device == DeviceClass::Mobile
            {
                boost += self.boosts.short_form_mobile;
            }

            if let (Some(user_geo), Some(content_geo)) = (ctx.geo.as_ref(), item.candidate.geo()) {
                if user_geo.distance_km(content_geo) <= self.boosts.nearby_radius_km {
                    boost += self.boosts.nearby;
                }
            }

            item.score += boost;
        }

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RankingConfig;
    use crate::models::{
        ContentCandidate, EngagementCounts, GeoPoint, ScoreBreakdown, SourceTag,
    };
    use chrono::Utc;

    fn adapter() -> RealtimeAdapter {
        RealtimeAdapter::new(&RankingConfig::default())
    }

    fn ctx(device: DeviceClass, geo: Option<GeoPoint>) -> RequestContext {
        RequestContext {
            hour: 20,
            device,
            geo,
        }
    }

    fn scored_post(id: &str, score: f64, geo: Option<GeoPoint>) -> ScoredCandidate {
        ScoredCandidate {
            candidate: ContentCandidate::Post {
                id: id.to_string(),
                author_id: "a".to_string(),
                created_at: Utc::now(),
                engagement: EngagementCounts::default(),
                hashtags: vec![],
                geo,
            },
            source: SourceTag::Following,
            score,
            breakdown: ScoreBreakdown::default(),
        }
    }

    fn scored_reel(id: &str, score: f64) -> ScoredCandidate {
        ScoredCandidate {
            candidate: ContentCandidate::Reel {
                id: id.to_string(),
                author_id: "a".to_string(),
                created_at: Utc::now(),
                engagement: EngagementCounts::default(),
                hashtags: vec![],
                geo: None,
                duration_secs: 15,
            },
            source: SourceTag::Trending,
            score,
            breakdown: ScoreBreakdown::default(),
        }
    }

    #[test]
    fn test_reel_boosted_on_mobile() {
        let items = vec![scored_post("post", 0.50, None), scored_reel("reel", 0.40)];
        let boosted = adapter().apply(items, &ctx(DeviceClass::Mobile, None), None);
        // 0.40 + 0.15 > 0.50
        assert_eq!(boosted[0].candidate.id(), "reel");
    }

    #[test]
    fn test_reel_not_boosted_on_desktop() {
        let items = vec![scored_post("post", 0.50, None), scored_reel("reel", 0.40)];
        let boosted = adapter().apply(items, &ctx(DeviceClass::Desktop, None), None);
        assert_eq!(boosted[0].candidate.id(), "post");
    }

    #[test]
    fn test_nearby_content_boosted() {
        let user_geo = GeoPoint { lat: 40.7128, lon: -74.0060 };
        let near = GeoPoint { lat: 40.73, lon: -74.00 };
        let far = GeoPoint { lat: 34.05, lon: -118.24 };

        let items = vec![
            scored_post("far", 0.50, Some(far)),
            scored_post("near", 0.45, Some(near)),
        ];
        let boosted = adapter().apply(items, &ctx(DeviceClass::Desktop, Some(user_geo)), None);
        assert_eq!(boosted[0].candidate.id(), "near");
        assert!((boosted[0].score - 0.65).abs() < 1e-9);
    }

    #[test]
    fn test_optimal_hour_boost_requires_profile_window() {
        let mut profile = RankingProfile::new("u1");
        profile.optimal_hours = vec![19, 20, 21];

        let items = vec![scored_post("p", 0.5, None)];
        let boosted = adapter().apply(items, &ctx(DeviceClass::Desktop, None), Some(&profile));
        assert!((boosted[0].score - 0.6).abs() < 1e-9);

        let items = vec![scored_post("p", 0.5, None)];
        let unboosted = adapter().apply(items, &ctx(DeviceClass::Desktop, None), None);
        assert!((unboosted[0].score - 0.5).abs() < 1e-9);
    }
}
