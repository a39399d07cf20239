//! Greedy diversification over the score-sorted candidate list.
//!
//! A single pass selects up to `pool_budget` items, skipping any that
//! would push a content type past `max_per_type` or an author past
//! `max_per_author`. Intentionally a greedy heuristic, not an optimal
//! assignment; ties break by input order so output is deterministic.
//!
//! When the strict pass cannot fill the budget, caps are relaxed in a
//! fixed order: content-type cap first, then the author cap.

use crate::config::RankingConfig;
use crate::models::{ContentType, ScoredCandidate};
use std::collections::HashMap;
use tracing::debug;

/// Diversifier output. Items admitted by the strict pass come first;
/// cap-relaxed items follow and must never be reordered above them.
#[derive(Debug)]
pub struct DiversifiedSelection {
    pub items: Vec<ScoredCandidate>,
    /// Length of the strict (cap-honoring) prefix of `items`
    pub strict_len: usize,
}

pub struct Diversifier {
    pool_budget: usize,
    max_per_type: usize,
    max_per_author: usize,
}

impl Diversifier {
    pub fn new(cfg: &RankingConfig) -> Self {
        Self {
            pool_budget: cfg.pool_budget,
            max_per_type: cfg.max_per_type,
            max_per_author: cfg.max_per_author,
        }
    }

    /// Select a balanced subset of the score-descending input.
    pub fn select(&self, ranked: Vec<ScoredCandidate>) -> DiversifiedSelection {
        let mut type_count: HashMap<ContentType, usize> = HashMap::new();
        let mut author_count: HashMap<String, usize> = HashMap::new();
        let mut selected: Vec<ScoredCandidate> = Vec::new();
        let mut remaining: Vec<ScoredCandidate> = Vec::new();

        // Strict pass: both caps enforced
        for candidate in ranked {
            if selected.len() >= self.pool_budget {
                break;
            }
            let content_type = candidate.candidate.content_type();
            let author = candidate.candidate.author_id().map(String::from);

            let type_full = type_count.get(&content_type).copied().unwrap_or(0) >= self.max_per_type;
            let author_full = author
                .as_deref()
                .map(|a| author_count.get(a).copied().unwrap_or(0) >= self.max_per_author)
                .unwrap_or(false);

            if type_full || author_full {
                remaining.push(candidate);
                continue;
            }

            *type_count.entry(content_type).or_insert(0) += 1;
            if let Some(author) = author {
                *author_count.entry(author).or_insert(0) += 1;
            }
            selected.push(candidate);
        }

        let strict_len = selected.len();

        // Relaxation, only when the pool cannot fill the budget under
        // the caps: content-type cap first, then the author cap.
        if selected.len() < self.pool_budget && !remaining.is_empty() {
            let mut still_out: Vec<ScoredCandidate> = Vec::new();
            for candidate in remaining {
                if selected.len() >= self.pool_budget {
                    still_out.push(candidate);
                    continue;
                }
                let author_full = candidate
                    .candidate
                    .author_id()
                    .map(|a| author_count.get(a).copied().unwrap_or(0) >= self.max_per_author)
                    .unwrap_or(false);
                if author_full {
                    still_out.push(candidate);
                    continue;
                }
                if let Some(author) = candidate.candidate.author_id() {
                    *author_count.entry(author.to_string()).or_insert(0) += 1;
                }
                selected.push(candidate);
            }

            for candidate in still_out {
                if selected.len() >= self.pool_budget {
                    break;
                }
                selected.push(candidate);
            }
        }

        debug!(
            selected = selected.len(),
            strict = strict_len,
            budget = self.pool_budget,
            "diversification complete"
        );
        DiversifiedSelection {
            items: selected,
            strict_len,
        }
    }
}
