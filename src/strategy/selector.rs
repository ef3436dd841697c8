//! Pick selection: ranking, strong/medium tiers and the top-K cap.
//!
//! 1. Rank by score descending, symbol ascending on ties.
//! 2. If any asset reaches the strong threshold, the first K of those are
//!    the picks and the medium tier is never consulted.
//! 3. Otherwise walk the medium tier in rank order and admit only assets
//!    with real on-chain presence, up to K.
//! 4. An empty selection is a valid outcome.

use std::collections::HashMap;
use std::fmt;

use crate::config::SelectionConfig;
use crate::types::ScoredAsset;

/// Which tier produced a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Strong,
    Medium,
    Empty,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Strong => write!(f, "strong"),
            Tier::Medium => write!(f, "medium"),
            Tier::Empty => write!(f, "none"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Selection {
    pub tier: Tier,
    pub picks: Vec<ScoredAsset>,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.picks.is_empty()
    }
}

pub struct Selector {
    config: SelectionConfig,
}

impl Selector {
    pub fn new(config: SelectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SelectionConfig {
        &self.config
    }

    /// Collapse duplicate symbols to their best-scoring entry and sort.
    pub fn rank(scored: &[ScoredAsset]) -> Vec<ScoredAsset> {
        let mut best: HashMap<&str, &ScoredAsset> = HashMap::new();
        for asset in scored {
            best.entry(asset.symbol.as_str())
                .and_modify(|cur| {
                    if asset.score > cur.score {
                        *cur = asset;
                    }
                })
                .or_insert(asset);
        }

        let mut ranked: Vec<ScoredAsset> = best.into_values().cloned().collect();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.symbol.cmp(&b.symbol)));
        ranked
    }

    pub fn select(&self, scored: &[ScoredAsset]) -> Selection {
        let ranked = Self::rank(scored);
        let k = self.config.top_k;
        let strong = self.config.strong_threshold;
        let medium = self.config.medium_threshold;

        let strong_picks: Vec<ScoredAsset> = ranked
            .iter()
            .filter(|a| a.score >= strong)
            .take(k)
            .cloned()
            .collect();
        if !strong_picks.is_empty() {
            return Selection {
                tier: Tier::Strong,
                picks: strong_picks,
            };
        }

        let medium_picks: Vec<ScoredAsset> = ranked
            .iter()
            .filter(|a| a.score >= medium && a.score < strong)
            .filter(|a| a.is_real_presence())
            .take(k)
            .cloned()
            .collect();
        if !medium_picks.is_empty() {
            return Selection {
                tier: Tier::Medium,
                picks: medium_picks,
            };
        }

        Selection {
            tier: Tier::Empty,
            picks: Vec::new(),
        }
    }
}

impl Default for Selector {
    fn default() -> Self {
        Self::new(SelectionConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
