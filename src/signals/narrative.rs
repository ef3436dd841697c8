//! Narrative tagging by keyword matching.
//!
//! Maps free text (asset name + description) onto the fixed narrative
//! taxonomy. Text and keywords are folded the same way (lower-cased,
//! punctuation becomes whitespace), so any keyword that is a substring of
//! the lower-cased text still matches. The text is also padded with a space
//! on each side, so keywords written as `" ai "` match whole words.

use crate::types::{Narrative, NarrativeTags};

/// Narrative strength per matched tag.
pub const DEFAULT_WEIGHT_PER_TAG: f64 = 0.2;

/// Category → keyword list, in taxonomy order.
pub type Taxonomy = Vec<(Narrative, Vec<String>)>;

const DEFAULT_KEYWORDS: &[(Narrative, &[&str])] = &[
    (
        Narrative::Ai,
        &[" ai ", "artificial intelligence", "agent", "neural", "gpt", "machine learning", "inference"],
    ),
    (
        Narrative::Defi,
        &["defi", "swap", "lending", "yield", " dex ", "liquidity", "staking", "perpetual"],
    ),
    (
        Narrative::Gaming,
        &["game", "gaming", "metaverse", "play to earn", "gamefi", " nft"],
    ),
    (
        Narrative::Rwa,
        &["rwa", "real world asset", "tokenized", "treasury", "real estate"],
    ),
    (
        Narrative::Infra,
        &["infrastructure", "protocol", "oracle", "storage", "compute", "depin", "middleware"],
    ),
    (
        Narrative::Layer2,
        &["layer 2", "layer2", " l2 ", "rollup", " zk", "optimistic", "scaling"],
    ),
    (
        Narrative::Meme,
        &["meme", "doge", "shib", "pepe", " inu ", " frog", " cat "],
    ),
    (
        Narrative::Social,
        &["social", "creator", "community", "messaging", "fan token"],
    ),
];

/// The built-in taxonomy.
pub fn default_taxonomy() -> Taxonomy {
    DEFAULT_KEYWORDS
        .iter()
        .map(|(n, kws)| (*n, kws.iter().map(|k| k.to_string()).collect()))
        .collect()
}

fn fold(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect()
}

fn normalise(text: &str) -> String {
    format!(" {} ", fold(text))
}

/// Keyword-based narrative tagger. Deterministic, no external calls.
#[derive(Debug, Clone)]
pub struct NarrativeTagger {
    taxonomy: Taxonomy,
    weight_per_tag: f64,
}

impl NarrativeTagger {
    pub fn new(weight_per_tag: f64) -> Self {
        Self::with_taxonomy(default_taxonomy(), weight_per_tag)
    }

    pub fn with_taxonomy(taxonomy: Taxonomy, weight_per_tag: f64) -> Self {
        let taxonomy = taxonomy
            .into_iter()
            .map(|(n, kws)| (n, kws.iter().map(|k| fold(k)).filter(|k| !k.trim().is_empty()).collect()))
            .collect();
        Self {
            taxonomy,
            weight_per_tag,
        }
    }

    /// Tag a text. One tag per category; the first matching keyword wins.
    pub fn tag(&self, text: &str) -> NarrativeTags {
        let text = normalise(text);
        NarrativeTags::new(
            self.taxonomy
                .iter()
                .filter(|(_, kws)| kws.iter().any(|k| text.contains(k.as_str())))
                .map(|(n, _)| *n),
        )
    }

    /// `min(1.0, weight_per_tag × tag_count)`.
    pub fn strength(&self, tags: &NarrativeTags) -> f64 {
        (self.weight_per_tag * tags.len() as f64).min(1.0)
    }

    pub fn tag_with_strength(&self, text: &str) -> (NarrativeTags, f64) {
        let tags = self.tag(text);
        let strength = self.strength(&tags);
        (tags, strength)
    }

    /// Count keyword mentions per narrative across a batch of texts and
    /// return the `top_n` narratives with at least one mention, most
    /// mentioned first (taxonomy order breaks ties).
    pub fn rank_mentions<S: AsRef<str>>(&self, texts: &[S], top_n: usize) -> Vec<(Narrative, usize)> {
        let corpus: Vec<String> = texts.iter().map(|t| normalise(t.as_ref())).collect();

        let mut counts: Vec<(Narrative, usize)> = self
            .taxonomy
            .iter()
            .map(|(n, kws)| {
                let hits = corpus
                    .iter()
                    .map(|t| kws.iter().map(|k| t.matches(k.as_str()).count()).sum::<usize>())
                    .sum();
                (*n, hits)
            })
            .filter(|(_, c)| *c > 0)
            .collect();

        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts.truncate(top_n);
        counts
    }
}

impl Default for NarrativeTagger {
    fn default() -> Self {
        Self::new(DEFAULT_WEIGHT_PER_TAG)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
