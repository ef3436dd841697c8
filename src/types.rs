//! Shared types for the SCOUT scanner.
//!
//! These types form the data model used across all modules.
//! They are kept free of behaviour beyond small derived predicates so
//! that signal, strategy, storage and engine modules can depend on them
//! without circular references.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Market snapshot
// ---------------------------------------------------------------------------

/// One asset's latest market snapshot, produced once per cycle by the
/// market-data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetQuote {
    /// Unique key, always uppercased.
    pub symbol: String,
    pub name: String,
    /// Free-text project description, when the source provides one.
    #[serde(default)]
    pub description: Option<String>,
    /// Price in USD
    pub price: f64,
    pub market_cap: f64,
    pub volume_24h: f64,
}

impl AssetQuote {
    pub fn new(symbol: &str, name: &str, price: f64, market_cap: f64, volume_24h: f64) -> Self {
        Self {
            symbol: symbol.trim().to_uppercase(),
            name: name.to_string(),
            description: None,
            price,
            market_cap,
            volume_24h,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Text the narrative tagger matches against: name plus description.
    pub fn narrative_text(&self) -> String {
        match &self.description {
            Some(d) if !d.is_empty() => format!("{} {}", self.name, d),
            _ => self.name.clone(),
        }
    }

    /// Whether the numeric fields are usable (finite, non-negative).
    pub fn is_valid(&self) -> bool {
        !self.symbol.is_empty()
            && [self.price, self.market_cap, self.volume_24h]
                .iter()
                .all(|v| v.is_finite() && *v >= 0.0)
    }
}

impl fmt::Display for AssetQuote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) ${:.6} | mcap ${:.0} | vol ${:.0}",
            self.symbol, self.name, self.price, self.market_cap, self.volume_24h,
        )
    }
}

/// A single close/volume observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceSample {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
    pub volume: f64,
}

/// Ordered (oldest → newest) price/volume samples for one asset.
///
/// Only used to derive indicators; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub symbol: String,
    pub samples: Vec<PriceSample>,
}

impl PriceSeries {
    pub fn new(symbol: &str, mut samples: Vec<PriceSample>) -> Self {
        samples.sort_by_key(|s| s.timestamp);
        Self {
            symbol: symbol.to_uppercase(),
            samples,
        }
    }

    pub fn closes(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.volume).collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Derived signals
// ---------------------------------------------------------------------------

/// Technical indicators derived from one asset's price series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSet {
    /// 0–100; 50 when the series is too short.
    pub rsi: f64,
    pub ema_fast: f64,
    pub ema_slow: f64,
    pub macd_hist: f64,
    /// Histogram on the sample before the latest one.
    pub macd_hist_prev: f64,
    /// Latest volume divided by the trailing average volume.
    pub volume_ratio: f64,
    pub volume_spike: bool,
    pub last_close: f64,
}

impl IndicatorSet {
    /// Fast EMA above slow EMA with a positive MACD histogram.
    pub fn trend_up(&self) -> bool {
        self.ema_fast > self.ema_slow && self.macd_hist > 0.0
    }

    /// Histogram turned positive on the latest sample.
    pub fn bullish_cross(&self) -> bool {
        self.macd_hist > 0.0 && self.macd_hist_prev <= 0.0
    }
}

/// Narrative categories an asset can be tagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Narrative {
    Ai,
    Defi,
    Gaming,
    Rwa,
    Infra,
    Layer2,
    Meme,
    Social,
}

impl Narrative {
    /// All known narratives, in taxonomy order.
    pub const ALL: &'static [Narrative] = &[
        Narrative::Ai,
        Narrative::Defi,
        Narrative::Gaming,
        Narrative::Rwa,
        Narrative::Infra,
        Narrative::Layer2,
        Narrative::Meme,
        Narrative::Social,
    ];
}

impl fmt::Display for Narrative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Narrative::Ai => write!(f, "AI"),
            Narrative::Defi => write!(f, "DeFi"),
            Narrative::Gaming => write!(f, "Gaming"),
            Narrative::Rwa => write!(f, "RWA"),
            Narrative::Infra => write!(f, "Infra"),
            Narrative::Layer2 => write!(f, "Layer2"),
            Narrative::Meme => write!(f, "Meme"),
            Narrative::Social => write!(f, "Social"),
        }
    }
}

/// Attempt to parse a string into a Narrative (case-insensitive).
impl std::str::FromStr for Narrative {
    type Err = ScoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ai" => Ok(Narrative::Ai),
            "defi" => Ok(Narrative::Defi),
            "gaming" => Ok(Narrative::Gaming),
            "rwa" => Ok(Narrative::Rwa),
            "infra" | "infrastructure" => Ok(Narrative::Infra),
            "layer2" | "l2" => Ok(Narrative::Layer2),
            "meme" => Ok(Narrative::Meme),
            "social" => Ok(Narrative::Social),
            other => Err(ScoutError::Config(format!("unknown narrative: {other}"))),
        }
    }
}

/// Deduplicated set of narrative tags, kept in taxonomy order so that
/// equality does not depend on match order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrativeTags(Vec<Narrative>);

impl NarrativeTags {
    pub fn new(tags: impl IntoIterator<Item = Narrative>) -> Self {
        let mut v: Vec<Narrative> = tags.into_iter().collect();
        v.sort();
        v.dedup();
        Self(v)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, n: Narrative) -> bool {
        self.0.contains(&n)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Narrative> {
        self.0.iter()
    }
}

impl fmt::Display for NarrativeTags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "-");
        }
        let labels: Vec<String> = self.0.iter().map(|n| n.to_string()).collect();
        write!(f, "{}", labels.join(", "))
    }
}

/// On-chain presence of an asset, resolved from the DEX and DeFi datasets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PresenceInfo {
    /// 24h DEX trading volume in USD, if listed.
    pub dex_volume_24h: Option<f64>,
    /// Protocol TVL in USD, if listed.
    pub defi_tvl: Option<f64>,
    /// Additive DEX + DeFi sub-score (not clamped here).
    pub onchain_score: f64,
    pub is_real_presence: bool,
}

// ---------------------------------------------------------------------------
// Scoring output
// ---------------------------------------------------------------------------

/// Component sub-scores, each in [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SubScores {
    pub technical: f64,
    pub narrative: f64,
    pub onchain: f64,
    pub volume: f64,
}

/// One asset's scoring result for a cycle. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredAsset {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub market_cap: f64,
    pub volume_24h: f64,
    pub sub_scores: SubScores,
    /// Weighted total, clamped to [0, 1] and rounded to 3 decimals.
    pub score: f64,
    pub tags: NarrativeTags,
    pub indicators: Option<IndicatorSet>,
    pub presence: PresenceInfo,
    /// Whether the optional flow signal fired for this asset.
    #[serde(default)]
    pub flow_signal: bool,
    /// Whether the optional event signal fired for this asset.
    #[serde(default)]
    pub event_signal: bool,
}

impl ScoredAsset {
    pub fn is_real_presence(&self) -> bool {
        self.presence.is_real_presence
    }

    pub fn rsi(&self) -> Option<f64> {
        self.indicators.map(|i| i.rsi)
    }

    pub fn trend_up(&self) -> bool {
        self.indicators.map(|i| i.trend_up()).unwrap_or(false)
    }
}

impl fmt::Display for ScoredAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} score={:.3} (tech {:.2} | narr {:.2} | chain {:.2} | vol {:.2}) [{}]",
            self.symbol,
            self.score,
            self.sub_scores.technical,
            self.sub_scores.narrative,
            self.sub_scores.onchain,
            self.sub_scores.volume,
            self.tags,
        )
    }
}

// ---------------------------------------------------------------------------
// Persisted state
// ---------------------------------------------------------------------------

/// Durable record of an asset that has been picked at least once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchlistEntry {
    pub symbol: String,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub last_score: f64,
    #[serde(default)]
    pub times_picked: u32,
    /// Last time the pick was handed to the notifier.
    #[serde(default)]
    pub last_alerted: Option<DateTime<Utc>>,
}

/// One row of the append-only signals history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRecord {
    pub cycle_id: Uuid,
    pub cycle_at: DateTime<Utc>,
    pub pick: ScoredAsset,
}

/// Market state of one symbol at the end of a cycle, kept as "previous"
/// for the next cycle's delta detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub symbol: String,
    pub price: f64,
    pub rsi: Option<f64>,
    pub trend_up: bool,
    pub score: f64,
    pub observed_at: DateTime<Utc>,
}

impl SnapshotEntry {
    pub fn from_scored(asset: &ScoredAsset, observed_at: DateTime<Utc>) -> Self {
        Self {
            symbol: asset.symbol.clone(),
            price: asset.price,
            rsi: asset.rsi(),
            trend_up: asset.trend_up(),
            score: asset.score,
            observed_at,
        }
    }
}

/// Period-over-period change worth alerting on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeltaAlert {
    pub symbol: String,
    pub old_price: f64,
    pub new_price: f64,
    pub price_change_pct: f64,
    pub rsi_change: f64,
    pub trend_flipped: bool,
    pub detected_at: DateTime<Utc>,
}

impl fmt::Display for DeltaAlert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {:+.2}% price, ΔRSI={:+.2}{}",
            self.symbol,
            self.price_change_pct,
            self.rsi_change,
            if self.trend_flipped { ", trend flipped up" } else { "" },
        )
    }
}

/// Round to `dp` decimal places.
pub fn round_dp(value: f64, dp: i32) -> f64 {
    let factor = 10f64.powi(dp);
    (value * factor).round() / factor
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for SCOUT.
#[derive(Debug, thiserror::Error)]
pub enum ScoutError {
    #[error("Market data source outage ({source_name}): {message}")]
    SourceOutage { source_name: String, message: String },

    #[error("Malformed record from {source_name}: {message}")]
    MalformedRecord { source_name: String, message: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("State lock unavailable: {0}")]
    Lock(String),

    #[error("Notification error ({channel}): {message}")]
    Notify { channel: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_indicators(fast: f64, slow: f64, hist: f64, prev: f64) -> IndicatorSet {
        IndicatorSet {
            rsi: 60.0,
            ema_fast: fast,
            ema_slow: slow,
            macd_hist: hist,
            macd_hist_prev: prev,
            volume_ratio: 1.0,
            volume_spike: false,
            last_close: 1.0,
        }
    }

    #[test]
    fn test_quote_uppercases_symbol() {
        let q = AssetQuote::new(" pepe ", "Pepe", 0.000001, 1e6, 5e4);
        assert_eq!(q.symbol, "PEPE");
    }

    #[test]
    fn test_quote_validity() {
        assert!(AssetQuote::new("ABC", "Abc", 1.0, 100.0, 10.0).is_valid());
        assert!(!AssetQuote::new("ABC", "Abc", -1.0, 100.0, 10.0).is_valid());
        assert!(!AssetQuote::new("ABC", "Abc", f64::NAN, 100.0, 10.0).is_valid());
        assert!(!AssetQuote::new("", "Abc", 1.0, 100.0, 10.0).is_valid());
    }

    #[test]
    fn test_narrative_text_includes_description() {
        let q = AssetQuote::new("FET", "Fetch", 1.0, 1.0, 1.0).with_description("AI agents");
        assert_eq!(q.narrative_text(), "Fetch AI agents");
        let bare = AssetQuote::new("FET", "Fetch", 1.0, 1.0, 1.0);
        assert_eq!(bare.narrative_text(), "Fetch");
    }

    #[test]
    fn test_series_sorted_oldest_first() {
        let t0 = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let t1 = Utc.timestamp_opt(1_700_003_600, 0).unwrap();
        let series = PriceSeries::new(
            "abc",
            vec![
                PriceSample { timestamp: t1, close: 2.0, volume: 20.0 },
                PriceSample { timestamp: t0, close: 1.0, volume: 10.0 },
            ],
        );
        assert_eq!(series.symbol, "ABC");
        assert_eq!(series.closes(), vec![1.0, 2.0]);
        assert_eq!(series.volumes(), vec![10.0, 20.0]);
    }

    #[test]
    fn test_trend_up_requires_both_conditions() {
        assert!(sample_indicators(2.0, 1.0, 0.1, 0.0).trend_up());
        assert!(!sample_indicators(1.0, 2.0, 0.1, 0.0).trend_up());
        assert!(!sample_indicators(2.0, 1.0, -0.1, 0.0).trend_up());
    }

    #[test]
    fn test_bullish_cross() {
        assert!(sample_indicators(1.0, 1.0, 0.1, 0.0).bullish_cross());
        assert!(sample_indicators(1.0, 1.0, 0.1, -0.2).bullish_cross());
        assert!(!sample_indicators(1.0, 1.0, 0.1, 0.05).bullish_cross());
        assert!(!sample_indicators(1.0, 1.0, 0.0, -0.1).bullish_cross());
    }

    #[test]
    fn test_narrative_tags_order_insensitive_and_deduped() {
        let a = NarrativeTags::new([Narrative::Infra, Narrative::Ai, Narrative::Ai]);
        let b = NarrativeTags::new([Narrative::Ai, Narrative::Infra]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 2);
        assert_eq!(format!("{a}"), "AI, Infra");
    }

    #[test]
    fn test_narrative_from_str() {
        assert_eq!("ai".parse::<Narrative>().unwrap(), Narrative::Ai);
        assert_eq!("DeFi".parse::<Narrative>().unwrap(), Narrative::Defi);
        assert_eq!("l2".parse::<Narrative>().unwrap(), Narrative::Layer2);
        assert!("unknown".parse::<Narrative>().is_err());
    }

    #[test]
    fn test_round_dp() {
        assert_eq!(round_dp(0.12345, 3), 0.123);
        assert_eq!(round_dp(0.1235, 2), 0.12);
        assert_eq!(round_dp(5.999, 2), 6.0);
    }

    #[test]
    fn test_delta_alert_display() {
        let alert = DeltaAlert {
            symbol: "XYZ".into(),
            old_price: 1.0,
            new_price: 1.06,
            price_change_pct: 6.0,
            rsi_change: 2.5,
            trend_flipped: true,
            detected_at: Utc::now(),
        };
        let s = format!("{alert}");
        assert!(s.contains("XYZ"));
        assert!(s.contains("+6.00%"));
        assert!(s.contains("trend flipped"));
    }

    #[test]
    fn test_error_display() {
        let e = ScoutError::SourceOutage {
            source_name: "feed".into(),
            message: "empty listing".into(),
        };
        assert_eq!(e.to_string(), "Market data source outage (feed): empty listing");
    }
}
