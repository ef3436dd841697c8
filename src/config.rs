//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Every section has defaults, so a partial (or missing) file still yields
//! a complete configuration. Secrets (feed API key, webhook URL) are
//! referenced by env-var name in the config and resolved at runtime.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::types::ScoutError;

/// Tolerance when checking that a weight set sums to 1.0.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub scanner: ScannerConfig,
    pub indicators: IndicatorConfig,
    pub scoring: ScoringConfig,
    pub selection: SelectionConfig,
    pub presence: PresenceConfig,
    pub flow: FlowConfig,
    pub events: EventsConfig,
    pub watchlist: WatchlistConfig,
    pub storage: StorageConfig,
    pub feed: FeedConfig,
    pub notify: NotifyConfig,
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ScannerConfig {
    pub name: String,
    pub scan_interval_secs: u64,
    /// Assets above this market cap are excluded from the universe.
    pub max_market_cap: f64,
    /// Assets below this 24h volume are excluded from the universe.
    pub min_volume_usd: f64,
    /// Number of samples requested per price series.
    pub series_window: usize,
    /// Maximum in-flight price-series requests.
    pub fetch_concurrency: usize,
    pub fetch_timeout_secs: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            name: "SCOUT-001".to_string(),
            scan_interval_secs: 1800,
            max_market_cap: 50_000_000.0,
            min_volume_usd: 2_000.0,
            series_window: 200,
            fetch_concurrency: 8,
            fetch_timeout_secs: 15,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct IndicatorConfig {
    pub rsi_period: usize,
    pub ema_fast: usize,
    pub ema_slow: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    /// Rolling window for the average volume.
    pub volume_window: usize,
    /// Latest volume must exceed this multiple of the average.
    pub volume_spike_ratio: f64,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            ema_fast: 20,
            ema_slow: 50,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            volume_window: 20,
            volume_spike_ratio: 1.5,
        }
    }
}

/// Component weights of the final score and of the technical sub-score.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ScoringConfig {
    pub technical_weight: f64,
    pub narrative_weight: f64,
    pub onchain_weight: f64,
    pub volume_weight: f64,

    pub trend_weight: f64,
    pub rsi_weight: f64,
    pub cross_weight: f64,
    pub spike_weight: f64,

    /// RSI above this earns full RSI credit.
    pub rsi_strong: f64,
    /// RSI in [rsi_neutral, rsi_strong] earns half credit.
    pub rsi_neutral: f64,

    /// Narrative strength per matched tag.
    pub weight_per_tag: f64,
    /// Volume sub-score awarded when only the flow signal fires.
    pub flow_volume_credit: f64,
    /// Added to the narrative sub-score when the event signal fires.
    pub event_narrative_credit: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            technical_weight: 0.45,
            narrative_weight: 0.20,
            onchain_weight: 0.25,
            volume_weight: 0.10,
            trend_weight: 0.45,
            rsi_weight: 0.25,
            cross_weight: 0.15,
            spike_weight: 0.15,
            rsi_strong: 55.0,
            rsi_neutral: 48.0,
            weight_per_tag: 0.2,
            flow_volume_credit: 0.5,
            event_narrative_credit: 0.2,
        }
    }
}

impl ScoringConfig {
    pub fn component_sum(&self) -> f64 {
        self.technical_weight + self.narrative_weight + self.onchain_weight + self.volume_weight
    }

    pub fn technical_sum(&self) -> f64 {
        self.trend_weight + self.rsi_weight + self.cross_weight + self.spike_weight
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SelectionConfig {
    pub strong_threshold: f64,
    pub medium_threshold: f64,
    pub top_k: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            strong_threshold: 0.80,
            medium_threshold: 0.65,
            top_k: 5,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PresenceConfig {
    /// DEX 24h volume above this counts as real presence.
    pub dex_real_volume: f64,
    /// Protocol TVL above this counts as real presence.
    pub defi_real_tvl: f64,
    pub dex_real_score: f64,
    pub dex_listed_score: f64,
    pub defi_real_score: f64,
    pub defi_listed_score: f64,
    pub cache_ttl_secs: i64,
    pub cache_capacity: usize,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            dex_real_volume: 50_000.0,
            defi_real_tvl: 1_000_000.0,
            dex_real_score: 0.6,
            dex_listed_score: 0.2,
            defi_real_score: 0.5,
            defi_listed_score: 0.2,
            cache_ttl_secs: 6 * 3600,
            cache_capacity: 2_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FlowConfig {
    pub enabled: bool,
    /// Recent/prior volume ratio that counts as accumulation.
    pub min_volume_growth: f64,
    /// Absolute price change (%) must stay below this.
    pub max_price_change_pct: f64,
    /// Samples summed for each of the recent and prior volume windows.
    pub volume_span: usize,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_volume_growth: 3.0,
            max_price_change_pct: 10.0,
            volume_span: 24,
        }
    }
}

/// Keyword scan over each asset's recent event titles (partnerships,
/// integrations, launches).
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EventsConfig {
    pub enabled: bool,
    /// Most recent events requested per asset.
    pub max_events: usize,
    pub keywords: Vec<String>,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_events: 5,
            keywords: ["partnership", "collaboration", "integration", "launch", "announcement", "upgrade"]
                .iter()
                .map(|k| k.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WatchlistConfig {
    /// Entries not reselected for this many days may be pruned. 0 disables.
    pub stale_after_days: i64,
    /// Entries whose last score reached this are never pruned.
    pub keep_threshold: f64,
    /// Suppress repeat pick alerts for a symbol within this window. 0 disables.
    pub repeat_cooldown_hours: i64,
}

impl Default for WatchlistConfig {
    fn default() -> Self {
        Self {
            stale_after_days: 3,
            keep_threshold: 0.5,
            repeat_cooldown_hours: 0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub state_dir: String,
    /// Lock files older than this are considered abandoned.
    pub lock_stale_secs: u64,
    pub lock_timeout_secs: u64,
    pub write_retries: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_dir: "scout_state".to_string(),
            lock_stale_secs: 600,
            lock_timeout_secs: 10,
            write_retries: 3,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FeedConfig {
    pub base_url: String,
    /// Name of the env var holding the feed API key, if any.
    pub api_key_env: Option<String>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8700".to_string(),
            api_key_env: Some("SCOUT_FEED_API_KEY".to_string()),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct NotifyConfig {
    /// Name of the env var holding the webhook URL. Unset → log-only.
    pub webhook_url_env: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DashboardConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 10000,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file and validate it.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config = Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Load from `path` when it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            info!(path, "No config file found, using defaults");
            let config = Self::default();
            config.validate()?;
            Ok(config)
        }
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject weight sets that do not sum to 1.0 and inverted thresholds.
    pub fn validate(&self) -> Result<(), ScoutError> {
        let s = &self.scoring;
        if (s.component_sum() - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ScoutError::Config(format!(
                "component weights sum to {:.4}, expected 1.0",
                s.component_sum()
            )));
        }
        if (s.technical_sum() - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ScoutError::Config(format!(
                "technical weights sum to {:.4}, expected 1.0",
                s.technical_sum()
            )));
        }
        let sel = &self.selection;
        if sel.medium_threshold > sel.strong_threshold {
            return Err(ScoutError::Config(format!(
                "medium threshold {} above strong threshold {}",
                sel.medium_threshold, sel.strong_threshold
            )));
        }
        if sel.top_k == 0 {
            return Err(ScoutError::Config("top_k must be at least 1".into()));
        }
        if self.scanner.scan_interval_secs == 0 {
            return Err(ScoutError::Config("scan_interval_secs must be at least 1".into()));
        }
        if self.scanner.fetch_concurrency == 0 {
            return Err(ScoutError::Config("fetch_concurrency must be at least 1".into()));
        }
        Ok(())
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}
