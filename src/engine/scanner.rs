//! Universe scanner.
//!
//! Lists assets from the market-data source, filters them down to the
//! scannable universe (market-cap ceiling, volume floor, one entry per
//! symbol), then fetches price series and the on-chain presence datasets
//! concurrently for downstream scoring.

use anyhow::Result;
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::ScannerConfig;
use crate::data::{MarketDataSource, PresenceSource};
use crate::signals::PresenceDatasets;
use crate::strategy::AssetInputs;
use crate::types::{AssetQuote, ScoutError};

pub struct UniverseScanner {
    market: Arc<dyn MarketDataSource>,
    presence: Option<Arc<dyn PresenceSource>>,
    config: ScannerConfig,
    /// Events requested per asset; `None` skips event fetching.
    max_events: Option<usize>,
}

impl UniverseScanner {
    /// Pass `None` for `presence` to score without on-chain data.
    pub fn new(
        market: Arc<dyn MarketDataSource>,
        presence: Option<Arc<dyn PresenceSource>>,
        config: ScannerConfig,
    ) -> Self {
        Self {
            market,
            presence,
            config,
            max_events: None,
        }
    }

    /// Also fetch up to `max` recent events per asset alongside its series.
    pub fn with_events(mut self, max: usize) -> Self {
        self.max_events = Some(max);
        self
    }

    fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.config.fetch_timeout_secs)
    }

    /// Fetch and filter the asset listing. A failed or empty listing is a
    /// `SourceOutage`.
    pub async fn list_universe(&self) -> Result<Vec<AssetQuote>> {
        let source = self.market.name().to_string();
        let quotes = match self.market.list_assets().await {
            Ok(q) => q,
            Err(e) => match e.downcast::<ScoutError>() {
                Ok(outage @ ScoutError::SourceOutage { .. }) => return Err(outage.into()),
                Ok(other) => {
                    return Err(ScoutError::SourceOutage {
                        source_name: source,
                        message: other.to_string(),
                    }
                    .into())
                }
                Err(e) => {
                    return Err(ScoutError::SourceOutage {
                        source_name: source,
                        message: format!("{e:#}"),
                    }
                    .into())
                }
            },
        };

        if quotes.is_empty() {
            return Err(ScoutError::SourceOutage {
                source_name: source,
                message: "empty asset listing".into(),
            }
            .into());
        }

        let total = quotes.len();
        let universe = self.filter_universe(quotes);
        info!(listed = total, universe = universe.len(), "Universe filtered");
        Ok(universe)
    }

    /// Drop invalid quotes, apply the market-cap ceiling and volume floor,
    /// and keep the first quote seen for each symbol.
    pub fn filter_universe(&self, quotes: Vec<AssetQuote>) -> Vec<AssetQuote> {
        let mut seen = HashSet::new();

        quotes
            .into_iter()
            .filter(|q| {
                if !q.is_valid() {
                    debug!(symbol = %q.symbol, "Skipping malformed quote");
                    return false;
                }
                q.market_cap <= self.config.max_market_cap && q.volume_24h >= self.config.min_volume_usd
            })
            .filter(|q| {
                let first = seen.insert(q.symbol.clone());
                if !first {
                    debug!(symbol = %q.symbol, "Duplicate symbol in listing, keeping first");
                }
                first
            })
            .collect()
    }

    /// Fetch a price series (and events, when enabled) for every quote with
    /// bounded concurrency and a per-request timeout. Failures leave the
    /// series absent and the events empty. Output is sorted by symbol.
    pub async fn fetch_series(&self, quotes: Vec<AssetQuote>) -> Vec<AssetInputs> {
        let window = self.config.series_window;
        let timeout = self.fetch_timeout();
        let max_events = self.max_events;
        let concurrency = self.config.fetch_concurrency.max(1);

        let mut inputs: Vec<AssetInputs> = stream::iter(quotes)
            .map(|quote| {
                let market = Arc::clone(&self.market);
                async move {
                    let series = match tokio::time::timeout(timeout, market.get_price_series(&quote.symbol, window)).await {
                        Ok(Ok(series)) => series,
                        Ok(Err(e)) => {
                            warn!(symbol = %quote.symbol, error = %e, "Series fetch failed");
                            None
                        }
                        Err(_) => {
                            warn!(symbol = %quote.symbol, timeout_secs = timeout.as_secs(), "Series fetch timed out");
                            None
                        }
                    };
                    let events = match max_events {
                        Some(max) => match tokio::time::timeout(timeout, market.asset_events(&quote.symbol, max)).await {
                            Ok(Ok(events)) => events,
                            Ok(Err(e)) => {
                                debug!(symbol = %quote.symbol, error = %e, "Events fetch failed");
                                Vec::new()
                            }
                            Err(_) => {
                                debug!(symbol = %quote.symbol, "Events fetch timed out");
                                Vec::new()
                            }
                        },
                        None => Vec::new(),
                    };
                    AssetInputs::new(quote, series).with_events(events)
                }
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        inputs.sort_by(|a, b| a.quote.symbol.cmp(&b.quote.symbol));
        let missing = inputs.iter().filter(|i| i.series.is_none()).count();
        info!(assets = inputs.len(), missing_series = missing, "Price series fetched");
        inputs
    }

    /// Fetch both presence datasets concurrently. A failed or timed-out
    /// dataset is treated as empty.
    pub async fn fetch_presence(&self) -> PresenceDatasets {
        let Some(source) = &self.presence else {
            return PresenceDatasets::default();
        };

        let timeout = self.fetch_timeout();
        let (dex, defi) = tokio::join!(
            tokio::time::timeout(timeout, source.get_dex_presence()),
            tokio::time::timeout(timeout, source.get_defi_presence()),
        );
        let dex = dataset_or_empty("DEX", dex);
        let defi = dataset_or_empty("DeFi", defi);

        let datasets = PresenceDatasets::new(dex, defi);
        debug!(
            dex = datasets.dex_volume.len(),
            defi = datasets.defi_tvl.len(),
            "Presence datasets fetched"
        );
        datasets
    }

    /// Trending texts for narrative ranking; empty on failure or timeout.
    pub async fn fetch_trending(&self) -> Vec<String> {
        match tokio::time::timeout(self.fetch_timeout(), self.market.trending_texts()).await {
            Ok(Ok(texts)) => texts,
            Ok(Err(e)) => {
                debug!(error = %e, "Trending texts unavailable");
                Vec::new()
            }
            Err(_) => {
                warn!("Trending texts fetch timed out");
                Vec::new()
            }
        }
    }
}

fn dataset_or_empty(
    kind: &str,
    result: Result<Result<HashMap<String, f64>>, tokio::time::error::Elapsed>,
) -> HashMap<String, f64> {
    match result {
        Ok(Ok(map)) => map,
        Ok(Err(e)) => {
            warn!(dataset = kind, error = %e, "Presence fetch failed, continuing without");
            HashMap::new()
        }
        Err(_) => {
            warn!(dataset = kind, "Presence fetch timed out, continuing without");
            HashMap::new()
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
