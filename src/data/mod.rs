//! Market-data collaborators.
//!
//! Defines the `MarketDataSource` and `PresenceSource` traits the scan
//! cycle consumes, plus a generic JSON-over-HTTP implementation of both.

pub mod feed;

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;

use crate::types::{AssetQuote, PriceSeries};

/// Abstraction over the asset listing and price history provider.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Latest snapshot of every listed asset. An error or an empty list is
    /// treated as a source outage by the caller.
    async fn list_assets(&self) -> Result<Vec<AssetQuote>>;

    /// Up to `window` most recent samples for `symbol`.
    /// `Ok(None)` when the source has no history for it.
    async fn get_price_series(&self, symbol: &str, window: usize) -> Result<Option<PriceSeries>>;

    /// Headlines or trending-topic texts used to rank hot narratives.
    async fn trending_texts(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    /// Up to `max` recent event titles and descriptions for `symbol`.
    async fn asset_events(&self, _symbol: &str, _max: usize) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    /// Source name for logging and identification.
    fn name(&self) -> &str;
}

/// Best-effort on-chain datasets, keyed by symbol.
#[async_trait]
pub trait PresenceSource: Send + Sync {
    /// Symbol → 24h DEX trading volume (USD).
    async fn get_dex_presence(&self) -> Result<HashMap<String, f64>>;

    /// Symbol → protocol TVL (USD).
    async fn get_defi_presence(&self) -> Result<HashMap<String, f64>>;
}
