//! Mock market-data source and notifier for integration testing.
//!
//! Provides deterministic `MarketDataSource`, `PresenceSource` and
//! `Notifier` implementations, all in-memory with no external
//! dependencies.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use scout::data::{MarketDataSource, PresenceSource};
use scout::notify::Notifier;
use scout::types::*;

/// A mock feed for deterministic testing.
///
/// Quotes, trending texts and a forced error are controllable from test
/// code. Every listed symbol gets the same steadily rising series.
pub struct MockSource {
    quotes: Arc<Mutex<Vec<AssetQuote>>>,
    trending: Arc<Mutex<Vec<String>>>,
    dex: HashMap<String, f64>,
    defi: HashMap<String, f64>,
    /// If set, listing returns this error.
    force_error: Arc<Mutex<Option<String>>>,
}

impl MockSource {
    /// `ABC` is an AI infrastructure asset with strong on-chain presence;
    /// `DUD` has no narrative and no presence.
    pub fn new() -> Self {
        Self {
            quotes: Arc::new(Mutex::new(vec![
                AssetQuote::new("ABC", "Abc", 1.6, 10_000_000.0, 100_000.0)
                    .with_description("AI infrastructure protocol"),
                AssetQuote::new("DUD", "Dud", 1.0, 10_000_000.0, 100_000.0),
            ])),
            trending: Arc::new(Mutex::new(Vec::new())),
            dex: HashMap::from([("ABC".to_string(), 90_000.0)]),
            defi: HashMap::from([("ABC".to_string(), 2_000_000.0)]),
            force_error: Arc::new(Mutex::new(None)),
        }
    }

    /// Force listing to fail.
    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }

    /// Clear any forced error.
    pub fn clear_error(&self) {
        *self.force_error.lock().unwrap() = None;
    }

    pub fn set_price(&self, symbol: &str, price: f64) {
        for q in self.quotes.lock().unwrap().iter_mut().filter(|q| q.symbol == symbol) {
            q.price = price;
        }
    }

    pub fn set_trending(&self, texts: &[&str]) {
        *self.trending.lock().unwrap() = texts.iter().map(|t| t.to_string()).collect();
    }

    fn rising_series(symbol: &str) -> PriceSeries {
        let t0 = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let samples = (0..60)
            .map(|i| PriceSample {
                timestamp: t0 + Duration::hours(i),
                close: 1.01f64.powi(i as i32),
                volume: if i == 59 { 5_000.0 } else { 1_000.0 },
            })
            .collect();
        PriceSeries::new(symbol, samples)
    }
}

#[async_trait]
impl MarketDataSource for MockSource {
    async fn list_assets(&self) -> Result<Vec<AssetQuote>> {
        if let Some(msg) = self.force_error.lock().unwrap().clone() {
            return Err(anyhow!(msg));
        }
        Ok(self.quotes.lock().unwrap().clone())
    }

    async fn get_price_series(&self, symbol: &str, _window: usize) -> Result<Option<PriceSeries>> {
        if symbol == "ABC" {
            Ok(Some(Self::rising_series(symbol)))
        } else {
            Ok(None)
        }
    }

    async fn trending_texts(&self) -> Result<Vec<String>> {
        Ok(self.trending.lock().unwrap().clone())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[async_trait]
impl PresenceSource for MockSource {
    async fn get_dex_presence(&self) -> Result<HashMap<String, f64>> {
        Ok(self.dex.clone())
    }

    async fn get_defi_presence(&self) -> Result<HashMap<String, f64>> {
        Ok(self.defi.clone())
    }
}

/// Records everything it is asked to deliver.
#[derive(Default)]
pub struct RecordingNotifier {
    pub picks: Mutex<Vec<Vec<String>>>,
    pub alerts: Mutex<Vec<DeltaAlert>>,
}

impl RecordingNotifier {
    pub fn pick_batches(&self) -> Vec<Vec<String>> {
        self.picks.lock().unwrap().clone()
    }

    pub fn alert_count(&self) -> usize {
        self.alerts.lock().unwrap().len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn emit_picks(&self, _cycle: Uuid, picks: &[ScoredAsset]) -> Result<()> {
        self.picks
            .lock()
            .unwrap()
            .push(picks.iter().map(|p| p.symbol.clone()).collect());
        Ok(())
    }

    async fn emit_delta_alerts(&self, _cycle: Uuid, alerts: &[DeltaAlert]) -> Result<()> {
        self.alerts.lock().unwrap().extend_from_slice(alerts);
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}
