//! Generic JSON-over-HTTP market data feed.
//!
//! Talks to any gateway exposing:
//! - `GET {base}/assets` → `[{symbol, name, description?, price, market_cap, volume_24h}]`
//! - `GET {base}/series/{symbol}?window=N` → `[{timestamp, close, volume}]`, 404 when unknown
//! - `GET {base}/presence/dex` and `/presence/defi` → `{"SYMBOL": usd, ...}`
//! - `GET {base}/trending` → `["headline", ...]`
//! - `GET {base}/events/{symbol}?max=N` → `[{title, description?}]`, 404 when unknown
//!
//! Auth: optional `X-API-Key` header.
//! Records that fail to parse are skipped one by one; the rest of the
//! response is still used.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{MarketDataSource, PresenceSource};
use crate::types::{AssetQuote, PriceSample, PriceSeries, ScoutError};

const SOURCE_NAME: &str = "http-feed";
const API_KEY_HEADER: &str = "X-API-Key";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FeedAsset {
    symbol: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    price: f64,
    market_cap: f64,
    #[serde(alias = "total_volume")]
    volume_24h: f64,
}

#[derive(Debug, Deserialize)]
struct FeedSample {
    timestamp: DateTime<Utc>,
    close: f64,
    #[serde(default)]
    volume: f64,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse an asset listing, skipping malformed or invalid records.
pub fn parse_assets(body: Value) -> Result<Vec<AssetQuote>, ScoutError> {
    let Value::Array(items) = body else {
        return Err(ScoutError::MalformedRecord {
            source_name: SOURCE_NAME.into(),
            message: "asset listing is not a JSON array".into(),
        });
    };

    let total = items.len();
    let quotes: Vec<AssetQuote> = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<FeedAsset>(item) {
            Ok(a) => {
                let name = a.name.unwrap_or_else(|| a.symbol.clone());
                let mut q = AssetQuote::new(&a.symbol, &name, a.price, a.market_cap, a.volume_24h);
                q.description = a.description.filter(|d| !d.trim().is_empty());
                if q.is_valid() {
                    Some(q)
                } else {
                    debug!(symbol = %q.symbol, "Skipping asset with invalid numbers");
                    None
                }
            }
            Err(e) => {
                debug!(error = %e, "Skipping malformed asset record");
                None
            }
        })
        .collect();

    if quotes.len() < total {
        debug!(kept = quotes.len(), total, "Dropped malformed asset records");
    }
    Ok(quotes)
}

/// Parse a price series. Malformed or non-finite samples are dropped;
/// `None` when nothing usable remains.
pub fn parse_series(symbol: &str, body: Value) -> Option<PriceSeries> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("samples") {
            Some(Value::Array(items)) => items,
            _ => return None,
        },
        _ => return None,
    };

    let samples: Vec<PriceSample> = items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<FeedSample>(item).ok())
        .filter(|s| s.close.is_finite() && s.close > 0.0 && s.volume.is_finite() && s.volume >= 0.0)
        .map(|s| PriceSample {
            timestamp: s.timestamp,
            close: s.close,
            volume: s.volume,
        })
        .collect();

    (!samples.is_empty()).then(|| PriceSeries::new(symbol, samples))
}

/// Parse a `{symbol: number}` map, skipping non-numeric values.
pub fn parse_numeric_map(body: Value) -> HashMap<String, f64> {
    match body {
        Value::Object(map) => map
            .into_iter()
            .filter_map(|(k, v)| v.as_f64().map(|n| (k.to_uppercase(), n)))
            .collect(),
        _ => HashMap::new(),
    }
}

pub fn parse_texts(body: Value) -> Vec<String> {
    match body {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s),
                Value::Object(mut o) => o.remove("title").and_then(|t| t.as_str().map(str::to_string)),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Parse event records into `"title description"` strings.
pub fn parse_events(body: Value) -> Vec<String> {
    match body {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s),
                Value::Object(o) => {
                    let text = ["title", "description"]
                        .iter()
                        .filter_map(|k| o.get(*k).and_then(Value::as_str))
                        .collect::<Vec<_>>()
                        .join(" ");
                    (!text.is_empty()).then_some(text)
                }
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct HttpFeed {
    http: Client,
    base_url: String,
    api_key: Option<Secret<String>>,
}

impl HttpFeed {
    pub fn new(base_url: &str, api_key: Option<Secret<String>>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent("SCOUT/0.1.0")
            .build()
            .context("Failed to build HTTP client for feed")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn get(&self, path: &str) -> RequestBuilder {
        let req = self.http.get(format!("{}{path}", self.base_url));
        match &self.api_key {
            Some(key) => req.header(API_KEY_HEADER, key.expose_secret().as_str()),
            None => req,
        }
    }

    async fn get_json(&self, path: &str) -> Result<Value> {
        let resp = self
            .get(path)
            .send()
            .await
            .with_context(|| format!("Feed request failed for {path}"))?;

        if !resp.status().is_success() {
            let status = resp.status();
            anyhow::bail!("Feed error {status} for {path}");
        }

        resp.json()
            .await
            .with_context(|| format!("Failed to parse feed response for {path}"))
    }
}

#[async_trait]
impl MarketDataSource for HttpFeed {
    async fn list_assets(&self) -> Result<Vec<AssetQuote>> {
        let body = self.get_json("/assets").await.map_err(|e| ScoutError::SourceOutage {
            source_name: SOURCE_NAME.into(),
            message: format!("{e:#}"),
        })?;
        let quotes = parse_assets(body)?;
        info!(count = quotes.len(), "Fetched asset listing");
        Ok(quotes)
    }

    async fn get_price_series(&self, symbol: &str, window: usize) -> Result<Option<PriceSeries>> {
        let path = format!("/series/{}?window={window}", urlencoding::encode(symbol));
        let resp = self
            .get(&path)
            .send()
            .await
            .with_context(|| format!("Series request failed for {symbol}"))?;

        if resp.status() == StatusCode::NOT_FOUND {
            debug!(symbol, "No series available");
            return Ok(None);
        }
        if !resp.status().is_success() {
            let status = resp.status();
            anyhow::bail!("Feed error {status} fetching series for {symbol}");
        }

        let body: Value = resp
            .json()
            .await
            .with_context(|| format!("Failed to parse series for {symbol}"))?;
        Ok(parse_series(symbol, body))
    }

    async fn trending_texts(&self) -> Result<Vec<String>> {
        let body = self.get_json("/trending").await?;
        Ok(parse_texts(body))
    }

    async fn asset_events(&self, symbol: &str, max: usize) -> Result<Vec<String>> {
        let path = format!("/events/{}?max={max}", urlencoding::encode(symbol));
        let resp = self
            .get(&path)
            .send()
            .await
            .with_context(|| format!("Events request failed for {symbol}"))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !resp.status().is_success() {
            let status = resp.status();
            anyhow::bail!("Feed error {status} fetching events for {symbol}");
        }

        let body: Value = resp
            .json()
            .await
            .with_context(|| format!("Failed to parse events for {symbol}"))?;
        let mut events = parse_events(body);
        events.truncate(max);
        Ok(events)
    }

    fn name(&self) -> &str {
        SOURCE_NAME
    }
}

#[async_trait]
impl PresenceSource for HttpFeed {
    async fn get_dex_presence(&self) -> Result<HashMap<String, f64>> {
        let body = self.get_json("/presence/dex").await?;
        let map = parse_numeric_map(body);
        if map.is_empty() {
            warn!("DEX presence dataset is empty");
        }
        Ok(map)
    }

    async fn get_defi_presence(&self) -> Result<HashMap<String, f64>> {
        let body = self.get_json("/presence/defi").await?;
        let map = parse_numeric_map(body);
        if map.is_empty() {
            warn!("DeFi presence dataset is empty");
        }
        Ok(map)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
