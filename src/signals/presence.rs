//! On-chain presence resolution.
//!
//! Turns the pre-fetched DEX-volume and DeFi-TVL datasets into a
//! per-asset [`PresenceInfo`]. The two checks are independent and their
//! sub-scores are summed; the composite scorer clamps the total.
//!
//! Resolved presence is kept in an injected [`TtlCache`], so an asset that
//! drops out of a best-effort dataset for a cycle keeps its last-known
//! presence until the entry expires.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tracing::debug;

use crate::cache::TtlCache;
use crate::config::PresenceConfig;
use crate::types::PresenceInfo;

/// Auxiliary datasets for one cycle, keyed by uppercased symbol.
#[derive(Debug, Clone, Default)]
pub struct PresenceDatasets {
    /// Symbol → 24h DEX trading volume (USD).
    pub dex_volume: HashMap<String, f64>,
    /// Symbol → protocol TVL (USD).
    pub defi_tvl: HashMap<String, f64>,
}

impl PresenceDatasets {
    pub fn new(dex_volume: HashMap<String, f64>, defi_tvl: HashMap<String, f64>) -> Self {
        let norm = |m: HashMap<String, f64>| -> HashMap<String, f64> {
            m.into_iter()
                .filter(|(_, v)| v.is_finite() && *v >= 0.0)
                .map(|(k, v)| (k.trim().to_uppercase(), v))
                .collect()
        };
        Self {
            dex_volume: norm(dex_volume),
            defi_tvl: norm(defi_tvl),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.dex_volume.is_empty() && self.defi_tvl.is_empty()
    }
}

/// Score one asset's presence from its (optional) DEX volume and TVL.
pub fn evaluate(config: &PresenceConfig, dex_volume: Option<f64>, defi_tvl: Option<f64>) -> PresenceInfo {
    let dex_real = dex_volume.is_some_and(|v| v > config.dex_real_volume);
    let defi_real = defi_tvl.is_some_and(|v| v > config.defi_real_tvl);

    let dex_part = match dex_volume {
        Some(_) if dex_real => config.dex_real_score,
        Some(_) => config.dex_listed_score,
        None => 0.0,
    };
    let defi_part = match defi_tvl {
        Some(_) if defi_real => config.defi_real_score,
        Some(_) => config.defi_listed_score,
        None => 0.0,
    };

    PresenceInfo {
        dex_volume_24h: dex_volume,
        defi_tvl,
        onchain_score: dex_part + defi_part,
        is_real_presence: dex_real || defi_real,
    }
}

pub struct PresenceResolver {
    config: PresenceConfig,
    cache: TtlCache<String, PresenceInfo>,
}

impl PresenceResolver {
    pub fn new(config: PresenceConfig, cache: TtlCache<String, PresenceInfo>) -> Self {
        Self { config, cache }
    }

    /// Resolver with a cache sized from the config.
    pub fn from_config(config: PresenceConfig) -> Self {
        let cache = TtlCache::new(Duration::seconds(config.cache_ttl_secs), config.cache_capacity);
        Self::new(config, cache)
    }

    /// Resolve presence for `symbol`. Fresh dataset entries win and refresh
    /// the cache; otherwise an unexpired cached result is reused.
    pub fn resolve(&mut self, symbol: &str, datasets: &PresenceDatasets, now: DateTime<Utc>) -> PresenceInfo {
        let key = symbol.to_uppercase();
        let dex = datasets.dex_volume.get(&key).copied();
        let tvl = datasets.defi_tvl.get(&key).copied();

        if dex.is_some() || tvl.is_some() {
            let info = evaluate(&self.config, dex, tvl);
            self.cache.insert(key, info, now);
            return info;
        }

        match self.cache.get(&key, now) {
            Some(cached) => {
                debug!(symbol = %key, "Using cached presence");
                *cached
            }
            None => PresenceInfo::default(),
        }
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// Drop expired cache entries.
    pub fn evict_expired(&mut self, now: DateTime<Utc>) {
        self.cache.evict_expired(now);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
