//! Persistent watchlist of every symbol that has been picked.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

use crate::config::WatchlistConfig;
use crate::types::{ScoredAsset, WatchlistEntry};

/// Symbol → entry. Keyed by symbol, so an upsert can never duplicate one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Watchlist {
    entries: BTreeMap<String, WatchlistEntry>,
}

impl Watchlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert new picks and refresh existing ones. Returns the symbols that
    /// were not on the watchlist before, in pick order.
    pub fn upsert(&mut self, picks: &[ScoredAsset], now: DateTime<Utc>) -> Vec<String> {
        let mut added = Vec::new();
        let mut seen = HashSet::new();

        for pick in picks {
            if !seen.insert(pick.symbol.as_str()) {
                continue;
            }
            match self.entries.get_mut(&pick.symbol) {
                Some(entry) => {
                    entry.last_seen = now;
                    entry.last_score = pick.score;
                    entry.times_picked += 1;
                }
                None => {
                    self.entries.insert(
                        pick.symbol.clone(),
                        WatchlistEntry {
                            symbol: pick.symbol.clone(),
                            first_seen: now,
                            last_seen: now,
                            last_score: pick.score,
                            times_picked: 1,
                            last_alerted: None,
                        },
                    );
                    added.push(pick.symbol.clone());
                }
            }
        }

        if !added.is_empty() {
            info!(added = ?added, total = self.entries.len(), "Watchlist grew");
        }
        added
    }

    /// Remove entries that are both stale and weak. An entry is pruned only
    /// when `last_seen` is older than `stale_after_days` AND `last_score` is
    /// below `keep_threshold`. A window of 0 days disables pruning.
    pub fn prune_stale(&mut self, config: &WatchlistConfig, now: DateTime<Utc>) -> Vec<String> {
        if config.stale_after_days <= 0 {
            return Vec::new();
        }
        let cutoff = now - Duration::days(config.stale_after_days);

        let stale: Vec<String> = self
            .entries
            .values()
            .filter(|e| e.last_seen < cutoff && e.last_score < config.keep_threshold)
            .map(|e| e.symbol.clone())
            .collect();

        for symbol in &stale {
            self.entries.remove(symbol);
        }
        if !stale.is_empty() {
            info!(pruned = ?stale, remaining = self.entries.len(), "Pruned stale watchlist entries");
        }
        stale
    }

    /// Whether `symbol` was alerted within the last `cooldown_hours`.
    pub fn in_cooldown(&self, symbol: &str, cooldown_hours: i64, now: DateTime<Utc>) -> bool {
        if cooldown_hours <= 0 {
            return false;
        }
        self.entries
            .get(symbol)
            .and_then(|e| e.last_alerted)
            .is_some_and(|t| now - t < Duration::hours(cooldown_hours))
    }

    /// Picks that are allowed to be emitted now.
    pub fn filter_cooldown(&self, picks: &[ScoredAsset], cooldown_hours: i64, now: DateTime<Utc>) -> Vec<ScoredAsset> {
        picks
            .iter()
            .filter(|p| {
                let cooling = self.in_cooldown(&p.symbol, cooldown_hours, now);
                if cooling {
                    debug!(symbol = %p.symbol, cooldown_hours, "Pick withheld, still in cooldown");
                }
                !cooling
            })
            .cloned()
            .collect()
    }

    pub fn mark_alerted<'a>(&mut self, symbols: impl IntoIterator<Item = &'a str>, now: DateTime<Utc>) {
        for symbol in symbols {
            if let Some(entry) = self.entries.get_mut(symbol) {
                entry.last_alerted = Some(now);
            }
        }
    }

    pub fn get(&self, symbol: &str) -> Option<&WatchlistEntry> {
        self.entries.get(symbol)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.entries.contains_key(symbol)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in symbol order.
    pub fn entries(&self) -> impl Iterator<Item = &WatchlistEntry> {
        self.entries.values()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
