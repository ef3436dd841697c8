//! Period-over-period change detection.
//!
//! A pick is compared against the previous cycle's snapshot of the same
//! symbol. It alerts when any of these hold:
//! - price moved up more than [`PRICE_ALERT_PCT`] percent
//! - RSI rose more than [`RSI_ALERT_CHANGE`] points
//! - the trend flipped from down to up
//!
//! Symbols absent from the previous snapshot never alert.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::types::{round_dp, DeltaAlert, ScoredAsset, SnapshotEntry};

pub const PRICE_ALERT_PCT: f64 = 5.0;
pub const RSI_ALERT_CHANGE: f64 = 10.0;
/// Floor for the old price in the percent-change denominator.
const MIN_PRICE: f64 = 1e-8;

pub fn price_change_pct(old: f64, new: f64) -> f64 {
    (new - old) / old.max(MIN_PRICE) * 100.0
}

/// Compare `new_picks` with `previous` and return the alerts, in pick order.
pub fn diff(new_picks: &[ScoredAsset], previous: &[SnapshotEntry], now: DateTime<Utc>) -> Vec<DeltaAlert> {
    let prev: HashMap<&str, &SnapshotEntry> = previous.iter().map(|e| (e.symbol.as_str(), e)).collect();

    new_picks
        .iter()
        .filter_map(|pick| {
            let old = prev.get(pick.symbol.as_str())?;

            let change = price_change_pct(old.price, pick.price);
            let rsi_change = match (pick.rsi(), old.rsi) {
                (Some(new), Some(old)) => new - old,
                _ => 0.0,
            };
            let trend_flipped = !old.trend_up && pick.trend_up();

            let alert = change > PRICE_ALERT_PCT || rsi_change > RSI_ALERT_CHANGE || trend_flipped;
            alert.then(|| DeltaAlert {
                symbol: pick.symbol.clone(),
                old_price: old.price,
                new_price: pick.price,
                price_change_pct: round_dp(change, 2),
                rsi_change: round_dp(rsi_change, 2),
                trend_flipped,
                detected_at: now,
            })
        })
        .collect()
}

/// Snapshot of every scored asset, kept as "previous" for the next cycle.
pub fn snapshot(scored: &[ScoredAsset], now: DateTime<Utc>) -> Vec<SnapshotEntry> {
    scored.iter().map(|s| SnapshotEntry::from_scored(s, now)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{IndicatorSet, NarrativeTags, PresenceInfo, SubScores};
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn pick(symbol: &str, price: f64, rsi: Option<f64>, trend: bool) -> ScoredAsset {
        ScoredAsset {
            symbol: symbol.to_string(),
            name: symbol.to_string(),
            price,
            market_cap: 1e6,
            volume_24h: 1e4,
            sub_scores: SubScores::default(),
            score: 0.7,
            tags: NarrativeTags::default(),
            indicators: rsi.map(|r| IndicatorSet {
                rsi: r,
                ema_fast: if trend { 2.0 } else { 1.0 },
                ema_slow: 1.5,
                macd_hist: if trend { 0.1 } else { -0.1 },
                macd_hist_prev: 0.1,
                volume_ratio: 1.0,
                volume_spike: false,
                last_close: price,
            }),
            presence: PresenceInfo::default(),
            flow_signal: false,
            event_signal: false,
        }
    }

    fn prev(symbol: &str, price: f64, rsi: Option<f64>, trend: bool) -> SnapshotEntry {
        SnapshotEntry {
            symbol: symbol.to_string(),
            price,
            rsi,
            trend_up: trend,
            score: 0.7,
            observed_at: t0(),
        }
    }

    #[test]
    fn test_price_rise_above_threshold_alerts() {
        let alerts = diff(&[pick("XYZ", 1.06, Some(50.0), false)], &[prev("XYZ", 1.00, Some(50.0), false)], t0());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].price_change_pct, 6.0);
        assert_eq!(alerts[0].rsi_change, 0.0);
        assert!(!alerts[0].trend_flipped);
    }

    #[test]
    fn test_small_price_rise_alone_does_not_alert() {
        let alerts = diff(&[pick("XYZ", 1.03, Some(50.0), true)], &[prev("XYZ", 1.00, Some(48.0), true)], t0());
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_rsi_jump_alerts() {
        let alerts = diff(&[pick("XYZ", 1.0, Some(62.5), true)], &[prev("XYZ", 1.0, Some(50.0), true)], t0());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].rsi_change, 12.5);
    }

    #[test]
    fn test_trend_flip_alerts_only_upwards() {
        let up = diff(&[pick("XYZ", 1.0, Some(50.0), true)], &[prev("XYZ", 1.0, Some(50.0), false)], t0());
        assert_eq!(up.len(), 1);
        assert!(up[0].trend_flipped);

        let down = diff(&[pick("XYZ", 1.0, Some(50.0), false)], &[prev("XYZ", 1.0, Some(50.0), true)], t0());
        assert!(down.is_empty());
    }

    #[test]
    fn test_missing_rsi_counts_as_zero_change() {
        let alerts = diff(&[pick("XYZ", 1.0, None, false)], &[prev("XYZ", 1.0, Some(10.0), false)], t0());
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_new_symbol_never_alerts() {
        let alerts = diff(&[pick("NEW", 100.0, Some(90.0), true)], &[prev("OLD", 1.0, Some(10.0), false)], t0());
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_zero_old_price_uses_floor() {
        let change = price_change_pct(0.0, 1e-8);
        assert!((change - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_snapshot_covers_all_scored() {
        let scored = vec![pick("A", 1.0, Some(40.0), false), pick("B", 2.0, None, false)];
        let snap = snapshot(&scored, t0());
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[0].rsi, Some(40.0));
        assert_eq!(snap[1].rsi, None);
        assert_eq!(snap[1].price, 2.0);
    }
}
