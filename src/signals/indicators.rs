//! Technical indicators over an ordered price/volume series.
//!
//! All functions are pure: same input → same output, no I/O. Series are
//! oldest-to-newest. Short series never fail; they degrade to neutral or
//! best-effort values instead.

use crate::config::IndicatorConfig;
use crate::types::{IndicatorSet, PriceSeries};

/// RSI reported when there are too few samples.
pub const NEUTRAL_RSI: f64 = 50.0;

/// Substituted for a zero average loss.
const LOSS_EPSILON: f64 = 1e-10;

/// Relative Strength Index over the trailing `period` deltas.
///
/// Average gain over average loss, using simple means of the trailing
/// window. Returns exactly [`NEUTRAL_RSI`] when fewer than `period` samples
/// exist. A zero average loss is replaced by a tiny epsilon, so a flat
/// window (no gain either) scores 0.
pub fn rsi(closes: &[f64], period: usize) -> f64 {
    if period == 0 || closes.len() < period || closes.len() < 2 {
        return NEUTRAL_RSI;
    }

    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let take = period.min(deltas.len());
    let window = &deltas[deltas.len() - take..];

    let gain = window.iter().filter(|d| **d > 0.0).sum::<f64>() / take as f64;
    let loss = window.iter().filter(|d| **d < 0.0).map(|d| -d).sum::<f64>() / take as f64;

    let rs = gain / if loss == 0.0 { LOSS_EPSILON } else { loss };
    (100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0)
}

/// Exponential moving average, seeded from the first value.
///
/// `alpha = 2 / (period + 1)`; the output has the same length as the input.
pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    let Some(&first) = values.first() else {
        return Vec::new();
    };
    let alpha = 2.0 / (period.max(1) as f64 + 1.0);

    let mut out = Vec::with_capacity(values.len());
    let mut prev = first;
    out.push(prev);
    for v in &values[1..] {
        prev = alpha * v + (1.0 - alpha) * prev;
        out.push(prev);
    }
    out
}

/// Latest EMA value, if the series is non-empty.
pub fn ema_last(values: &[f64], period: usize) -> Option<f64> {
    ema(values, period).last().copied()
}

/// MACD line, signal line and histogram, aligned with the input.
#[derive(Debug, Clone, PartialEq)]
pub struct Macd {
    pub line: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

impl Macd {
    /// Latest and previous histogram values. With a single sample the
    /// previous value equals the latest.
    pub fn last_two(&self) -> Option<(f64, f64)> {
        let n = self.histogram.len();
        match n {
            0 => None,
            1 => Some((self.histogram[0], self.histogram[0])),
            _ => Some((self.histogram[n - 1], self.histogram[n - 2])),
        }
    }
}

pub fn macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> Macd {
    let fast_ema = ema(closes, fast);
    let slow_ema = ema(closes, slow);
    let line: Vec<f64> = fast_ema.iter().zip(&slow_ema).map(|(f, s)| f - s).collect();
    let signal_line = ema(&line, signal);
    let histogram = line.iter().zip(&signal_line).map(|(l, s)| l - s).collect();
    Macd {
        line,
        signal: signal_line,
        histogram,
    }
}

/// Latest volume divided by the trailing rolling mean (window includes the
/// latest sample). Falls back to the mean of all samples when the history
/// is shorter than `window`.
pub fn volume_ratio(volumes: &[f64], window: usize) -> f64 {
    let Some(&latest) = volumes.last() else {
        return 0.0;
    };
    let span = if window == 0 || volumes.len() < window {
        volumes.len()
    } else {
        window
    };
    let tail = &volumes[volumes.len() - span..];
    let mean = tail.iter().sum::<f64>() / span as f64;
    if mean <= 0.0 {
        return 0.0;
    }
    latest / mean
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Computes an [`IndicatorSet`] with the configured periods.
#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    config: IndicatorConfig,
}

impl IndicatorEngine {
    pub fn new(config: IndicatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &IndicatorConfig {
        &self.config
    }

    /// `None` for an empty series.
    pub fn compute(&self, series: &PriceSeries) -> Option<IndicatorSet> {
        if series.is_empty() {
            return None;
        }
        let c = &self.config;
        let closes = series.closes();
        let volumes = series.volumes();

        let (hist, hist_prev) = macd(&closes, c.macd_fast, c.macd_slow, c.macd_signal).last_two()?;
        let ratio = volume_ratio(&volumes, c.volume_window);

        Some(IndicatorSet {
            rsi: rsi(&closes, c.rsi_period),
            ema_fast: ema_last(&closes, c.ema_fast)?,
            ema_slow: ema_last(&closes, c.ema_slow)?,
            macd_hist: hist,
            macd_hist_prev: hist_prev,
            volume_ratio: ratio,
            volume_spike: ratio > c.volume_spike_ratio,
            last_close: *closes.last()?,
        })
    }
}

impl Default for IndicatorEngine {
    fn default() -> Self {
        Self::new(IndicatorConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PriceSample;
    use chrono::{Duration, TimeZone, Utc};

    fn series_from(closes: &[f64], volumes: &[f64]) -> PriceSeries {
        let t0 = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let samples = closes
            .iter()
            .zip(volumes)
            .enumerate()
            .map(|(i, (c, v))| PriceSample {
                timestamp: t0 + Duration::hours(i as i64),
                close: *c,
                volume: *v,
            })
            .collect();
        PriceSeries::new("TEST", samples)
    }

    /// Deterministic zig-zag with drift, for range checks.
    fn wavy(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 10.0 + (i as f64 * 0.7).sin() * 2.0 + i as f64 * 0.01)
            .collect()
    }

    // -- RSI --

    #[test]
    fn test_rsi_neutral_when_short() {
        for n in 0..14 {
            let closes: Vec<f64> = (0..n).map(|i| 1.0 + i as f64).collect();
            assert_eq!(rsi(&closes, 14), 50.0, "n={n}");
        }
    }

    #[test]
    fn test_rsi_in_range() {
        for n in [14, 15, 30, 100, 200] {
            let r = rsi(&wavy(n), 14);
            assert!((0.0..=100.0).contains(&r), "n={n} rsi={r}");
        }
    }

    #[test]
    fn test_rsi_all_gains_near_100() {
        let closes: Vec<f64> = (0..30).map(|i| 1.0 + i as f64).collect();
        let r = rsi(&closes, 14);
        assert!(r > 99.9, "rsi={r}");
    }

    #[test]
    fn test_rsi_all_losses_zero() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 - i as f64).collect();
        assert_eq!(rsi(&closes, 14), 0.0);
    }

    #[test]
    fn test_rsi_flat_window_is_zero() {
        assert_eq!(rsi(&[5.0; 40], 14), 0.0);
        // Flat tail after an earlier rally still only looks at the window.
        let mut closes: Vec<f64> = (0..20).map(|i| 1.0 + i as f64).collect();
        closes.extend([20.0; 20]);
        assert_eq!(rsi(&closes, 14), 0.0);
    }

    #[test]
    fn test_rsi_balanced_moves() {
        // Alternating +1 / -1 → equal average gain and loss → 50.
        let closes: Vec<f64> = (0..31).map(|i| if i % 2 == 0 { 10.0 } else { 11.0 }).collect();
        let r = rsi(&closes, 14);
        assert!((r - 50.0).abs() < 1e-9, "rsi={r}");
    }

    // -- EMA --

    #[test]
    fn test_ema_constant_series() {
        for period in [1, 5, 20, 50, 200] {
            let out = ema(&[3.5; 120], period);
            assert_eq!(out.len(), 120);
            assert!(out.iter().all(|v| (v - 3.5).abs() < 1e-12));
        }
    }

    #[test]
    fn test_ema_seeded_from_first_value() {
        let out = ema(&[10.0, 20.0], 3);
        assert_eq!(out[0], 10.0);
        // alpha = 0.5
        assert!((out[1] - 15.0).abs() < 1e-12);
    }

    #[test]
    fn test_ema_converges_to_new_level() {
        let mut values = vec![1.0; 10];
        values.extend(vec![5.0; 300]);
        let last = ema_last(&values, 20).unwrap();
        assert!((last - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_ema_empty() {
        assert!(ema(&[], 10).is_empty());
        assert!(ema_last(&[], 10).is_none());
    }

    // -- MACD --

    #[test]
    fn test_macd_positive_on_rising_series() {
        let closes: Vec<f64> = (0..120).map(|i| 1.0 + i as f64 * 0.05 + (i as f64).powf(1.2) * 0.01).collect();
        let m = macd(&closes, 12, 26, 9);
        let (hist, _) = m.last_two().unwrap();
        assert!(m.line.last().unwrap() > &0.0);
        assert!(hist > 0.0, "hist={hist}");
    }

    #[test]
    fn test_macd_lengths_aligned() {
        let m = macd(&wavy(50), 12, 26, 9);
        assert_eq!(m.line.len(), 50);
        assert_eq!(m.signal.len(), 50);
        assert_eq!(m.histogram.len(), 50);
    }

    #[test]
    fn test_macd_single_sample() {
        let m = macd(&[1.0], 12, 26, 9);
        assert_eq!(m.last_two(), Some((0.0, 0.0)));
    }

    // -- Volume --

    #[test]
    fn test_volume_ratio_spike() {
        let mut volumes = vec![100.0; 19];
        volumes.push(400.0);
        // mean over 20 = (1900 + 400) / 20 = 115
        let r = volume_ratio(&volumes, 20);
        assert!((r - 400.0 / 115.0).abs() < 1e-12);
        assert!(r > 1.5);
    }

    #[test]
    fn test_volume_ratio_short_history_uses_all_samples() {
        let r = volume_ratio(&[100.0, 100.0, 400.0], 20);
        assert!((r - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_volume_ratio_degenerate() {
        assert_eq!(volume_ratio(&[], 20), 0.0);
        assert_eq!(volume_ratio(&[0.0, 0.0], 20), 0.0);
    }

    // -- Engine --

    #[test]
    fn test_engine_empty_series() {
        let engine = IndicatorEngine::default();
        assert!(engine.compute(&series_from(&[], &[])).is_none());
    }

    #[test]
    fn test_engine_short_series_neutral_rsi() {
        let engine = IndicatorEngine::default();
        let set = engine.compute(&series_from(&[1.0, 1.1, 1.2], &[10.0, 10.0, 10.0])).unwrap();
        assert_eq!(set.rsi, 50.0);
        assert_eq!(set.last_close, 1.2);
        assert!(!set.volume_spike);
    }

    #[test]
    fn test_engine_uptrend_with_spike() {
        let engine = IndicatorEngine::default();
        let closes: Vec<f64> = (0..150).map(|i| 1.01f64.powi(i)).collect();
        let mut volumes = vec![1_000.0; 149];
        volumes.push(5_000.0);
        let set = engine.compute(&series_from(&closes, &volumes)).unwrap();
        assert!(set.trend_up());
        assert!(set.volume_spike);
        assert!(set.rsi > 55.0);
    }

    #[test]
    fn test_engine_is_pure() {
        let engine = IndicatorEngine::default();
        let s = series_from(&wavy(120), &vec![500.0; 120]);
        assert_eq!(engine.compute(&s), engine.compute(&s));
    }
}
