//! Optional flow signals.
//!
//! A flow signal is a yes/no opinion derived from recent vs prior volume
//! and price change. The scorer queries it through [`FlowSignal`]; when no
//! provider is configured [`NoFlowSignal`] answers `false` and scores are
//! unaffected.

use crate::config::FlowConfig;
use crate::types::PriceSeries;

/// Inputs a flow signal may look at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowInput {
    /// Volume summed over the most recent span.
    pub volume_now: f64,
    /// Volume summed over the earliest span of the series, if long enough.
    pub volume_prior: Option<f64>,
    /// Close-to-close change across the series, in percent.
    pub price_change_pct: f64,
}

impl FlowInput {
    /// Derive flow inputs from a price series using `span` samples per
    /// volume window. `None` for an empty series.
    pub fn from_series(series: &PriceSeries, span: usize) -> Option<Self> {
        let first = series.samples.first()?;
        let last = series.samples.last()?;
        let span = span.max(1);
        let n = series.len();

        let recent_from = n.saturating_sub(span);
        let volume_now = series.samples[recent_from..].iter().map(|s| s.volume).sum();
        let volume_prior = (n >= 2 * span).then(|| series.samples[..span].iter().map(|s| s.volume).sum());

        let price_change_pct = (last.close - first.close) / first.close.max(1e-8) * 100.0;

        Some(Self {
            volume_now,
            volume_prior,
            price_change_pct,
        })
    }
}

pub trait FlowSignal: Send + Sync {
    fn detect(&self, input: &FlowInput) -> bool;

    fn name(&self) -> &str;
}

/// Default provider: never fires.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFlowSignal;

impl FlowSignal for NoFlowSignal {
    fn detect(&self, _input: &FlowInput) -> bool {
        false
    }

    fn name(&self) -> &str {
        "none"
    }
}

/// Accumulation heuristic: volume grows sharply while price stays flat.
#[derive(Debug, Clone)]
pub struct SmartMoneyFlow {
    min_volume_growth: f64,
    max_price_change_pct: f64,
}

impl SmartMoneyFlow {
    pub fn new(min_volume_growth: f64, max_price_change_pct: f64) -> Self {
        Self {
            min_volume_growth,
            max_price_change_pct,
        }
    }

    pub fn from_config(config: &FlowConfig) -> Self {
        Self::new(config.min_volume_growth, config.max_price_change_pct)
    }
}

impl FlowSignal for SmartMoneyFlow {
    fn detect(&self, input: &FlowInput) -> bool {
        match input.volume_prior {
            Some(prior) if prior > 0.0 => {
                input.volume_now / prior >= self.min_volume_growth
                    && input.price_change_pct.abs() < self.max_price_change_pct
            }
            _ => false,
        }
    }

    fn name(&self) -> &str {
        "smart-money"
    }
}

/// Build the configured flow signal.
pub fn from_config(config: &FlowConfig) -> Box<dyn FlowSignal> {
    if config.enabled {
        Box::new(SmartMoneyFlow::from_config(config))
    } else {
        Box::new(NoFlowSignal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PriceSample;
    use chrono::{Duration, TimeZone, Utc};

    fn series(points: &[(f64, f64)]) -> PriceSeries {
        let t0 = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        PriceSeries::new(
            "FLOW",
            points
                .iter()
                .enumerate()
                .map(|(i, (c, v))| PriceSample {
                    timestamp: t0 + Duration::hours(i as i64),
                    close: *c,
                    volume: *v,
                })
                .collect(),
        )
    }

    fn input(now: f64, prior: Option<f64>, change: f64) -> FlowInput {
        FlowInput {
            volume_now: now,
            volume_prior: prior,
            price_change_pct: change,
        }
    }

    #[test]
    fn test_smart_money_fires_on_quiet_accumulation() {
        let s = SmartMoneyFlow::new(3.0, 10.0);
        assert!(s.detect(&input(300.0, Some(100.0), 4.0)));
        assert!(s.detect(&input(300.0, Some(100.0), -9.9)));
    }

    #[test]
    fn test_smart_money_rejects_price_move_or_low_growth() {
        let s = SmartMoneyFlow::new(3.0, 10.0);
        assert!(!s.detect(&input(300.0, Some(100.0), 12.0)));
        assert!(!s.detect(&input(250.0, Some(100.0), 1.0)));
    }

    #[test]
    fn test_smart_money_needs_prior_volume() {
        let s = SmartMoneyFlow::new(3.0, 10.0);
        assert!(!s.detect(&input(300.0, None, 0.0)));
        assert!(!s.detect(&input(300.0, Some(0.0), 0.0)));
    }

    #[test]
    fn test_no_flow_signal_never_fires() {
        assert!(!NoFlowSignal.detect(&input(1e9, Some(1.0), 0.0)));
    }

    #[test]
    fn test_from_series() {
        let s = series(&[(1.0, 10.0), (1.0, 10.0), (1.02, 40.0), (1.05, 50.0)]);
        let fi = FlowInput::from_series(&s, 2).unwrap();
        assert_eq!(fi.volume_now, 90.0);
        assert_eq!(fi.volume_prior, Some(20.0));
        assert!((fi.price_change_pct - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_from_series_short_has_no_prior() {
        let s = series(&[(1.0, 10.0), (1.1, 10.0), (1.2, 10.0)]);
        let fi = FlowInput::from_series(&s, 2).unwrap();
        assert_eq!(fi.volume_prior, None);
        assert!(FlowInput::from_series(&series(&[]), 2).is_none());
    }

    #[test]
    fn test_from_config_selects_provider() {
        let off = from_config(&FlowConfig::default());
        assert_eq!(off.name(), "none");
        let on = from_config(&FlowConfig {
            enabled: true,
            ..FlowConfig::default()
        });
        assert_eq!(on.name(), "smart-money");
    }
}
