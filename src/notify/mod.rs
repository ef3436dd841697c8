//! Notification collaborators.
//!
//! The scan cycle hands its picks and delta alerts to every configured
//! `Notifier`. Delivery failures are reported back to the caller, which
//! logs them; they never abort a cycle.

pub mod webhook;

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use crate::types::{DeltaAlert, ScoredAsset};

/// Abstraction over an alert channel.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver this cycle's picks. Only called with a non-empty slice.
    async fn emit_picks(&self, cycle: Uuid, picks: &[ScoredAsset]) -> Result<()>;

    /// Deliver this cycle's delta alerts. Only called with a non-empty slice.
    async fn emit_delta_alerts(&self, cycle: Uuid, alerts: &[DeltaAlert]) -> Result<()>;

    /// Channel name for logging.
    fn name(&self) -> &str;
}

/// Writes picks and alerts to the structured log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn emit_picks(&self, cycle: Uuid, picks: &[ScoredAsset]) -> Result<()> {
        for (rank, pick) in picks.iter().enumerate() {
            info!(
                %cycle,
                rank = rank + 1,
                symbol = %pick.symbol,
                score = pick.score,
                price = pick.price,
                rsi = ?pick.rsi(),
                tags = %pick.tags,
                real_presence = pick.is_real_presence(),
                "Pick"
            );
        }
        Ok(())
    }

    async fn emit_delta_alerts(&self, cycle: Uuid, alerts: &[DeltaAlert]) -> Result<()> {
        for alert in alerts {
            info!(
                %cycle,
                symbol = %alert.symbol,
                price_change_pct = alert.price_change_pct,
                rsi_change = alert.rsi_change,
                trend_flipped = alert.trend_flipped,
                "Delta alert"
            );
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}
