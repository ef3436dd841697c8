//! Per-cycle summary returned by the scan orchestrator.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use crate::strategy::selector::Tier;
use crate::types::{DeltaAlert, Narrative, ScoredAsset};

/// How a cycle ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum CycleOutcome {
    Completed,
    /// Listing failed or came back empty; nothing was scored or persisted.
    SourceOutage(String),
}

/// Summary of a complete list → score → select → persist → notify cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    /// Persisted cycle counter after this cycle (unchanged on outage).
    pub cycle_number: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcome: CycleOutcome,
    pub universe_size: usize,
    pub missing_series: usize,
    pub scored: usize,
    #[serde(serialize_with = "serialize_tier")]
    pub tier: Tier,
    pub picks: Vec<ScoredAsset>,
    /// Picks handed to the notifier after cooldown filtering.
    pub emitted: usize,
    pub new_symbols: Vec<String>,
    pub alerts: Vec<DeltaAlert>,
    pub pruned: Vec<String>,
    pub trending: Vec<(Narrative, usize)>,
    /// Whether the updated state reached disk.
    pub persisted: bool,
    pub notify_failures: usize,
}

fn serialize_tier<S: serde::Serializer>(tier: &Tier, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(tier)
}

impl CycleReport {
    /// Empty report for a cycle that started at `started_at`.
    pub fn new(cycle_id: Uuid, started_at: DateTime<Utc>) -> Self {
        Self {
            cycle_id,
            cycle_number: 0,
            started_at,
            finished_at: started_at,
            outcome: CycleOutcome::Completed,
            universe_size: 0,
            missing_series: 0,
            scored: 0,
            tier: Tier::Empty,
            picks: Vec::new(),
            emitted: 0,
            new_symbols: Vec::new(),
            alerts: Vec::new(),
            pruned: Vec::new(),
            trending: Vec::new(),
            persisted: false,
            notify_failures: 0,
        }
    }

    pub fn outage(cycle_id: Uuid, started_at: DateTime<Utc>, message: String) -> Self {
        Self {
            outcome: CycleOutcome::SourceOutage(message),
            finished_at: Utc::now(),
            ..Self::new(cycle_id, started_at)
        }
    }

    pub fn is_outage(&self) -> bool {
        matches!(self.outcome, CycleOutcome::SourceOutage(_))
    }

    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }

    pub fn pick_symbols(&self) -> Vec<&str> {
        self.picks.iter().map(|p| p.symbol.as_str()).collect()
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            CycleOutcome::SourceOutage(msg) => write!(f, "cycle {} skipped: source outage ({msg})", self.cycle_id),
            CycleOutcome::Completed => write!(
                f,
                "cycle #{} scored {} assets, {} picks ({}), {} alerts, {} new",
                self.cycle_number,
                self.scored,
                self.picks.len(),
                self.tier,
                self.alerts.len(),
                self.new_symbols.len(),
            ),
        }
    }
}
