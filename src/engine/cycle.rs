//! Scan orchestrator: runs one complete cycle.
//!
//! list → filter → fetch series and presence → score → select →
//! (locked) load state, upsert, diff, prune, save → notify.
//!
//! Only the state read-modify-write runs under the lock; fetching and
//! scoring happen before it is taken and notification after it is released.
//! Picks are marked as alerted only once a notifier has delivered them, in a
//! second short locked write after the notify step.
//!
//! When a save fails the in-memory state is newer than the file. Until a
//! save succeeds again it is preferred over the file, unless another process
//! has since written a state with a higher cycle count.

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::report::{CycleOutcome, CycleReport};
use super::scanner::UniverseScanner;
use crate::config::WatchlistConfig;
use crate::notify::Notifier;
use crate::storage::{ScannerState, StateStore};
use crate::strategy::ScoringPipeline;
use crate::types::{ScoredAsset, SignalRecord};

/// Narratives reported per cycle.
const TRENDING_TOP_N: usize = 3;

pub struct ScanOrchestrator {
    scanner: UniverseScanner,
    pipeline: ScoringPipeline,
    store: StateStore,
    notifiers: Vec<Arc<dyn Notifier>>,
    watchlist: WatchlistConfig,
    /// Last known state; used when the state file cannot be read.
    state: ScannerState,
    /// `state` holds changes the state file does not have yet.
    dirty: bool,
}

impl ScanOrchestrator {
    pub fn new(
        scanner: UniverseScanner,
        pipeline: ScoringPipeline,
        store: StateStore,
        notifiers: Vec<Arc<dyn Notifier>>,
        watchlist: WatchlistConfig,
    ) -> Self {
        Self {
            scanner,
            pipeline,
            store,
            notifiers,
            watchlist,
            state: ScannerState::default(),
            dirty: false,
        }
    }

    pub fn state(&self) -> &ScannerState {
        &self.state
    }

    /// Restore persisted state at startup. A missing file is a fresh start.
    pub fn restore(&mut self) -> Result<()> {
        if let Some(state) = self.store.load()? {
            info!(
                cycles = state.cycle_count,
                watchlist = state.watchlist.len(),
                "Resumed from saved state"
            );
            self.state = state;
        } else {
            info!("Fresh start");
        }
        Ok(())
    }

    /// Reconcile the in-memory state with the state file. Call with the lock
    /// held.
    fn refresh_from_disk(&mut self) {
        match self.store.load() {
            Ok(Some(disk)) if !self.dirty => self.state = disk,
            Ok(Some(disk)) if disk.cycle_count > self.state.cycle_count => {
                warn!(
                    disk_cycles = disk.cycle_count,
                    memory_cycles = self.state.cycle_count,
                    "State file moved ahead of unsaved state, adopting it"
                );
                self.state = disk;
                self.dirty = false;
            }
            Ok(Some(disk)) => warn!(
                disk_cycles = disk.cycle_count,
                memory_cycles = self.state.cycle_count,
                "Keeping unsaved in-memory state over older state file"
            ),
            Ok(None) => {}
            Err(e) => error!(error = %e, "Failed to load state, continuing with in-memory state"),
        }
    }

    async fn persist(&mut self) -> bool {
        let persisted = self.store.save_with_retry(&self.state).await.is_ok();
        self.dirty = !persisted;
        persisted
    }

    /// Record delivery of `picks` and write it through. If the lock cannot
    /// be taken the marks stay in memory and go out with the next save.
    async fn mark_delivered(&mut self, picks: &[ScoredAsset], now: DateTime<Utc>) {
        let lock = match self.store.acquire_lock().await {
            Ok(lock) => lock,
            Err(e) => {
                warn!(error = %e, "Could not lock state to record alerts, deferring");
                self.state.watchlist.mark_alerted(picks.iter().map(|p| p.symbol.as_str()), now);
                self.dirty = true;
                return;
            }
        };
        self.refresh_from_disk();
        self.state.watchlist.mark_alerted(picks.iter().map(|p| p.symbol.as_str()), now);
        self.persist().await;
        drop(lock);
    }

    /// Run one cycle. A source outage yields an outage report and leaves
    /// persisted state untouched; only failing to take the state lock is
    /// an error.
    pub async fn run_cycle(&mut self, now: DateTime<Utc>) -> Result<CycleReport> {
        let cycle_id = Uuid::new_v4();
        info!(%cycle_id, cycle = self.state.cycle_count + 1, "Starting cycle");

        // 1. Universe
        let universe = match self.scanner.list_universe().await {
            Ok(u) => u,
            Err(e) => {
                warn!(%cycle_id, error = %e, "Source outage, skipping cycle");
                let mut report = CycleReport::outage(cycle_id, now, format!("{e:#}"));
                report.cycle_number = self.state.cycle_count;
                return Ok(report);
            }
        };

        // 2. Inputs
        let (inputs, datasets, trending_texts) = tokio::join!(
            self.scanner.fetch_series(universe),
            self.scanner.fetch_presence(),
            self.scanner.fetch_trending(),
        );

        // 3. Score and select
        let scored = self.pipeline.score_universe(&inputs, &datasets, now);
        let selection = self.pipeline.select(&scored);
        let trending = self.pipeline.trending_narratives(&trending_texts, TRENDING_TOP_N);

        // 4. Persist under lock
        let lock = self.store.acquire_lock().await?;
        self.refresh_from_disk();

        let update = self.state.apply_cycle(&selection.picks, &scored, &self.watchlist, now);

        let records: Vec<SignalRecord> = selection
            .picks
            .iter()
            .map(|pick| SignalRecord {
                cycle_id,
                cycle_at: now,
                pick: pick.clone(),
            })
            .collect();
        if let Err(e) = self.store.append_history(&records) {
            error!(error = %e, "Failed to append signals history");
        }
        let persisted = self.persist().await;
        drop(lock);

        // 5. Notify
        let mut notify_failures = 0;
        let mut delivered = false;
        for notifier in &self.notifiers {
            if !update.emit.is_empty() {
                match notifier.emit_picks(cycle_id, &update.emit).await {
                    Ok(()) => delivered = true,
                    Err(e) => {
                        warn!(channel = notifier.name(), error = %e, "Failed to emit picks");
                        notify_failures += 1;
                    }
                }
            }
            if !update.alerts.is_empty() {
                if let Err(e) = notifier.emit_delta_alerts(cycle_id, &update.alerts).await {
                    warn!(channel = notifier.name(), error = %e, "Failed to emit delta alerts");
                    notify_failures += 1;
                }
            }
        }
        if delivered {
            self.mark_delivered(&update.emit, now).await;
        }

        Ok(CycleReport {
            cycle_id,
            cycle_number: self.state.cycle_count,
            started_at: now,
            finished_at: Utc::now(),
            outcome: CycleOutcome::Completed,
            universe_size: inputs.len(),
            missing_series: inputs.iter().filter(|i| i.series.is_none()).count(),
            scored: scored.len(),
            tier: selection.tier,
            emitted: update.emit.len(),
            picks: selection.picks,
            new_symbols: update.new_symbols,
            alerts: update.alerts,
            pruned: update.pruned,
            trending,
            persisted,
            notify_failures,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
