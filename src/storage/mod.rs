//! Persistence layer.
//!
//! Two files under the state directory:
//! - `watchlist.json`: watchlist, previous snapshot and cycle counter as one
//!   JSON document, replaced atomically (temp file + rename).
//! - `signals_history.jsonl`: every pick ever made, one JSON object per line,
//!   append-only.
//!
//! A lock file guards the read-modify-write section so two scanner
//! processes sharing a state directory never interleave their updates.

pub mod delta;
pub mod watchlist;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::config::{StorageConfig, WatchlistConfig};
use crate::types::{DeltaAlert, ScoredAsset, ScoutError, SignalRecord, SnapshotEntry};
use watchlist::Watchlist;

pub const STATE_FILE: &str = "watchlist.json";
pub const HISTORY_FILE: &str = "signals_history.jsonl";
pub const LOCK_FILE: &str = "scout.lock";

/// Poll interval while waiting for another process's lock.
const LOCK_POLL: Duration = Duration::from_millis(200);
/// Base delay between failed write attempts, doubled each retry.
const WRITE_BACKOFF: Duration = Duration::from_millis(100);

// ---------------------------------------------------------------------------
// Scanner state
// ---------------------------------------------------------------------------

/// Everything that survives between cycles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScannerState {
    pub watchlist: Watchlist,
    /// Every asset scored in the last completed cycle.
    #[serde(default)]
    pub previous_snapshot: Vec<SnapshotEntry>,
    #[serde(default)]
    pub cycle_count: u64,
    #[serde(default)]
    pub last_cycle_at: Option<DateTime<Utc>>,
}

/// Outcome of folding one cycle's results into the state.
#[derive(Debug, Clone, Default)]
pub struct CycleUpdate {
    pub new_symbols: Vec<String>,
    pub alerts: Vec<DeltaAlert>,
    pub pruned: Vec<String>,
    /// Picks cleared for the notifier (cooldown applied). They are not
    /// marked as alerted until a notifier actually delivers them.
    pub emit: Vec<ScoredAsset>,
}

impl ScannerState {
    /// Diff against the previous snapshot, upsert picks, prune stale entries
    /// and roll the snapshot forward.
    pub fn apply_cycle(
        &mut self,
        picks: &[ScoredAsset],
        scored: &[ScoredAsset],
        config: &WatchlistConfig,
        now: DateTime<Utc>,
    ) -> CycleUpdate {
        let alerts = delta::diff(picks, &self.previous_snapshot, now);
        let emit = self.watchlist.filter_cooldown(picks, config.repeat_cooldown_hours, now);
        let new_symbols = self.watchlist.upsert(picks, now);
        let pruned = self.watchlist.prune_stale(config, now);

        self.previous_snapshot = delta::snapshot(scored, now);
        self.cycle_count += 1;
        self.last_cycle_at = Some(now);

        CycleUpdate {
            new_symbols,
            alerts,
            pruned,
            emit,
        }
    }
}

// ---------------------------------------------------------------------------
// Lock
// ---------------------------------------------------------------------------

/// Held lock on the state directory. Released on drop.
#[derive(Debug)]
pub struct StateLock {
    path: PathBuf,
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "Failed to release state lock");
        } else {
            debug!(path = %self.path.display(), "State lock released");
        }
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

pub struct StateStore {
    dir: PathBuf,
    config: StorageConfig,
}

impl StateStore {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            dir: PathBuf::from(&config.state_dir),
            config,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn state_path(&self) -> PathBuf {
        self.dir.join(STATE_FILE)
    }

    pub fn history_path(&self) -> PathBuf {
        self.dir.join(HISTORY_FILE)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.dir.join(LOCK_FILE)
    }

    fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create state dir {}", self.dir.display()))
    }

    /// Load state. Returns None if the file doesn't exist (fresh start).
    pub fn load(&self) -> Result<Option<ScannerState>> {
        let path = self.state_path();
        if !path.exists() {
            info!(path = %path.display(), "No saved state found, starting fresh");
            return Ok(None);
        }

        let json = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read state from {}", path.display()))?;
        let state: ScannerState = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse state from {}", path.display()))?;

        info!(
            path = %path.display(),
            watchlist = state.watchlist.len(),
            snapshot = state.previous_snapshot.len(),
            cycle_count = state.cycle_count,
            "State loaded from disk"
        );
        Ok(Some(state))
    }

    /// Write state atomically: serialise to a temp file in the same
    /// directory, then rename over the target.
    pub fn save(&self, state: &ScannerState) -> Result<()> {
        self.ensure_dir()?;
        let path = self.state_path();
        let tmp = self.dir.join(format!("{STATE_FILE}.{}.tmp", uuid::Uuid::new_v4()));

        let json = serde_json::to_string_pretty(state).context("Failed to serialise scanner state")?;
        let written = fs::write(&tmp, &json)
            .with_context(|| format!("Failed to write temp state {}", tmp.display()))
            .and_then(|_| {
                fs::rename(&tmp, &path)
                    .with_context(|| format!("Failed to move state into place at {}", path.display()))
            });
        if written.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        written?;

        debug!(path = %path.display(), cycle_count = state.cycle_count, "State saved");
        Ok(())
    }

    /// `save` with bounded retries and exponential backoff.
    pub async fn save_with_retry(&self, state: &ScannerState) -> Result<()> {
        let attempts = self.config.write_retries.max(1);
        let mut last_err = None;

        for attempt in 1..=attempts {
            match self.save(state) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(attempt, attempts, error = %e, "State write failed");
                    last_err = Some(e);
                    if attempt < attempts {
                        tokio::time::sleep(WRITE_BACKOFF * 2u32.pow(attempt - 1)).await;
                    }
                }
            }
        }

        let err = last_err.unwrap_or_else(|| anyhow!("state write failed"));
        error!(error = %err, "Giving up on state write");
        Err(err)
    }

    /// Append picks to the signals history, one line per pick.
    pub fn append_history(&self, records: &[SignalRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        self.ensure_dir()?;
        let path = self.history_path();

        let mut buf = String::new();
        for record in records {
            buf.push_str(&serde_json::to_string(record).context("Failed to serialise signal record")?);
            buf.push('\n');
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open history {}", path.display()))?;
        file.write_all(buf.as_bytes())
            .with_context(|| format!("Failed to append to history {}", path.display()))?;

        debug!(path = %path.display(), records = records.len(), "History appended");
        Ok(())
    }

    /// Read the full signals history. Unparseable lines are skipped.
    pub fn read_history(&self) -> Result<Vec<SignalRecord>> {
        let path = self.history_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read history {}", path.display()))?;

        let records = raw
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .filter_map(|(n, line)| match serde_json::from_str::<SignalRecord>(line) {
                Ok(r) => Some(r),
                Err(e) => {
                    warn!(line = n + 1, error = %e, "Skipping malformed history line");
                    None
                }
            })
            .collect();
        Ok(records)
    }

    fn lock_is_stale(&self, path: &Path) -> bool {
        let max_age = Duration::from_secs(self.config.lock_stale_secs);
        fs::metadata(path)
            .and_then(|m| m.modified())
            .map(|modified| modified.elapsed().unwrap_or_default() >= max_age)
            .unwrap_or(false)
    }

    /// Move a stale lock aside under a unique name, then delete it. Only one
    /// contender's rename can succeed; the others see NotFound and retry.
    /// A lock that was replaced between the check and the rename is put back.
    fn break_stale_lock(&self, path: &Path) {
        let aside = self.dir.join(format!("{LOCK_FILE}.stale-{}", uuid::Uuid::new_v4()));
        if let Err(e) = fs::rename(path, &aside) {
            debug!(path = %path.display(), error = %e, "Stale lock already taken");
            return;
        }
        if !self.lock_is_stale(&aside) {
            debug!(path = %path.display(), "Lock was refreshed before it could be broken");
            if let Err(e) = fs::hard_link(&aside, path) {
                warn!(path = %path.display(), error = %e, "Failed to restore live lock");
            }
            let _ = fs::remove_file(&aside);
            return;
        }
        warn!(path = %path.display(), "Breaking stale state lock");
        let _ = fs::remove_file(&aside);
    }

    /// Acquire the state lock, breaking it if older than `lock_stale_secs`
    /// and giving up after `lock_timeout_secs`.
    pub async fn acquire_lock(&self) -> Result<StateLock> {
        self.ensure_dir()?;
        let path = self.lock_path();
        let timeout = Duration::from_secs(self.config.lock_timeout_secs);
        let started = Instant::now();

        loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    let _ = writeln!(file, "{} {}", std::process::id(), Utc::now().to_rfc3339());
                    debug!(path = %path.display(), "State lock acquired");
                    return Ok(StateLock { path });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if self.lock_is_stale(&path) {
                        self.break_stale_lock(&path);
                        continue;
                    }
                    if started.elapsed() >= timeout {
                        return Err(ScoutError::Lock(format!(
                            "{} held by another process for more than {}s",
                            path.display(),
                            timeout.as_secs()
                        ))
                        .into());
                    }
                    tokio::time::sleep(LOCK_POLL).await;
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("Failed to create lock file {}", path.display()));
                }
            }
        }
    }

    /// Delete all persisted state (for testing or reset).
    pub fn reset(&self) -> Result<()> {
        for path in [self.state_path(), self.history_path()] {
            if path.exists() {
                fs::remove_file(&path).with_context(|| format!("Failed to delete {}", path.display()))?;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
