//! Status API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<DashboardState>`.

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::engine::report::{CycleOutcome, CycleReport};
use crate::storage::ScannerState;
use crate::types::{ScoredAsset, WatchlistEntry};

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct CycleSummary {
    cycle_count: u64,
    last_cycle_at: Option<DateTime<Utc>>,
    last_outcome: Option<String>,
    last_pick_count: usize,
    trending: Vec<String>,
}

/// Shared state accessible by all route handlers.
pub struct DashboardState {
    scanner_name: String,
    started_at: DateTime<Utc>,
    summary: RwLock<CycleSummary>,
    picks: RwLock<Vec<ScoredAsset>>,
    watchlist: RwLock<Vec<WatchlistEntry>>,
}

impl DashboardState {
    pub fn new(scanner_name: &str, initial: &ScannerState) -> Self {
        Self {
            scanner_name: scanner_name.to_string(),
            started_at: Utc::now(),
            summary: RwLock::new(CycleSummary {
                cycle_count: initial.cycle_count,
                last_cycle_at: initial.last_cycle_at,
                last_outcome: None,
                last_pick_count: 0,
                trending: Vec::new(),
            }),
            picks: RwLock::new(Vec::new()),
            watchlist: RwLock::new(initial.watchlist.entries().cloned().collect()),
        }
    }

    /// Publish a finished cycle. Outage cycles only update the outcome.
    pub async fn record_cycle(&self, report: &CycleReport, state: &ScannerState) {
        let mut summary = self.summary.write().await;
        summary.last_outcome = Some(match &report.outcome {
            CycleOutcome::Completed => "completed".to_string(),
            CycleOutcome::SourceOutage(msg) => format!("source_outage: {msg}"),
        });
        if report.is_outage() {
            return;
        }

        summary.cycle_count = state.cycle_count;
        summary.last_cycle_at = state.last_cycle_at;
        summary.last_pick_count = report.picks.len();
        summary.trending = report.trending.iter().map(|(n, _)| n.to_string()).collect();
        drop(summary);

        *self.picks.write().await = report.picks.clone();
        *self.watchlist.write().await = state.watchlist.entries().cloned().collect();
    }
}

pub type AppState = Arc<DashboardState>;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub scanner: String,
    pub cycle_count: u64,
    pub last_cycle_at: Option<DateTime<Utc>>,
    pub last_outcome: Option<String>,
    pub last_pick_count: usize,
    pub trending_narratives: Vec<String>,
    pub uptime_secs: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PickEntry {
    pub symbol: String,
    pub name: String,
    pub score: f64,
    pub price: f64,
    pub rsi: Option<f64>,
    pub tags: String,
    pub real_presence: bool,
}

impl From<&ScoredAsset> for PickEntry {
    fn from(p: &ScoredAsset) -> Self {
        Self {
            symbol: p.symbol.clone(),
            name: p.name.clone(),
            score: p.score,
            price: p.price,
            rsi: p.rsi(),
            tags: p.tags.to_string(),
            real_presence: p.is_real_presence(),
        }
    }
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /api/status
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let summary = state.summary.read().await;
    Json(StatusResponse {
        scanner: state.scanner_name.clone(),
        cycle_count: summary.cycle_count,
        last_cycle_at: summary.last_cycle_at,
        last_outcome: summary.last_outcome.clone(),
        last_pick_count: summary.last_pick_count,
        trending_narratives: summary.trending.clone(),
        uptime_secs: (Utc::now() - state.started_at).num_seconds(),
    })
}

/// GET /api/picks
pub async fn get_picks(State(state): State<AppState>) -> Json<Vec<PickEntry>> {
    let picks = state.picks.read().await;
    Json(picks.iter().map(PickEntry::from).collect())
}

/// GET /api/watchlist
pub async fn get_watchlist(State(state): State<AppState>) -> Json<Vec<WatchlistEntry>> {
    Json(state.watchlist.read().await.clone())
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
