//! SCOUT: crypto narrative and on-chain opportunity scanner
//!
//! Entry point. Loads configuration, initialises structured logging,
//! restores state from disk (or starts fresh), and runs the scan loop
//! with graceful shutdown.

use anyhow::Result;
use chrono::Utc;
use secrecy::Secret;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use scout::config::{self, AppConfig};
use scout::dashboard;
use scout::dashboard::routes::DashboardState;
use scout::data::feed::HttpFeed;
use scout::data::{MarketDataSource, PresenceSource};
use scout::engine::{CycleOutcome, CycleReport, ScanOrchestrator, UniverseScanner};
use scout::notify::webhook::WebhookNotifier;
use scout::notify::{LogNotifier, Notifier};
use scout::storage::StateStore;
use scout::strategy::ScoringPipeline;

const BANNER: &str = r#"
 ____   ____ ___  _   _ _____
/ ___| / ___/ _ \| | | |_   _|
\___ \| |  | | | | | | | | |
 ___) | |__| |_| | |_| | | |
|____/ \____\___/ \___/  |_|

  Crypto narrative and on-chain opportunity scanner
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cfg = config::AppConfig::load_or_default("config.toml")?;

    init_logging();

    println!("{BANNER}");
    info!(
        scanner = %cfg.scanner.name,
        scan_interval_secs = cfg.scanner.scan_interval_secs,
        top_k = cfg.selection.top_k,
        flow_enabled = cfg.flow.enabled,
        events_enabled = cfg.events.enabled,
        "SCOUT starting up"
    );

    // -- Initialise components -------------------------------------------

    let api_key = cfg
        .feed
        .api_key_env
        .as_deref()
        .and_then(|env| AppConfig::resolve_env(env).ok())
        .map(Secret::new);
    if api_key.is_none() {
        warn!("No feed API key configured, requests will be unauthenticated");
    }
    let feed = Arc::new(HttpFeed::new(
        &cfg.feed.base_url,
        api_key,
        Duration::from_secs(cfg.scanner.fetch_timeout_secs),
    )?);
    let market: Arc<dyn MarketDataSource> = feed.clone();
    let presence: Arc<dyn PresenceSource> = feed;

    let mut scanner = UniverseScanner::new(market, Some(presence), cfg.scanner.clone());
    if cfg.events.enabled {
        scanner = scanner.with_events(cfg.events.max_events);
    }
    let pipeline = ScoringPipeline::from_config(&cfg);
    let store = StateStore::new(cfg.storage.clone());

    let mut notifiers: Vec<Arc<dyn Notifier>> = vec![Arc::new(LogNotifier)];
    if let Some(env) = cfg.notify.webhook_url_env.as_deref() {
        match AppConfig::resolve_env(env) {
            Ok(url) => {
                notifiers.push(Arc::new(WebhookNotifier::new(Secret::new(url))?));
                info!("Webhook notifier enabled");
            }
            Err(e) => warn!(error = %e, "Webhook notifier disabled"),
        }
    }

    let mut orchestrator =
        ScanOrchestrator::new(scanner, pipeline, store, notifiers, cfg.watchlist.clone());

    // -- Restore state ---------------------------------------------------

    if let Err(e) = orchestrator.restore() {
        error!(error = %e, "Failed to restore state, starting fresh");
    }

    // -- Status server ---------------------------------------------------

    let dashboard_state = if cfg.dashboard.enabled {
        let state = Arc::new(DashboardState::new(&cfg.scanner.name, orchestrator.state()));
        match dashboard::spawn_dashboard(state.clone(), cfg.dashboard.port).await {
            Ok(()) => Some(state),
            Err(e) => {
                error!(error = %e, "Status server failed to start");
                None
            }
        }
    } else {
        None
    };

    // -- Main loop -------------------------------------------------------

    let mut interval = tokio::time::interval(Duration::from_secs(cfg.scanner.scan_interval_secs));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(
        interval_secs = cfg.scanner.scan_interval_secs,
        "Entering main loop. Press Ctrl+C to stop."
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match orchestrator.run_cycle(Utc::now()).await {
                    Ok(report) => {
                        log_cycle_report(&report);
                        if let Some(state) = &dashboard_state {
                            state.record_cycle(&report, orchestrator.state()).await;
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "Cycle failed, continuing to next");
                    }
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    let state = orchestrator.state();
    info!(
        cycles = state.cycle_count,
        watchlist = state.watchlist.len(),
        "SCOUT shut down cleanly."
    );

    Ok(())
}

/// Log a one-line cycle summary.
fn log_cycle_report(report: &CycleReport) {
    match &report.outcome {
        CycleOutcome::SourceOutage(msg) => {
            warn!(cycle_id = %report.cycle_id, detail = %msg, "Cycle skipped");
        }
        CycleOutcome::Completed => {
            info!(
                cycle = report.cycle_number,
                universe = report.universe_size,
                missing_series = report.missing_series,
                scored = report.scored,
                tier = %report.tier,
                picks = ?report.pick_symbols(),
                emitted = report.emitted,
                alerts = report.alerts.len(),
                new = report.new_symbols.len(),
                pruned = report.pruned.len(),
                persisted = report.persisted,
                notify_failures = report.notify_failures,
                duration_ms = report.duration_ms(),
                "Cycle complete"
            );
        }
    }
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("scout=info"));

    if std::env::var("SCOUT_LOG_JSON").is_ok() {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
