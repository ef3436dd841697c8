//! End-to-end scan cycles through the public API.

#[cfg(test)]
mod tests {
    use crate::mock_source::{MockSource, RecordingNotifier};
    use axum::body::Body;
    use axum::http::Request;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::path::PathBuf;
    use std::sync::Arc;
    use tower::ServiceExt;
    use uuid::Uuid;

    use scout::config::{AppConfig, StorageConfig, WatchlistConfig};
    use scout::data::{MarketDataSource, PresenceSource};
    use scout::dashboard::{build_router, routes::DashboardState};
    use scout::engine::{CycleOutcome, ScanOrchestrator, UniverseScanner};
    use scout::notify::Notifier;
    use scout::storage::{ScannerState, StateStore};
    use scout::strategy::selector::Tier;
    use scout::strategy::ScoringPipeline;
    use scout::types::Narrative;

    fn t0() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn temp_dir() -> PathBuf {
        let mut dir = std::env::temp_dir();
        dir.push(format!("scout_it_{}", Uuid::new_v4()));
        dir
    }

    fn build(
        source: Arc<MockSource>,
        notifier: Arc<RecordingNotifier>,
        dir: &PathBuf,
        watchlist: WatchlistConfig,
    ) -> ScanOrchestrator {
        let config = AppConfig {
            storage: StorageConfig {
                state_dir: dir.to_string_lossy().to_string(),
                ..StorageConfig::default()
            },
            watchlist,
            ..AppConfig::default()
        };
        let notifiers: Vec<Arc<dyn Notifier>> = vec![notifier as Arc<dyn Notifier>];
        let market: Arc<dyn MarketDataSource> = source.clone();
        let presence: Arc<dyn PresenceSource> = source;
        ScanOrchestrator::new(
            UniverseScanner::new(market, Some(presence), config.scanner.clone()),
            ScoringPipeline::from_config(&config),
            StateStore::new(config.storage.clone()),
            notifiers,
            config.watchlist.clone(),
        )
    }

    // -- Full cycle --------------------------------------------------------

    #[tokio::test]
    async fn test_strong_pick_end_to_end() {
        let dir = temp_dir();
        let source = Arc::new(MockSource::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let mut o = build(source, notifier.clone(), &dir, WatchlistConfig::default());

        let report = o.run_cycle(t0()).await.unwrap();
        assert_eq!(report.outcome, CycleOutcome::Completed);
        assert_eq!(report.tier, Tier::Strong);
        assert_eq!(report.pick_symbols(), vec!["ABC"]);
        assert!(report.picks[0].score >= 0.80);
        assert!(report.picks[0].is_real_presence());
        assert!(report.persisted);

        assert_eq!(notifier.pick_batches(), vec![vec!["ABC".to_string()]]);
        assert_eq!(notifier.alert_count(), 0);

        let store = StateStore::new(StorageConfig {
            state_dir: dir.to_string_lossy().to_string(),
            ..StorageConfig::default()
        });
        let saved = store.load().unwrap().unwrap();
        assert_eq!(saved.cycle_count, 1);
        assert!(saved.watchlist.contains("ABC"));
        assert!(!saved.watchlist.contains("DUD"));
        let history = store.read_history().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].cycle_id, report.cycle_id);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_price_move_raises_delta_alert() {
        let dir = temp_dir();
        let source = Arc::new(MockSource::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let mut o = build(source.clone(), notifier.clone(), &dir, WatchlistConfig::default());

        o.run_cycle(t0()).await.unwrap();

        // +3% stays quiet
        source.set_price("ABC", 1.648);
        let report = o.run_cycle(t0() + Duration::minutes(30)).await.unwrap();
        assert!(report.alerts.is_empty());

        // +10% over the previous cycle alerts
        source.set_price("ABC", 1.8128);
        let report = o.run_cycle(t0() + Duration::minutes(60)).await.unwrap();
        assert_eq!(report.alerts.len(), 1);
        assert_eq!(report.alerts[0].symbol, "ABC");
        assert_eq!(report.alerts[0].price_change_pct, 10.0);
        assert_eq!(notifier.alert_count(), 1);

        let _ = std::fs::remove_dir_all(&dir);
    }

    // -- Outage ------------------------------------------------------------

    #[tokio::test]
    async fn test_outage_then_recovery() {
        let dir = temp_dir();
        let source = Arc::new(MockSource::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let mut o = build(source.clone(), notifier.clone(), &dir, WatchlistConfig::default());

        source.set_error("gateway timeout");
        let report = o.run_cycle(t0()).await.unwrap();
        assert!(report.is_outage());
        assert_eq!(report.cycle_number, 0);
        assert!(notifier.pick_batches().is_empty());
        assert!(!dir.join("watchlist.json").exists());

        source.clear_error();
        let report = o.run_cycle(t0() + Duration::minutes(30)).await.unwrap();
        assert_eq!(report.outcome, CycleOutcome::Completed);
        assert_eq!(report.cycle_number, 1);

        let _ = std::fs::remove_dir_all(&dir);
    }

    // -- Cooldown ----------------------------------------------------------

    #[tokio::test]
    async fn test_repeat_cooldown_suppresses_emit_not_selection() {
        let dir = temp_dir();
        let source = Arc::new(MockSource::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let watchlist = WatchlistConfig {
            repeat_cooldown_hours: 24,
            ..WatchlistConfig::default()
        };
        let mut o = build(source, notifier.clone(), &dir, watchlist);

        o.run_cycle(t0()).await.unwrap();
        let second = o.run_cycle(t0() + Duration::hours(1)).await.unwrap();
        assert_eq!(second.pick_symbols(), vec!["ABC"]);
        assert_eq!(second.emitted, 0);

        let third = o.run_cycle(t0() + Duration::hours(25)).await.unwrap();
        assert_eq!(third.emitted, 1);
        assert_eq!(notifier.pick_batches().len(), 2);

        let _ = std::fs::remove_dir_all(&dir);
    }

    // -- Shared state ------------------------------------------------------

    #[tokio::test]
    async fn test_two_scanners_share_state_dir() {
        let dir = temp_dir();
        let source = Arc::new(MockSource::new());
        let mut first = build(
            source.clone(),
            Arc::new(RecordingNotifier::default()),
            &dir,
            WatchlistConfig::default(),
        );
        let mut second = build(
            source,
            Arc::new(RecordingNotifier::default()),
            &dir,
            WatchlistConfig::default(),
        );

        first.run_cycle(t0()).await.unwrap();
        let report = second.run_cycle(t0() + Duration::minutes(5)).await.unwrap();

        // The second scanner picked up the first one's state from disk.
        assert_eq!(report.cycle_number, 2);
        assert!(report.new_symbols.is_empty());
        assert_eq!(second.state().watchlist.get("ABC").unwrap().times_picked, 2);

        let _ = std::fs::remove_dir_all(&dir);
    }

    // -- Trending and status server -----------------------------------------

    #[tokio::test]
    async fn test_trending_narratives_reach_status_api() {
        let dir = temp_dir();
        let source = Arc::new(MockSource::new());
        source.set_trending(&[
            "New AI agents launch on mainnet",
            "AI inference demand keeps climbing",
            "DeFi yields compress",
        ]);
        let mut o = build(source, Arc::new(RecordingNotifier::default()), &dir, WatchlistConfig::default());

        let report = o.run_cycle(t0()).await.unwrap();
        assert_eq!(report.trending[0].0, Narrative::Ai);

        let state = Arc::new(DashboardState::new("SCOUT-IT", &ScannerState::default()));
        state.record_cycle(&report, o.state()).await;
        let app = build_router(state);

        let resp = app
            .clone()
            .oneshot(Request::builder().uri("/api/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = axum::body::to_bytes(resp.into_body(), 100_000).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["cycle_count"], 1);
        assert_eq!(json["last_pick_count"], 1);
        assert_eq!(json["trending_narratives"][0], "AI");

        let resp = app
            .oneshot(Request::builder().uri("/api/watchlist").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = axum::body::to_bytes(resp.into_body(), 100_000).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json[0]["symbol"], "ABC");

        let _ = std::fs::remove_dir_all(&dir);
    }
}
