//! JSON webhook notifier.
//!
//! POSTs `{"kind": "picks" | "delta_alerts", "cycle": <uuid>, "items": [...]}`
//! to a URL held as a secret, since webhook URLs usually embed a token.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use super::Notifier;
use crate::types::{DeltaAlert, ScoredAsset, ScoutError};

const CHANNEL: &str = "webhook";

#[derive(Debug, Serialize)]
struct Payload<'a, T: Serialize> {
    kind: &'a str,
    cycle: Uuid,
    items: &'a [T],
}

pub struct WebhookNotifier {
    http: Client,
    url: Secret<String>,
}

impl WebhookNotifier {
    pub fn new(url: Secret<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent("SCOUT/0.1.0")
            .build()
            .context("Failed to build HTTP client for webhook")?;
        Ok(Self { http, url })
    }

    async fn post<T: Serialize + Sync>(&self, kind: &str, cycle: Uuid, items: &[T]) -> Result<()> {
        let payload = Payload { kind, cycle, items };

        let resp = self
            .http
            .post(self.url.expose_secret().as_str())
            .json(&payload)
            .send()
            .await
            .map_err(|e| ScoutError::Notify {
                channel: CHANNEL.into(),
                message: e.without_url().to_string(),
            })?;

        if !resp.status().is_success() {
            return Err(ScoutError::Notify {
                channel: CHANNEL.into(),
                message: format!("webhook returned {}", resp.status()),
            }
            .into());
        }

        debug!(kind, items = items.len(), "Webhook delivered");
        Ok(())
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn emit_picks(&self, cycle: Uuid, picks: &[ScoredAsset]) -> Result<()> {
        self.post("picks", cycle, picks).await
    }

    async fn emit_delta_alerts(&self, cycle: Uuid, alerts: &[DeltaAlert]) -> Result<()> {
        self.post("delta_alerts", cycle, alerts).await
    }

    fn name(&self) -> &str {
        CHANNEL
    }
}
