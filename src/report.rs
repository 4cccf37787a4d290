//! HTTP side-channel reporting
//!
//! This module mirrors each telemetry record to a remote collector:
//! - Probes the collector with a bounded retry schedule at startup
//! - POSTs the record as JSON, one connection per report, never reused
//! - Best effort: the outcome never affects the uplink path

use crate::config::ReportConfig;
use crate::payload::UplinkReport;
use crate::telemetry::TelemetryRecord;
use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

/// What became of one report attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    /// No network link; nothing was attempted
    Skipped,
    /// Collector accepted the report
    Delivered { status: u16 },
    /// Collector answered with a non-success status
    Rejected { status: u16 },
}

/// Side-channel reporter for telemetry records
pub struct Reporter {
    client: Client,
    url: String,
    link_up: bool,
}

impl Reporter {
    /// Build the reporter and probe the collector endpoint.
    ///
    /// Retries `connect_attempts` times with `connect_retry_ms` between
    /// attempts; any HTTP response counts as link-up. On exhaustion the
    /// reporter comes up link-down and every report is skipped, so the
    /// node still runs without the side channel.
    pub async fn connect(config: &ReportConfig) -> Result<Self> {
        info!(url = %config.url, "Connecting to collector");

        let client = Client::builder()
            // One connection per report; nothing is kept across cycles
            .pool_max_idle_per_host(0)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        let mut link_up = false;
        for attempt in 1..=config.connect_attempts {
            match client.get(&config.url).send().await {
                Ok(response) => {
                    info!(status = %response.status(), attempt, "Collector reachable");
                    link_up = true;
                    break;
                }
                Err(e) => {
                    debug!(error = %e, attempt, "Collector not reachable yet");
                    tokio::time::sleep(Duration::from_millis(config.connect_retry_ms)).await;
                }
            }
        }

        if !link_up {
            warn!(
                attempts = config.connect_attempts,
                "Network link unavailable, reports will be skipped"
            );
        }

        Ok(Self {
            client,
            url: config.url.clone(),
            link_up,
        })
    }

    pub fn link_up(&self) -> bool {
        self.link_up
    }

    /// Send one record to the collector.
    ///
    /// Exactly one attempt: no retry, no backoff. With the link down this
    /// short-circuits without touching the network.
    pub async fn report(&self, record: &TelemetryRecord) -> Result<ReportOutcome> {
        if !self.link_up {
            debug!("Network link down, skipping report");
            return Ok(ReportOutcome::Skipped);
        }

        let body = UplinkReport::from_record(record);
        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .context("Failed to deliver report to collector")?;

        let status = response.status();
        if status.is_success() {
            // Response body is logged, not parsed
            let text = response.text().await.unwrap_or_default();
            if !text.is_empty() {
                debug!(body = %text, "Collector response");
            }
            info!(status = %status, packet = record.sequence, "Report delivered");
            Ok(ReportOutcome::Delivered {
                status: status.as_u16(),
            })
        } else {
            warn!(status = %status, packet = record.sequence, "Collector rejected report");
            Ok(ReportOutcome::Rejected {
                status: status.as_u16(),
            })
        }
    }
}
