//! LoRaWAN Range-Test Node Service
//!
//! This service:
//! - Joins the network over the LoRaWAN MAC engine (OTAA), retrying forever
//! - Samples link quality on a fixed interval and uplinks an 11-byte
//!   confirmed frame
//! - Mirrors each record to an HTTP collector over the local network,
//!   best effort
//!
//! Architecture: one-shot tick → sampler → codec → MAC uplink → completion
//! event → re-arm. A single flow of control services both the tick and the
//! MAC engine's event callbacks.

use anyhow::{Context, Result};
use rangetest_node::config::Config;
use rangetest_node::mac::{MacEngine, MacEvent};
use rangetest_node::report::Reporter;
use rangetest_node::scheduler::{Scheduler, TickAction};
use rangetest_node::sim::SimMacEngine;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use tracing::{error, info, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize tracing subscriber for structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("LoRaWAN range test node starting");
    info!(region = "EU868", "Target: ChirpStack gateway");

    // Load configuration
    let config = Config::load("config.toml").context("Failed to load config.toml")?;
    info!("Configuration loaded successfully");

    // Print join identifiers for cross-checking against the network server
    info!(
        dev_eui = %config.lorawan.dev_eui,
        join_eui = %config.lorawan.join_eui,
        "OTAA identifiers"
    );

    // Bring up the side channel; the node runs fine without it
    let reporter = if config.wifi.enabled {
        info!(ssid = %config.wifi.ssid, "Bringing up network link");
        Some(
            Reporter::connect(&config.report)
                .await
                .context("Failed to create reporter")?,
        )
    } else {
        info!("Side channel disabled");
        None
    };

    // The MAC engine delivers events through this channel. The simulated
    // engine stands in for the radio stack on a development host.
    let (events_tx, events_rx) = mpsc::channel::<MacEvent>(16);
    let mac = SimMacEngine::new(events_tx);

    let scheduler = Scheduler::new(
        Duration::from_secs(config.lorawan.tx_interval_secs),
        config.device.battery_volts,
    );

    run(mac, events_rx, scheduler, reporter).await
}

/// Drive the scheduler: one-shot tick re-armed by the handlers themselves,
/// MAC events serviced in between. Single flow of control, no locks.
async fn run<M: MacEngine>(
    mut mac: M,
    mut events: mpsc::Receiver<MacEvent>,
    mut scheduler: Scheduler,
    reporter: Option<Reporter>,
) -> Result<()> {
    // The first cycle fires immediately; it turns into a join request
    let mut next_tick: Option<Instant> = Some(Instant::now());

    loop {
        let deadline = next_tick.unwrap_or_else(Instant::now);

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down");
                break;
            }
            _ = sleep_until(deadline), if next_tick.is_some() => {
                next_tick = None;
                match scheduler.on_tick(&mut mac) {
                    // Next tick is armed by the completion event
                    TickAction::Busy => {}
                    TickAction::JoinRequested { retry_in }
                    | TickAction::SendFailed { retry_in } => {
                        next_tick = Some(Instant::now() + retry_in);
                    }
                    TickAction::Uplinked { record } => {
                        // Strictly after the frame hand-off: the HTTP exchange
                        // must not delay the radio path
                        if let Some(reporter) = &reporter {
                            if let Err(e) = reporter.report(&record).await {
                                error!(error = %e, "Failed to deliver report");
                            }
                        }
                    }
                }
            }
            event = events.recv() => match event {
                Some(event) => {
                    if let Some(delay) = scheduler.on_event(&event, &mut mac) {
                        next_tick = Some(Instant::now() + delay);
                    }
                }
                None => {
                    warn!("MAC event channel closed");
                    break;
                }
            }
        }
    }

    info!("Range test node stopped");
    Ok(())
}
