//! Event-driven uplink scheduling
//!
//! The heart of the node: a small state machine over the link lifecycle
//! that decides, on each tick, whether to request a join, transmit a
//! fresh telemetry frame, or drop the cycle because an exchange is still
//! in flight. MAC events drive the transitions and tell the caller when
//! to re-arm the next one-shot tick.
//!
//! Nothing here is fatal: join failures retry forever at a fixed
//! interval, a busy radio drops the cycle, and a rejected uplink is
//! skipped until the next interval.

use crate::mac::{MacEngine, MacEvent};
use crate::payload;
use crate::telemetry::{self, TelemetryRecord};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Fixed backoff between join attempts, never exponential
pub const JOIN_RETRY_INTERVAL: Duration = Duration::from_secs(10);

/// Link lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No session yet; ticks turn into join requests
    AwaitingJoin,
    /// Joined, no exchange pending
    Idle,
    /// A transmit/receive exchange is in flight
    TxPending,
}

/// What a tick resolved to. The caller re-arms the next tick from
/// `retry_in` where present; after `Uplinked` the next tick is armed by
/// the completion event instead.
#[derive(Debug, Clone, PartialEq)]
pub enum TickAction {
    /// An exchange is in flight; this cycle is dropped, not queued
    Busy,
    /// Join requested; tick again after the retry interval
    JoinRequested { retry_in: Duration },
    /// Frame handed to the MAC engine; the record is ready for the side channel
    Uplinked { record: TelemetryRecord },
    /// The MAC engine refused the frame; skip this cycle
    SendFailed { retry_in: Duration },
}

/// The uplink scheduler state machine
pub struct Scheduler {
    state: LinkState,
    sequence: u16,
    tx_interval: Duration,
    battery_volts: f32,
}

impl Scheduler {
    pub fn new(tx_interval: Duration, battery_volts: f32) -> Self {
        Self {
            state: LinkState::AwaitingJoin,
            sequence: 0,
            tx_interval,
            battery_volts,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// One scheduling cycle: sample, encode and transmit if the link is
    /// ready, otherwise request a join or drop the cycle.
    pub fn on_tick(&mut self, mac: &mut impl MacEngine) -> TickAction {
        match self.state {
            LinkState::TxPending => {
                info!("Exchange still in flight, not sending");
                TickAction::Busy
            }
            LinkState::AwaitingJoin => {
                info!(
                    retry_secs = JOIN_RETRY_INTERVAL.as_secs(),
                    "Not joined yet, requesting join"
                );
                if let Err(e) = mac.start_join() {
                    warn!(error = %e, "Join request rejected by MAC engine");
                }
                TickAction::JoinRequested {
                    retry_in: JOIN_RETRY_INTERVAL,
                }
            }
            LinkState::Idle => {
                let record =
                    telemetry::sample(&mac.session(), &mut self.sequence, self.battery_volts);
                let frame = payload::encode_uplink(&record);

                info!(
                    packet = record.sequence,
                    rssi_dbm = record.device_rssi,
                    snr_db = record.device_snr,
                    sf = record.spreading_factor,
                    freq_hz = record.frequency_hz,
                    battery_v = record.battery_volts,
                    "Queueing range test frame (confirmed)"
                );

                match mac.send_uplink(&frame, true) {
                    Ok(()) => {
                        self.state = LinkState::TxPending;
                        TickAction::Uplinked { record }
                    }
                    Err(e) => {
                        error!(error = %e, "Uplink rejected, skipping this cycle");
                        TickAction::SendFailed {
                            retry_in: self.tx_interval,
                        }
                    }
                }
            }
        }
    }

    /// React to a MAC engine notification. Returns the delay at which the
    /// caller must re-arm the tick, or `None` to leave any pending tick
    /// untouched.
    pub fn on_event(&mut self, event: &MacEvent, mac: &mut impl MacEngine) -> Option<Duration> {
        match event {
            MacEvent::Joined => {
                let dev_addr = format!("{:08x}", mac.session().dev_addr);
                info!(dev_addr = %dev_addr, "Joined");
                // Link-check validation is re-enabled automatically during
                // join; a degraded link must not trigger a rejoin storm
                mac.set_link_check(false);
                self.state = LinkState::Idle;
                None
            }
            MacEvent::JoinFailed | MacEvent::RejoinFailed => {
                warn!(
                    event = event.name(),
                    retry_secs = JOIN_RETRY_INTERVAL.as_secs(),
                    "Join failed, will retry"
                );
                self.state = LinkState::AwaitingJoin;
                Some(JOIN_RETRY_INTERVAL)
            }
            MacEvent::JoinTxComplete => {
                warn!(
                    retry_secs = JOIN_RETRY_INTERVAL.as_secs(),
                    "No JoinAccept received, will retry"
                );
                self.state = LinkState::AwaitingJoin;
                Some(JOIN_RETRY_INTERVAL)
            }
            MacEvent::TxComplete { ack, downlink } => {
                if self.state != LinkState::TxPending {
                    debug!("tx-complete with no exchange pending, ignoring");
                    return None;
                }
                match ack {
                    Some(quality) => info!(
                        gateway_rssi_dbm = quality.rssi,
                        gateway_snr_db = quality.snr,
                        "Ack received"
                    ),
                    None => info!("Exchange complete, no ack"),
                }
                if !downlink.is_empty() {
                    // Logged only; this device does not parse downlink commands
                    info!(
                        len = downlink.len(),
                        data = %hex::encode(downlink),
                        "Downlink payload"
                    );
                }
                self.state = LinkState::Idle;
                Some(self.tx_interval)
            }
            MacEvent::RxStart => {
                // Never log here: the RX window is timing-critical
                None
            }
            MacEvent::Unknown(code) => {
                warn!(code = code, "Unknown MAC event");
                None
            }
            other => {
                debug!(event = other.name(), "MAC event");
                None
            }
        }
    }
}
