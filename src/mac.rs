//! LoRaWAN MAC engine boundary
//!
//! The MAC/PHY stack (join procedure, retransmission, ADR, duty cycle,
//! crypto, radio timing) lives outside this crate. [`MacEngine`] is the
//! surface we consume; [`MacEvent`] is the fixed set of notifications the
//! engine delivers back into the scheduler.

use thiserror::Error;

/// Gateway-side link quality carried on a confirmed-uplink acknowledgement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckQuality {
    /// RSSI in dBm as observed by the network side
    pub rssi: i16,
    /// SNR in dB as observed by the network side
    pub snr: i8,
}

/// Notification from the MAC engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MacEvent {
    ScanTimeout,
    BeaconFound,
    BeaconMissed,
    BeaconTracked,
    Joining,
    Joined,
    JoinFailed,
    RejoinFailed,
    /// A transmit/receive exchange finished, including the RX windows.
    /// `ack` is present when the network acknowledged a confirmed uplink;
    /// `downlink` holds any application payload piggybacked on the downlink.
    TxComplete {
        ack: Option<AckQuality>,
        downlink: Vec<u8>,
    },
    LostSync,
    Reset,
    RxComplete,
    LinkDead,
    LinkAlive,
    TxStart,
    TxCanceled,
    RxStart,
    /// A join request went out but no JoinAccept arrived in the RX windows
    JoinTxComplete,
    Unknown(u8),
}

impl MacEvent {
    /// Event name for diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            MacEvent::ScanTimeout => "scan-timeout",
            MacEvent::BeaconFound => "beacon-found",
            MacEvent::BeaconMissed => "beacon-missed",
            MacEvent::BeaconTracked => "beacon-tracked",
            MacEvent::Joining => "joining",
            MacEvent::Joined => "joined",
            MacEvent::JoinFailed => "join-failed",
            MacEvent::RejoinFailed => "rejoin-failed",
            MacEvent::TxComplete { .. } => "tx-complete",
            MacEvent::LostSync => "lost-sync",
            MacEvent::Reset => "reset",
            MacEvent::RxComplete => "rx-complete",
            MacEvent::LinkDead => "link-dead",
            MacEvent::LinkAlive => "link-alive",
            MacEvent::TxStart => "tx-start",
            MacEvent::TxCanceled => "tx-canceled",
            MacEvent::RxStart => "rx-start",
            MacEvent::JoinTxComplete => "join-tx-complete",
            MacEvent::Unknown(_) => "unknown",
        }
    }
}

/// Snapshot of the MAC session state
///
/// RSSI/SNR reflect the most recent completed exchange, not the one in
/// flight, so sampled values lag the current transmission by one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionState {
    /// RSSI of the last received downlink at the device, in dBm
    pub device_rssi: i16,
    /// SNR of the last received downlink at the device, in dB
    pub device_snr: i8,
    /// Channel frequency of the last transmission, in Hz
    pub frequency_hz: u32,
    /// Region-specific data rate index currently in use
    pub data_rate: u8,
    /// Assigned device address; zero until a join completes
    pub dev_addr: u32,
}

impl SessionState {
    pub fn joined(&self) -> bool {
        self.dev_addr != 0
    }
}

/// Why the MAC engine refused a request
#[derive(Debug, Error)]
pub enum MacError {
    #[error("a transmit/receive exchange is already in flight")]
    Busy,
    #[error("no active session, join first")]
    NotJoined,
    #[error("radio rejected the request: {0}")]
    Radio(String),
}

/// The MAC engine surface consumed by the scheduler
pub trait MacEngine {
    /// Kick off (or restart) the OTAA join procedure. The outcome arrives
    /// asynchronously as `Joined`, `JoinFailed` or `JoinTxComplete`.
    fn start_join(&mut self) -> Result<(), MacError>;

    /// Queue an uplink frame. Completion arrives later as `TxComplete`;
    /// `confirmed` requests an acknowledgement from the network.
    fn send_uplink(&mut self, payload: &[u8], confirmed: bool) -> Result<(), MacError>;

    /// Snapshot of the current session
    fn session(&self) -> SessionState;

    /// Enable or disable the engine's link-check validation
    fn set_link_check(&mut self, enabled: bool);
}
