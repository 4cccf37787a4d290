//! Uplink payload encoding
//!
//! Two encodings of the same telemetry record:
//! - An 11-byte big-endian frame for the LoRaWAN uplink
//! - A flat JSON object for the HTTP side channel
//!
//! Binary layout (matches the ChirpStack decoder on the network side):
//!
//! ```text
//! offset  bytes  field
//! 0       2      sequence, big-endian
//! 2       1      device RSSI + 200
//! 3       1      device SNR + 128
//! 4       1      spreading factor
//! 5       4      frequency in Hz, big-endian
//! 9       2      battery in millivolts, big-endian
//! ```
//!
//! Gateway RSSI is deliberately absent from the binary frame: the uplink
//! is airtime-budgeted, and the value is only of interest to the
//! collector. It travels in the JSON report instead.

use crate::telemetry::TelemetryRecord;
use serde::Serialize;

/// Size of the binary uplink frame
pub const UPLINK_FRAME_LEN: usize = 11;

/// Offset applied to device RSSI so typical values (-150..-20 dBm) fit an
/// unsigned byte. Lossy outside [-200, 55].
pub const RSSI_OFFSET: i16 = 200;

/// Offset applied to device SNR before truncation to a byte
pub const SNR_OFFSET: i16 = 128;

/// Encode the compact binary uplink frame
pub fn encode_uplink(record: &TelemetryRecord) -> [u8; UPLINK_FRAME_LEN] {
    let mut frame = [0u8; UPLINK_FRAME_LEN];
    frame[0..2].copy_from_slice(&record.sequence.to_be_bytes());
    frame[2] = (record.device_rssi + RSSI_OFFSET) as u8;
    frame[3] = (i16::from(record.device_snr) + SNR_OFFSET) as u8;
    frame[4] = record.spreading_factor;
    frame[5..9].copy_from_slice(&record.frequency_hz.to_be_bytes());
    let battery_mv = (record.battery_volts * 1000.0).round() as u16;
    frame[9..11].copy_from_slice(&battery_mv.to_be_bytes());
    frame
}

/// JSON body sent to the HTTP collector
///
/// Unlike the binary frame this includes `gw_rssi` (zero until the
/// network-side value is known).
#[derive(Debug, Clone, Serialize)]
pub struct UplinkReport {
    pub packet: u16,
    pub rssi: i16,
    pub snr: i8,
    pub sf: u8,
    pub freq: u32,
    pub gw_rssi: i16,
    pub battery: f64,
}

impl UplinkReport {
    pub fn from_record(record: &TelemetryRecord) -> Self {
        Self {
            packet: record.sequence,
            rssi: record.device_rssi,
            snr: record.device_snr,
            sf: record.spreading_factor,
            freq: record.frequency_hz,
            gw_rssi: record.gateway_rssi,
            // Two decimal digits, as the collector displays volts
            battery: (f64::from(record.battery_volts) * 100.0).round() / 100.0,
        }
    }
}
