//! Link-quality telemetry sampling

use crate::mac::SessionState;
use serde::{Deserialize, Serialize};

/// `gateway_rssi` value used until network-side quality is known
pub const GATEWAY_RSSI_UNKNOWN: i16 = 0;

/// One cycle's worth of link-quality measurements
///
/// Built fresh for every transmission cycle and discarded once encoded;
/// there is no history buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    /// Per-boot packet counter, wraps at 65536
    pub sequence: u16,
    /// RSSI of the most recent downlink at the device, in dBm
    pub device_rssi: i16,
    /// SNR of the most recent downlink at the device, in dB
    pub device_snr: i8,
    /// Spreading factor derived from the current data rate index
    pub spreading_factor: u8,
    /// Channel frequency of the last transmission, in Hz
    pub frequency_hz: u32,
    /// RSSI as observed by the network side, in dBm
    pub gateway_rssi: i16,
    /// Supply voltage in volts
    pub battery_volts: f32,
}

/// Map an EU868 data rate index to its spreading factor.
///
/// DR0 is SF12 and each step up trades range for rate, down to SF7 at
/// DR5. Higher indices (SF7/250 kHz, FSK) clamp to SF7.
pub fn spreading_factor_from_data_rate(data_rate: u8) -> u8 {
    match data_rate {
        0 => 12,
        1 => 11,
        2 => 10,
        3 => 9,
        4 => 8,
        _ => 7,
    }
}

/// Build the telemetry record for one cycle and advance the packet counter.
///
/// Session RSSI/SNR lag by one exchange (they describe the last completed
/// one). `gateway_rssi` starts at the sentinel; network-side quality only
/// shows up in the acknowledgement, after this record is already encoded.
pub fn sample(session: &SessionState, sequence: &mut u16, battery_volts: f32) -> TelemetryRecord {
    let record = TelemetryRecord {
        sequence: *sequence,
        device_rssi: session.device_rssi,
        device_snr: session.device_snr,
        spreading_factor: spreading_factor_from_data_rate(session.data_rate),
        frequency_hz: session.frequency_hz,
        gateway_rssi: GATEWAY_RSSI_UNKNOWN,
        battery_volts,
    };
    *sequence = sequence.wrapping_add(1);
    record
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> SessionState {
        SessionState {
            device_rssi: -113,
            device_snr: -7,
            frequency_hz: 868_300_000,
            data_rate: 0,
            dev_addr: 0x2601_1f2a,
        }
    }

    #[test]
    fn test_spreading_factor_mapping() {
        assert_eq!(spreading_factor_from_data_rate(0), 12);
        assert_eq!(spreading_factor_from_data_rate(1), 11);
        assert_eq!(spreading_factor_from_data_rate(2), 10);
        assert_eq!(spreading_factor_from_data_rate(3), 9);
        assert_eq!(spreading_factor_from_data_rate(4), 8);
        assert_eq!(spreading_factor_from_data_rate(5), 7);
        // SF7/250kHz, FSK and out-of-range indices clamp to SF7
        assert_eq!(spreading_factor_from_data_rate(6), 7);
        assert_eq!(spreading_factor_from_data_rate(7), 7);
        assert_eq!(spreading_factor_from_data_rate(15), 7);
    }

    #[test]
    fn test_sample_snapshots_session() {
        let mut sequence = 4u16;
        let record = sample(&session(), &mut sequence, 3.3);

        assert_eq!(record.sequence, 4);
        assert_eq!(record.device_rssi, -113);
        assert_eq!(record.device_snr, -7);
        assert_eq!(record.spreading_factor, 12);
        assert_eq!(record.frequency_hz, 868_300_000);
        assert_eq!(record.gateway_rssi, GATEWAY_RSSI_UNKNOWN);
        assert_eq!(record.battery_volts, 3.3);
    }

    #[test]
    fn test_sample_advances_counter() {
        let mut sequence = 0u16;
        for expected in 0..4 {
            let record = sample(&session(), &mut sequence, 3.3);
            assert_eq!(record.sequence, expected);
        }
        assert_eq!(sequence, 4);
    }

    #[test]
    fn test_counter_wraps_at_65536() {
        let mut sequence = u16::MAX;
        let record = sample(&session(), &mut sequence, 3.3);
        assert_eq!(record.sequence, 65535);
        assert_eq!(sequence, 0);

        let record = sample(&session(), &mut sequence, 3.3);
        assert_eq!(record.sequence, 0);
    }
}
