//! Software MAC engine for bench runs
//!
//! Stands in for the radio stack when the service runs on a development
//! host: the join completes after a fixed delay, every confirmed uplink
//! is acknowledged with synthetic link quality, and the session drifts a
//! little between cycles so consecutive frames are distinguishable.
//! Events are delivered through the same channel a real engine binding
//! would use.

use crate::mac::{AckQuality, MacEngine, MacError, MacEvent, SessionState};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

const JOIN_DELAY: Duration = Duration::from_secs(3);
const EXCHANGE_DELAY: Duration = Duration::from_secs(2);
const SIM_DEV_ADDR: u32 = 0x2601_1f2a;

/// EU868 default uplink channels
const CHANNELS_HZ: [u32; 3] = [868_100_000, 868_300_000, 868_500_000];

pub struct SimMacEngine {
    events: mpsc::Sender<MacEvent>,
    session: SessionState,
    join_started: bool,
    uplinks: u32,
}

impl SimMacEngine {
    pub fn new(events: mpsc::Sender<MacEvent>) -> Self {
        Self {
            events,
            session: SessionState {
                device_rssi: -113,
                device_snr: -7,
                frequency_hz: CHANNELS_HZ[0],
                data_rate: 0,
                dev_addr: 0,
            },
            join_started: false,
            uplinks: 0,
        }
    }
}

impl MacEngine for SimMacEngine {
    fn start_join(&mut self) -> Result<(), MacError> {
        if self.join_started {
            return Ok(());
        }
        self.join_started = true;
        // The session flips to joined as soon as the exchange is scheduled;
        // close enough for bench use.
        self.session.dev_addr = SIM_DEV_ADDR;

        let events = self.events.clone();
        tokio::spawn(async move {
            let _ = events.send(MacEvent::Joining).await;
            tokio::time::sleep(JOIN_DELAY).await;
            let _ = events.send(MacEvent::Joined).await;
        });
        Ok(())
    }

    fn send_uplink(&mut self, payload: &[u8], confirmed: bool) -> Result<(), MacError> {
        if !self.session.joined() {
            return Err(MacError::NotJoined);
        }

        self.uplinks += 1;
        // Drift the session so the next sample differs from this one
        self.session.device_rssi = -90 - (self.uplinks % 30) as i16;
        self.session.device_snr = 8 - (self.uplinks % 12) as i8;
        self.session.frequency_hz = CHANNELS_HZ[self.uplinks as usize % CHANNELS_HZ.len()];
        self.session.data_rate = (self.uplinks % 6) as u8;

        debug!(len = payload.len(), confirmed, "Simulated uplink queued");

        let ack = confirmed.then(|| AckQuality {
            rssi: -100 - (self.uplinks % 15) as i16,
            snr: 6 - (self.uplinks % 10) as i8,
        });
        let events = self.events.clone();
        tokio::spawn(async move {
            let _ = events.send(MacEvent::TxStart).await;
            tokio::time::sleep(EXCHANGE_DELAY).await;
            let _ = events
                .send(MacEvent::TxComplete {
                    ack,
                    downlink: Vec::new(),
                })
                .await;
        });
        Ok(())
    }

    fn session(&self) -> SessionState {
        self.session
    }

    fn set_link_check(&mut self, enabled: bool) {
        debug!(enabled, "Simulated link check");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_join_emits_joining_then_joined() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut mac = SimMacEngine::new(tx);

        assert!(!mac.session().joined());
        mac.start_join().unwrap();

        assert_eq!(rx.recv().await, Some(MacEvent::Joining));
        assert_eq!(rx.recv().await, Some(MacEvent::Joined));
        assert!(mac.session().joined());
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirmed_uplink_is_acked() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut mac = SimMacEngine::new(tx);
        mac.start_join().unwrap();
        rx.recv().await;
        rx.recv().await;

        mac.send_uplink(&[0u8; 11], true).unwrap();

        assert_eq!(rx.recv().await, Some(MacEvent::TxStart));
        let Some(MacEvent::TxComplete { ack, downlink }) = rx.recv().await else {
            panic!("expected tx-complete");
        };
        assert!(ack.is_some());
        assert!(downlink.is_empty());
    }

    #[tokio::test]
    async fn test_uplink_before_join_is_rejected() {
        let (tx, _rx) = mpsc::channel(16);
        let mut mac = SimMacEngine::new(tx);

        assert!(matches!(
            mac.send_uplink(&[0u8; 11], true),
            Err(MacError::NotJoined)
        ));
    }
}
