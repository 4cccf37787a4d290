//! Full cycle against the simulated MAC engine: boot, join, first
//! confirmed uplink, acknowledgement, re-arm.

use rangetest_node::mac::MacEvent;
use rangetest_node::scheduler::{JOIN_RETRY_INTERVAL, LinkState, Scheduler, TickAction};
use rangetest_node::sim::SimMacEngine;
use std::time::Duration;
use tokio::sync::mpsc;

const TX_INTERVAL: Duration = Duration::from_secs(30);

#[tokio::test(start_paused = true)]
async fn join_then_first_uplink_cycle() {
    let (events_tx, mut events) = mpsc::channel(16);
    let mut mac = SimMacEngine::new(events_tx);
    let mut scheduler = Scheduler::new(TX_INTERVAL, 3.3);

    assert_eq!(scheduler.state(), LinkState::AwaitingJoin);

    // Boot tick: not joined, so it turns into a join request
    let action = scheduler.on_tick(&mut mac);
    assert_eq!(
        action,
        TickAction::JoinRequested {
            retry_in: JOIN_RETRY_INTERVAL
        }
    );

    let event = events.recv().await.unwrap();
    assert_eq!(event, MacEvent::Joining);
    assert_eq!(scheduler.on_event(&event, &mut mac), None);

    let event = events.recv().await.unwrap();
    assert_eq!(event, MacEvent::Joined);
    assert_eq!(scheduler.on_event(&event, &mut mac), None);
    assert_eq!(scheduler.state(), LinkState::Idle);

    // The pending retry tick now delivers the first uplink
    let TickAction::Uplinked { record } = scheduler.on_tick(&mut mac) else {
        panic!("expected an uplink");
    };
    assert_eq!(record.sequence, 0);
    assert_eq!(scheduler.state(), LinkState::TxPending);

    // A tick delivered before the exchange completes is dropped
    assert_eq!(scheduler.on_tick(&mut mac), TickAction::Busy);

    let event = events.recv().await.unwrap();
    assert_eq!(event, MacEvent::TxStart);
    assert_eq!(scheduler.on_event(&event, &mut mac), None);

    let event = events.recv().await.unwrap();
    let MacEvent::TxComplete { ack, .. } = &event else {
        panic!("expected tx-complete, got {:?}", event);
    };
    assert!(ack.is_some(), "confirmed uplink must carry an ack");

    // Completion re-arms the next cycle at the TX interval
    assert_eq!(scheduler.on_event(&event, &mut mac), Some(TX_INTERVAL));
    assert_eq!(scheduler.state(), LinkState::Idle);

    // The next cycle samples the drifted session and sequence 1
    let TickAction::Uplinked { record } = scheduler.on_tick(&mut mac) else {
        panic!("expected a second uplink");
    };
    assert_eq!(record.sequence, 1);
    assert_eq!(record.gateway_rssi, 0);
}
