use std::sync::atomic::Ordering;
use std::sync::Arc;

use linktest_core::{
    LogEvent, Message, NodeId, OverrunRecord, PlanError, RadioConfig, RadioWarningKind,
    RoundMarker, TestPlan, Tick, TickDuration,
};
use linktest_hal::{HalError, IrqMask, RxArm};

use super::support::*;
use crate::error::EngineError;
use crate::link::RadioLink;
use crate::scheduler::RoundScheduler;
use crate::strategy::{ActiveMode, NoFlood};

/// 50 ms airtime: slot period 150, round period 500+500+9*150+50+500 = 2900.
const AIRTIME_US: u32 = 50_000;
const ROUND_PERIOD: u64 = 2900;

#[test]
fn three_node_p2p_timeline() {
    let mut node = p2p_node(p2p_plan(&[1, 2, 3]), 1, AIRTIME_US);
    let report = node.scheduler.run_rounds().unwrap();

    assert_eq!(report.timing.slot_period, TickDuration::from_millis(150));
    assert_eq!(report.timing.round_period, TickDuration::from_millis(2900));
    assert_eq!(
        report.anchors,
        vec![Tick::new(0), Tick::new(ROUND_PERIOD), Tick::new(2 * ROUND_PERIOD)]
    );
    assert!(report.overruns.is_empty());

    let starts = node.recorder.named("StartOfRound");
    let owners: Vec<_> = starts
        .iter()
        .map(|(at, event)| match event {
            LogEvent::StartOfRound(RoundMarker { round, node }) => (at.raw(), *round, node.raw()),
            other => panic!("unexpected {other:?}"),
        })
        .collect();
    assert_eq!(owners, vec![(500, 0, 1), (3400, 1, 2), (6300, 2, 3)]);
    assert_eq!(node.recorder.ticks_of("EndOfRound"), vec![2900, 5800, 8700]);

    // Node 1 owns round 0 only.
    let sends = node.radio.sends();
    let expected: Vec<u64> = (0..10).map(|s| 1000 + 150 * s).collect();
    assert_eq!(sends.iter().map(|(at, _)| at.raw()).collect::<Vec<_>>(), expected);
    for (slot, (_, payload)) in sends.iter().enumerate() {
        let message = Message::from_received(payload);
        assert_eq!(message.counter, slot as u16);
        assert_eq!(message.key.as_str(), "deadbeef");
    }
}

#[test]
fn config_records_precede_sync() {
    let (sync, polls) = MockSync::after(25);
    let mut node = p2p_node_with(p2p_plan(&[1, 2]), 2, AIRTIME_US, sync, |_| {});
    let report = node.scheduler.run_rounds().unwrap();

    assert_eq!(polls.load(Ordering::Relaxed), 26);
    assert_eq!(report.anchors[0], Tick::new(25));

    let events = node.recorder.events();
    assert!(matches!(events[0], (at, LogEvent::TestConfig(_)) if at == Tick::ZERO));
    assert!(matches!(events[1], (at, LogEvent::RadioConfig(_)) if at == Tick::ZERO));
    assert_eq!(node.recorder.ticks_of("StartOfRound")[0], 525);
}

#[test]
fn overrun_is_reported_without_shifting_the_schedule() {
    // Node 2 transmits in round 1; its first send there takes 200 ticks.
    let mut node = p2p_node_with(p2p_plan(&[1, 2, 3]), 2, AIRTIME_US, MockSync::ready(), |s| {
        s.stall = Some((0, 200))
    });
    let report = node.scheduler.run_rounds().unwrap();

    assert_eq!(
        report.overruns,
        vec![OverrunRecord {
            round: 1,
            slot: Some(1),
            late_by: 50
        }]
    );
    assert_eq!(node.recorder.named("Overrun").len(), 1);
    assert_eq!(
        report.anchors,
        vec![Tick::new(0), Tick::new(ROUND_PERIOD), Tick::new(2 * ROUND_PERIOD)]
    );

    let sends: Vec<u64> = node.radio.sends().iter().map(|(at, _)| at.raw()).collect();
    // Slot 1 goes out late, slot 2 is back on its own deadline.
    assert_eq!(&sends[..3], &[3900, 4100, 4200]);
    assert_eq!(node.recorder.ticks_of("StartOfRound")[2], 2 * ROUND_PERIOD + 500);
}

#[test]
fn round_overrun_keeps_next_anchor() {
    let mut node = p2p_node_with(p2p_plan(&[1, 2]), 1, AIRTIME_US, MockSync::ready(), |s| {
        s.stall = Some((9, 3000))
    });
    let report = node.scheduler.run_rounds().unwrap();

    assert_eq!(
        report.overruns[0],
        OverrunRecord {
            round: 0,
            slot: None,
            late_by: 2350 + 3000 - 2900
        }
    );
    assert_eq!(report.anchors, vec![Tick::new(0), Tick::new(ROUND_PERIOD)]);
}

#[test]
fn receivers_listen_for_the_whole_round() {
    let mut node = p2p_node(p2p_plan(&[1, 2]), 2, AIRTIME_US);
    node.scheduler.run_rounds().unwrap();

    let calls = node.radio.calls();
    let arms: Vec<_> = calls
        .iter()
        .filter_map(|call| match call {
            RadioCall::Rx(arm) => Some(*arm),
            _ => None,
        })
        .collect();
    // Round 0 only; node 2 transmits in round 1.
    assert_eq!(arms, vec![RxArm::continuous_linktest()]);
    assert!(!arms[0].mask.contains(IrqMask::PREAMBLE_DETECTED));
    assert!(arms[0].preamble_irqs_disabled);
    assert_eq!(calls.last(), Some(&RadioCall::Standby));
    assert!(node.link.with(|cell| cell.rx_expected()).is_none());
}

#[test]
fn init_failure_is_fatal_before_sync() {
    let (sync, polls) = MockSync::after(0);
    let mut node = p2p_node_with(p2p_plan(&[1]), 1, AIRTIME_US, sync, |s| {
        s.init_error = Some(HalError::HardwareError)
    });
    let err = node.scheduler.run_rounds().unwrap_err();

    assert_eq!(err, EngineError::Hal(HalError::HardwareError));
    assert_eq!(polls.load(Ordering::Relaxed), 0);
    assert!(node.recorder.named("StartOfRound").is_empty());
}

#[test]
fn irq_line_high_at_init_is_reported() {
    let mut node = p2p_node_with(p2p_plan(&[1]), 1, AIRTIME_US, MockSync::ready(), |s| {
        s.irq_stuck = true
    });
    node.scheduler.run_rounds().unwrap();

    let warnings = node.recorder.named("RadioWarning");
    assert_eq!(
        warnings[0].1,
        LogEvent::radio_warning(RadioWarningKind::IrqLineHigh)
    );
}

#[test]
fn fsk_sends_warmup_frame_before_sync() {
    let plan = TestPlan::builder()
        .roster([1, 2])
        .p2p(RadioConfig::fsk())
        .build()
        .unwrap();
    let mut node = p2p_node(plan, 2, AIRTIME_US);
    let report = node.scheduler.run_rounds().unwrap();

    let sends = node.radio.sends();
    assert_eq!(sends[0].0, Tick::ZERO);
    assert_eq!(Message::from_received(&sends[0].1).counter, 0);
    // The warm-up frame is given its airtime before the anchor is taken.
    assert_eq!(report.anchors[0], Tick::new(50));
}

#[test]
fn oversized_airtime_is_a_timing_error() {
    let plan = TestPlan::builder()
        .roster([1])
        .slots(2000)
        .p2p(RadioConfig::lora())
        .build()
        .unwrap();
    let mut node = p2p_node(plan, 1, u32::MAX);
    assert_eq!(
        node.scheduler.run_rounds().unwrap_err(),
        EngineError::Plan(PlanError::TimingOverflow)
    );
}

#[test]
fn flood_plan_without_flood_engine_is_rejected() {
    let clock = VirtualClock::new();
    let (radio, _) = mock_radio(&clock, AIRTIME_US);
    let link = Arc::new(RadioLink::new(radio, crate::trace::Emitter::silent()));
    let plan = TestPlan::builder()
        .roster([1, 2])
        .flood(Default::default())
        .build()
        .unwrap();

    let result = ActiveMode::<MockRadio, NoFlood>::from_plan(&plan, Some(link), None);
    assert!(matches!(result, Err(EngineError::MissingFlood)));

    let plan = p2p_plan(&[1]);
    let result = ActiveMode::<MockRadio, NoFlood>::from_plan(&plan, None, None);
    assert!(matches!(result, Err(EngineError::MissingRadio)));
}

#[test]
fn round_pin_rises_at_every_anchor() {
    init_logger();
    let clock = VirtualClock::new();
    let (radio, _) = mock_radio(&clock, AIRTIME_US);
    let link = Arc::new(RadioLink::new(radio, crate::trace::Emitter::silent()));
    let plan = p2p_plan(&[1, 2, 3]);
    let mode = ActiveMode::<_, NoFlood>::from_plan(&plan, Some(link), None).unwrap();
    let round_pin = RecordingPin::new(&clock);
    let slot_pin = RecordingPin::new(&clock);

    let mut scheduler = RoundScheduler::new(plan, NodeId(3), mode, clock.clone(), MockSync::ready())
        .with_pins(round_pin.clone(), slot_pin.clone());
    scheduler.run_rounds().unwrap();

    assert_eq!(round_pin.rising_edges(), vec![0, ROUND_PERIOD, 2 * ROUND_PERIOD]);
    let slots = slot_pin.rising_edges();
    assert_eq!(slots.len(), 30);
    assert_eq!(slots[1] - slots[0], 150);
}
