use linktest_core::{
    FloodConfig, InitiatorPolicy, Mode, NodeId, PlanError, RadioConfig, TestPlan, WarmupPolicy,
};

fn base() -> linktest_core::TestPlanBuilder {
    TestPlan::builder().roster([1, 2, 3])
}

#[test]
fn defaults_follow_testbed_configuration() {
    let plan = base().p2p(RadioConfig::default()).build().unwrap();
    assert_eq!(plan.slots(), 10);
    assert_eq!(plan.setup_time().as_millis(), 500);
    assert_eq!(plan.start_delay().as_millis(), 500);
    assert_eq!(plan.stop_delay().as_millis(), 500);
    assert_eq!(plan.slot_gap().as_millis(), 100);
    assert_eq!(plan.key().as_str(), "deadbeef");
    assert_eq!(plan.payload_len(), 10);
    assert_eq!(plan.mode(), Mode::P2p);
    assert_eq!(plan.rounds(), 3);
}

#[test]
fn both_modes_are_rejected() {
    let err = base()
        .p2p(RadioConfig::lora())
        .flood(FloodConfig::default())
        .build()
        .unwrap_err();
    assert_eq!(err, PlanError::ConflictingModes);
}

#[test]
fn missing_mode_is_rejected() {
    assert_eq!(base().build().unwrap_err(), PlanError::MissingMode);
}

#[test]
fn roster_must_be_unique_and_non_empty() {
    let dup = TestPlan::builder()
        .roster([1, 2, 1])
        .p2p(RadioConfig::lora())
        .build();
    assert_eq!(dup.unwrap_err(), PlanError::DuplicateNode(NodeId(1)));

    let empty = TestPlan::builder()
        .roster(std::iter::empty())
        .p2p(RadioConfig::lora())
        .build();
    assert_eq!(empty.unwrap_err(), PlanError::EmptyRoster);

    let huge = TestPlan::builder()
        .roster(0..200)
        .p2p(RadioConfig::lora())
        .build();
    assert_eq!(huge.unwrap_err(), PlanError::RosterTooLarge);
}

#[test]
fn zero_slots_are_rejected() {
    let err = base().slots(0).p2p(RadioConfig::lora()).build().unwrap_err();
    assert_eq!(err, PlanError::NoSlots);
}

#[test]
fn key_must_be_clean_and_short() {
    let err = base().key("dead beef").p2p(RadioConfig::lora()).build();
    assert_eq!(err.unwrap_err(), PlanError::InvalidKeyByte(b' '));

    let long = "k".repeat(255);
    let err = base().key(&long).p2p(RadioConfig::lora()).build();
    assert_eq!(err.unwrap_err(), PlanError::KeyTooLong(255));

    let max = "k".repeat(254);
    assert!(base().key(&max).p2p(RadioConfig::lora()).build().is_ok());
}

#[test]
fn fixed_initiator_must_be_in_roster() {
    let flood = FloodConfig {
        initiator: InitiatorPolicy::Fixed {
            initiator: NodeId(9),
            delay_hops: 1,
        },
        ..FloodConfig::default()
    };
    let err = base().flood(flood).build().unwrap_err();
    assert_eq!(err, PlanError::UnknownInitiator(NodeId(9)));
}

#[test]
fn warmup_policy_is_keyed_by_modem() {
    assert!(!RadioConfig::lora().needs_warmup_tx());
    assert!(RadioConfig::fsk().needs_warmup_tx());

    let forced = RadioConfig {
        warmup: WarmupPolicy::Always,
        ..RadioConfig::lora()
    };
    assert!(forced.needs_warmup_tx());

    let skipped = RadioConfig {
        warmup: WarmupPolicy::Never,
        ..RadioConfig::fsk()
    };
    assert!(!skipped.needs_warmup_tx());
}

#[test]
fn fsk_deviation_is_half_the_excess_bandwidth() {
    let fsk = RadioConfig::fsk();
    assert_eq!(fsk.frequency_deviation(), (234_300 - 125_000) / 2);
    assert_eq!(RadioConfig::lora().frequency_deviation(), 0);
}

#[test]
fn fsk_receive_bandwidth_covers_crystal_drift() {
    let fsk = RadioConfig::fsk();
    // 2 * (117_150 + 869_012_500) / 40_000
    assert_eq!(fsk.rx_bandwidth(), 234_300 + 43_456);

    let exact = RadioConfig {
        clock_drift: 0,
        ..RadioConfig::fsk()
    };
    assert_eq!(exact.rx_bandwidth(), 234_300);
    assert_eq!(RadioConfig::lora().rx_bandwidth(), 0);
}
