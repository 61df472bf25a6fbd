use linktest_core::{NodeId, RadioConfig, TestPlan, TickDuration};
use linktest_sim::{LinkModel, LinkQuality, SimConfig, SimNetwork};
use ltspy::{evaluate, LogSet, ModeStats};

#[test]
fn simulated_mesh_evaluates_to_perfect_links() {
    let plan = TestPlan::builder()
        .roster([1, 2, 3])
        .slots(2)
        .setup_time(TickDuration::from_millis(20))
        .start_delay(TickDuration::from_millis(10))
        .stop_delay(TickDuration::from_millis(30))
        .slot_gap(TickDuration::from_millis(10))
        .p2p(RadioConfig::fsk())
        .build()
        .unwrap();
    let links = LinkModel::full_mesh(LinkQuality::new(-60, 10))
        .with_link(NodeId(1), NodeId(3), LinkQuality::new(-100, -5).with_loss(1.0));
    let network = SimNetwork::new(
        plan,
        SimConfig {
            links,
            ..SimConfig::default()
        },
    );
    let (_, lines) = network.run_captured().unwrap();

    let logs = LogSet::from_text(&lines.join("\n")).unwrap();
    let eval = evaluate(&logs).unwrap();
    let ModeStats::P2p { stats, radio } = &eval.mode else {
        panic!("expected p2p stats");
    };

    assert_eq!(stats.prr.get(NodeId(1), NodeId(2)), Some(1.0));
    assert_eq!(stats.prr.get(NodeId(3), NodeId(2)), Some(1.0));
    assert_eq!(stats.prr.get(NodeId(1), NodeId(3)), Some(0.0));
    assert_eq!(
        stats.pathloss.get(NodeId(2), NodeId(1)),
        Some(f64::from(radio.tx_power) + 60.0)
    );
}
