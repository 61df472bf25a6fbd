use std::fs;

use linktest_core::{LogEvent, NodeId};

use super::support::{line, p2p_plan, Run};
use crate::{EvalError, LogSet};

#[test]
fn serial_prefix_and_noise_are_tolerated() {
    let text = format!(
        "booting\n3: {}\n{}\n",
        r#"{"type":"TxDone"}"#,
        r#"[00:01] {"type":"StartOfRound","round":0,"node":1}"#
    );
    let logs = LogSet::from_text(&text);
    assert!(matches!(logs, Err(EvalError::MissingOrigin { line: 3 })));

    let mut logs = LogSet::new();
    logs.push_text(&text, Some(NodeId(5))).unwrap();
    assert_eq!(logs.nodes(), vec![NodeId(3), NodeId(5)]);
    assert_eq!(logs.events(NodeId(3)), &[LogEvent::TxDone]);
}

#[test]
fn malformed_records_are_counted_and_skipped() {
    let text = format!("{}\n{{\"type\":\"Bogus\"}}\n", line(1, LogEvent::TxDone));
    let logs = LogSet::from_text(&text).unwrap();
    assert_eq!(logs.skipped(), 1);
    assert_eq!(logs.events(NodeId(1)).len(), 1);
}

#[test]
fn file_name_supplies_the_origin() {
    let dir = std::env::temp_dir().join(format!("ltspy-parser-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join("7.log");
    fs::write(&path, "{\"type\":\"TxDone\"}\n").unwrap();

    let mut logs = LogSet::new();
    logs.read_file(&path).unwrap();
    assert_eq!(logs.nodes(), vec![NodeId(7)]);

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn missing_file_is_reported_with_its_path() {
    let mut logs = LogSet::new();
    let err = logs.read_file("/nonexistent/ltspy/1.log").unwrap_err();
    assert!(err.to_string().contains("/nonexistent/ltspy/1.log"));
}

#[test]
fn rows_are_limited_to_the_requested_round() {
    let mut run = Run::default();
    run.start(2, 0, 1)
        .rx(2, "deadbeef", 0, -70, false)
        .end(2, 0, 1)
        .start(2, 1, 2)
        .push(2, LogEvent::TxDone)
        .end(2, 1, 2);
    let logs = LogSet::from_text(&run.text()).unwrap();

    assert_eq!(logs.round_rows(NodeId(2), NodeId(1)).len(), 1);
    assert_eq!(
        logs.round_rows(NodeId(2), NodeId(2)),
        vec![&LogEvent::TxDone]
    );
    assert!(logs.round_rows(NodeId(2), NodeId(3)).is_empty());
    logs.check_rounds().unwrap();
}

#[test]
fn nested_round_is_rejected() {
    let mut run = Run::default();
    run.start(1, 0, 1).start(1, 1, 2);
    let logs = LogSet::from_text(&run.text()).unwrap();
    assert!(matches!(
        logs.check_rounds(),
        Err(EvalError::NestedRound { node, .. }) if node == NodeId(2)
    ));
}

#[test]
fn mismatched_round_end_is_rejected() {
    let mut run = Run::default();
    run.start(1, 0, 1).end(1, 0, 2);
    let logs = LogSet::from_text(&run.text()).unwrap();
    assert!(matches!(
        logs.check_rounds(),
        Err(EvalError::RoundMismatch { expected, found, .. })
            if expected == NodeId(1) && found == NodeId(2)
    ));

    let mut run = Run::default();
    run.end(1, 0, 1);
    let logs = LogSet::from_text(&run.text()).unwrap();
    assert!(matches!(
        logs.check_rounds(),
        Err(EvalError::UnopenedRound { .. })
    ));
}

#[test]
fn configs_require_a_test_config() {
    let plan = p2p_plan(&[1, 2], 1);
    let mut run = Run::p2p(&plan);
    run.push(4, LogEvent::TxDone);
    let logs = LogSet::from_text(&run.text()).unwrap();
    assert!(matches!(
        logs.configs(),
        Err(EvalError::MissingConfig { node, record: "TestConfig" }) if node == NodeId(4)
    ));
}
