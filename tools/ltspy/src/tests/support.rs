use linktest_core::{
    FloodConfig, FloodConfigRecord, FloodDoneRecord, InitiatorPolicy, Key, LogEvent, NodeId,
    RadioConfig, RadioConfigRecord, RoundMarker, RxDoneRecord, TestConfigRecord, TestPlan,
};
use linktest_trace::TraceRecord;

pub fn key(text: &str) -> Key {
    let mut key = Key::new();
    key.push_str(text).unwrap();
    key
}

pub fn line(origin: u16, event: LogEvent) -> String {
    serde_json::to_string(&TraceRecord {
        seq: 0,
        ts_us: None,
        origin: Some(NodeId(origin)),
        event,
    })
    .unwrap()
}

pub fn p2p_plan(nodes: &[u16], slots: u16) -> TestPlan {
    TestPlan::builder()
        .roster(nodes.iter().copied())
        .slots(slots)
        .p2p(RadioConfig::lora())
        .build()
        .unwrap()
}

pub fn flood_plan(nodes: &[u16], slots: u16, initiator: InitiatorPolicy) -> TestPlan {
    TestPlan::builder()
        .roster(nodes.iter().copied())
        .slots(slots)
        .flood(FloodConfig {
            initiator,
            ..FloodConfig::default()
        })
        .build()
        .unwrap()
}

/// Log builder producing the lines of several nodes.
#[derive(Default)]
pub struct Run {
    lines: Vec<String>,
}

impl Run {
    pub fn p2p(plan: &TestPlan) -> Self {
        let mut run = Self::default();
        let test: TestConfigRecord = plan.into();
        let radio = RadioConfigRecord::from(&RadioConfig::lora());
        for node in plan.roster().iter() {
            run.push(node.raw(), LogEvent::TestConfig(test.clone()));
            run.push(node.raw(), LogEvent::RadioConfig(radio.clone()));
        }
        run
    }

    pub fn flood(plan: &TestPlan, config: &FloodConfig) -> Self {
        let mut run = Self::default();
        let test: TestConfigRecord = plan.into();
        let flood = FloodConfigRecord::from(config);
        for node in plan.roster().iter() {
            run.push(node.raw(), LogEvent::TestConfig(test.clone()));
            run.push(node.raw(), LogEvent::FloodConfig(flood.clone()));
        }
        run
    }

    pub fn push(&mut self, origin: u16, event: LogEvent) -> &mut Self {
        self.lines.push(line(origin, event));
        self
    }

    pub fn start(&mut self, origin: u16, round: u16, node: u16) -> &mut Self {
        self.push(
            origin,
            LogEvent::StartOfRound(RoundMarker {
                round,
                node: NodeId(node),
            }),
        )
    }

    pub fn end(&mut self, origin: u16, round: u16, node: u16) -> &mut Self {
        self.push(
            origin,
            LogEvent::EndOfRound(RoundMarker {
                round,
                node: NodeId(node),
            }),
        )
    }

    pub fn rx(
        &mut self,
        origin: u16,
        key_text: &str,
        counter: u16,
        rssi: i16,
        crc_error: bool,
    ) -> &mut Self {
        self.push(
            origin,
            LogEvent::RxDone(RxDoneRecord {
                key: key(key_text),
                size: 10,
                counter,
                rssi,
                snr: 5,
                crc_error,
            }),
        )
    }

    pub fn flood_done(
        &mut self,
        origin: u16,
        is_initiator: bool,
        rx_cnt: u8,
        rx_idx: u8,
    ) -> &mut Self {
        self.push(
            origin,
            LogEvent::FloodDone(FloodDoneRecord {
                is_initiator,
                rx_cnt,
                rx_idx,
                rx_started: rx_cnt,
                rssi: -70,
                snr: 8,
                payload_len: 10,
                t_ref_updated: rx_cnt > 0,
                counter: 0,
                key: key("deadbeef"),
            }),
        )
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}
