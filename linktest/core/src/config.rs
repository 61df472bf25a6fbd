//! Serde form of a [`TestPlan`], as loaded from a JSON plan file.
//!
//! Both mode sections are optional on disk so that a file naming both, or
//! neither, is rejected by the same validation as the builder.

use heapless::Vec;
use serde::{Deserialize, Serialize};

use crate::error::PlanError;
use crate::node::MAX_NODES;
use crate::plan::{FloodConfig, Key, RadioConfig, TestPlan};
use crate::time::TickDuration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanFile {
    pub nodes: Vec<u16, MAX_NODES>,
    #[serde(default)]
    pub slots: Option<u16>,
    #[serde(default)]
    pub setup_time: Option<TickDuration>,
    #[serde(default)]
    pub start_delay: Option<TickDuration>,
    #[serde(default)]
    pub stop_delay: Option<TickDuration>,
    #[serde(default)]
    pub slot_gap: Option<TickDuration>,
    #[serde(default)]
    pub key: Option<Key>,
    #[serde(default)]
    pub p2p: Option<RadioConfig>,
    #[serde(default)]
    pub flood: Option<FloodConfig>,
}

impl TryFrom<PlanFile> for TestPlan {
    type Error = PlanError;

    fn try_from(file: PlanFile) -> Result<Self, Self::Error> {
        let mut builder = TestPlan::builder().roster(file.nodes.iter().copied());
        if let Some(slots) = file.slots {
            builder = builder.slots(slots);
        }
        if let Some(duration) = file.setup_time {
            builder = builder.setup_time(duration);
        }
        if let Some(duration) = file.start_delay {
            builder = builder.start_delay(duration);
        }
        if let Some(duration) = file.stop_delay {
            builder = builder.stop_delay(duration);
        }
        if let Some(duration) = file.slot_gap {
            builder = builder.slot_gap(duration);
        }
        if let Some(key) = &file.key {
            builder = builder.key(key);
        }
        if let Some(radio) = file.p2p {
            builder = builder.p2p(radio);
        }
        if let Some(flood) = file.flood {
            builder = builder.flood(flood);
        }
        builder.build()
    }
}
