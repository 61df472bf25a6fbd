//! Plan files.

use std::fs;
use std::path::Path;

use linktest_core::{PlanFile, TestPlan};

use crate::error::SimError;

/// Parses and validates a JSON plan.
pub fn parse_plan(json: &str) -> Result<TestPlan, SimError> {
    let file: PlanFile = serde_json::from_str(json)?;
    Ok(TestPlan::try_from(file)?)
}

pub fn load_plan<P: AsRef<Path>>(path: P) -> Result<TestPlan, SimError> {
    let path = path.as_ref();
    let json = fs::read_to_string(path).map_err(|source| SimError::PlanRead {
        path: path.to_path_buf(),
        source,
    })?;
    parse_plan(&json)
}
