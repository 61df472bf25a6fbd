//! Reading trace lines back into records.

use linktest_core::NodeId;
use thiserror::Error;

use crate::TraceRecord;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("no record in line")]
    NoRecord,
    #[error("malformed record: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Decodes the record carried by one log line.
///
/// Text before the first `{` is ignored, except that a prefix consisting of a
/// single node id (`"3: {...}"`, `"3,{...}"`) supplies the origin of records
/// that do not carry one themselves.
pub fn parse_line(line: &str) -> Result<TraceRecord, ParseError> {
    let start = line.find('{').ok_or(ParseError::NoRecord)?;
    let end = line.rfind('}').ok_or(ParseError::NoRecord)?;
    if end < start {
        return Err(ParseError::NoRecord);
    }

    let mut record: TraceRecord = serde_json::from_str(&line[start..=end])?;
    if record.origin.is_none() {
        record.origin = prefix_origin(&line[..start]);
    }
    Ok(record)
}

fn prefix_origin(prefix: &str) -> Option<NodeId> {
    prefix
        .trim()
        .trim_end_matches([',', ':', '|'])
        .trim()
        .parse::<u16>()
        .ok()
        .map(NodeId)
}
