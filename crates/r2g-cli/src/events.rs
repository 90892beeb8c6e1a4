//! JSON-lines event stream read by `r2g replay`.
//!
//! Each non-blank line is one object tagged by `type`:
//!
//! ```text
//! {"type":"change","comment":"fix","creator_name":"Jane","email_address":"j@x","creation_time_millis":1449321955000,"work_items":[{"number":12}]}
//! {"type":"tag","name":"Sprint 4"}
//! ```

use std::io::BufRead;

use anyhow::Context;
use r2g_core::types::{ChangeEvent, TagEvent};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventRecord {
    Change(ChangeEvent),
    Tag(TagEvent),
}

/// Parse all records, keeping their 1-based line numbers. Blank lines and
/// lines starting with `//` are skipped.
pub fn read_events<R: BufRead>(reader: R) -> anyhow::Result<Vec<(usize, EventRecord)>> {
    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.with_context(|| format!("failed to read line {line_no}"))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("//") {
            continue;
        }
        let record: EventRecord = serde_json::from_str(trimmed)
            .with_context(|| format!("malformed event on line {line_no}"))?;
        records.push((line_no, record));
    }
    Ok(records)
}
