//! Claude Code hook ingestion
//!
//! The hook command receives one event as JSON on stdin, appends it to the
//! event log and answers with a [`HookDecision`]. It never blocks Claude.

use crate::error::{Error, Result};
use crate::types::{HookDecision, HookEvent};
use std::fs::{self, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;

/// Reject events without a session id or event name.
pub fn validate(event: &HookEvent) -> Result<()> {
    event.validate()
}

/// Decode the first JSON value from `reader` as a hook event.
pub fn read_event<R: Read>(reader: R) -> Result<HookEvent> {
    let mut stream = serde_json::Deserializer::from_reader(reader).into_iter::<HookEvent>();
    match stream.next() {
        Some(event) => Ok(event?),
        None => Err(Error::Validation("no hook event on input".to_string())),
    }
}

/// Validate `event` and append it to the log as one compact JSON line.
pub fn append_event(events_file: &Path, event: &HookEvent) -> Result<()> {
    validate(event)?;

    if let Some(parent) = events_file.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut line = serde_json::to_vec(event)?;
    line.push(b'\n');

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(events_file)?;
    // Single write so concurrent hooks never interleave within a line
    file.write_all(&line)?;

    tracing::debug!(
        kind = %event.hook_event_name,
        session_id = %event.session_id,
        "Saved event"
    );
    Ok(())
}

/// The response printed back to Claude Code.
pub fn decision() -> HookDecision {
    HookDecision {
        continue_: true,
        decision: "approve".to_string(),
    }
}
