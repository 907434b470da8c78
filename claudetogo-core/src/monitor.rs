//! Live view of the event log
//!
//! [`EventTail`] follows the log by byte offset and yields only events
//! written after it was opened.

use crate::error::Result;
use crate::store;
use crate::types::HookEvent;
use chrono::{DateTime, Local};
use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct EventTail {
    path: PathBuf,
    offset: u64,
}

impl EventTail {
    /// Start tailing at the current end of the log (or 0 if it is absent).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let offset = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        tracing::debug!(path = %path.display(), offset, "Tailing event log");
        Self { path, offset }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Events appended since the last poll.
    ///
    /// A trailing line without a newline is left for the next poll. Lines
    /// that fail to decode are skipped. If the file shrank, tailing restarts
    /// from its new end.
    pub fn poll(&mut self) -> Result<Vec<HookEvent>> {
        if !store::exists(&self.path) {
            return Ok(Vec::new());
        }

        let size = fs::metadata(&self.path)?.len();
        if size < self.offset {
            tracing::info!(
                previous = self.offset,
                current = size,
                "Event log shrank, restarting from end"
            );
            self.offset = size;
            return Ok(Vec::new());
        }
        if size == self.offset {
            return Ok(Vec::new());
        }

        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(self.offset))?;
        let mut buf = Vec::new();
        file.take(size - self.offset).read_to_end(&mut buf)?;

        let Some(end) = buf.iter().rposition(|&b| b == b'\n') else {
            return Ok(Vec::new());
        };
        let complete = &buf[..=end];
        self.offset += complete.len() as u64;

        let mut events = Vec::new();
        for line in complete.split(|&b| b == b'\n') {
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            match serde_json::from_slice::<HookEvent>(line) {
                Ok(event) => events.push(event),
                Err(e) => tracing::warn!(error = %e, "Failed to decode event"),
            }
        }

        Ok(events)
    }
}

/// `[HH:MM:SS] 🎯 <kind> | Session: <prefix>[ | Tool: <tool>]`
pub fn format_event_line(event: &HookEvent, at: DateTime<Local>) -> String {
    let tool = event
        .tool_name()
        .map(|t| format!(" | Tool: {}", t))
        .unwrap_or_default();

    format!(
        "[{}] 🎯 {} | Session: {}{}",
        at.format("%H:%M:%S"),
        event.hook_event_name,
        store::session_prefix(&event.session_id),
        tool
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;
    use tempfile::TempDir;

    fn append(path: &Path, text: &str) {
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .unwrap()
            .write_all(text.as_bytes())
            .unwrap();
    }

    #[test]
    fn test_tail_only_sees_new_events() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("events.jsonl");
        append(&log, "{\"session_id\":\"old\",\"hook_event_name\":\"Stop\"}\n");

        let mut tail = EventTail::new(&log);
        assert!(tail.poll().unwrap().is_empty());

        append(&log, "{\"session_id\":\"new\",\"hook_event_name\":\"Notification\"}\nbad line\n");
        let events = tail.poll().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].session_id, "new");
        assert!(tail.poll().unwrap().is_empty());
    }

    #[test]
    fn test_partial_line_waits_for_newline() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("events.jsonl");
        let mut tail = EventTail::new(&log);
        assert_eq!(tail.offset(), 0);

        append(&log, "{\"session_id\":\"s1\",");
        assert!(tail.poll().unwrap().is_empty());
        assert_eq!(tail.offset(), 0);

        append(&log, "\"hook_event_name\":\"Stop\"}\n");
        let events = tail.poll().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(tail.offset(), fs::metadata(&log).unwrap().len());
    }

    #[test]
    fn test_shrunk_file_resets_offset() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("events.jsonl");
        append(&log, "{\"session_id\":\"a\",\"hook_event_name\":\"Stop\"}\n");
        let mut tail = EventTail::new(&log);

        fs::write(&log, "{}\n").unwrap();
        assert!(tail.poll().unwrap().is_empty());
        assert_eq!(tail.offset(), 3);
    }

    #[test]
    fn test_format_event_line() {
        let at = Local.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let mut event = HookEvent {
            session_id: "1fa8811f-0000".to_string(),
            hook_event_name: "Notification".to_string(),
            tool_name: Some("Bash".to_string()),
            ..Default::default()
        };
        assert_eq!(
            format_event_line(&event, at),
            "[03:04:05] 🎯 Notification | Session: 1fa8811f | Tool: Bash"
        );

        event.tool_name = None;
        assert_eq!(
            format_event_line(&event, at),
            "[03:04:05] 🎯 Notification | Session: 1fa8811f"
        );
    }
}
