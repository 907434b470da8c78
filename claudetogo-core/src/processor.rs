//! Event processing pipeline
//!
//! [`EventProcessor`] runs each hook event through
//! extractor → formatter → disk and offers batch operations over the whole
//! event log.
//!
//! # Batch semantics
//!
//! Batches never stop at the first failure. A malformed log line is skipped
//! with a warning when the log is read, and an event whose transcript is
//! missing or unreadable is recorded in [`BatchResult::errors`] while the
//! rest of the batch carries on.
//!
//! # Example
//!
//! ```ignore
//! let processor = EventProcessor::new(OutputStore::new("messenger-output"));
//! let result = processor.process_latest(Path::new("claude-events.jsonl"), 3)?;
//! for path in &result.output_files {
//!     println!("{}", path.display());
//! }
//! ```

use crate::error::{Error, Result};
use crate::extractor::Extractor;
use crate::formatter::Formatter;
use crate::store::{self, OutputStore};
use crate::types::{EventKind, HookEvent, MessengerMessage, ProcessingStats};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Outcome of processing a batch of events.
#[derive(Debug, Default)]
pub struct BatchResult {
    /// Written messenger files, in event order
    pub output_files: Vec<PathBuf>,
    /// Events that failed (1-based position within the batch, error message)
    pub errors: Vec<(usize, String)>,
}

impl BatchResult {
    pub fn total(&self) -> usize {
        self.output_files.len() + self.errors.len()
    }
}

pub struct EventProcessor {
    extractor: Extractor,
    formatter: Formatter,
    store: OutputStore,
}

impl EventProcessor {
    pub fn new(store: OutputStore) -> Self {
        Self {
            extractor: Extractor::new(),
            formatter: Formatter::new(),
            store,
        }
    }

    pub fn output_dir(&self) -> &Path {
        self.store.root()
    }

    pub fn store(&self) -> &OutputStore {
        &self.store
    }

    /// Extract and format one event.
    pub fn process(&self, event: &HookEvent) -> Result<MessengerMessage> {
        let data = self.extractor.extract(event)?;
        self.formatter.format_actionable(&data)
    }

    /// Process one event and write it under the output directory.
    pub fn process_and_save(&self, event: &HookEvent) -> Result<PathBuf> {
        let message = self.process(event)?;

        let path = self.store.root().join(messenger_file_name(event));
        self.store.write_json(&path, &message)?;

        tracing::info!(
            session_id = %event.session_id,
            kind = %event.hook_event_name,
            path = %path.display(),
            "Wrote messenger file"
        );
        Ok(path)
    }

    /// Process every event in the log.
    pub fn process_all(&self, events_file: &Path) -> Result<BatchResult> {
        self.process_all_with_progress(events_file, |_, _, _| {})
    }

    /// Process every event in the log, reporting progress.
    ///
    /// The callback receives `(current_index, total, event)` before each event
    /// is processed.
    pub fn process_all_with_progress<F>(
        &self,
        events_file: &Path,
        on_progress: F,
    ) -> Result<BatchResult>
    where
        F: FnMut(usize, usize, &HookEvent),
    {
        let events = read_events(events_file)?;
        Ok(self.process_batch(&events, on_progress))
    }

    /// Process only the last `n` events of the log (all of them if fewer).
    pub fn process_latest(&self, events_file: &Path, n: usize) -> Result<BatchResult> {
        let events = read_events(events_file)?;
        let start = events.len().saturating_sub(n);
        Ok(self.process_batch(&events[start..], |_, _, _| {}))
    }

    fn process_batch<F>(&self, events: &[HookEvent], mut on_progress: F) -> BatchResult
    where
        F: FnMut(usize, usize, &HookEvent),
    {
        let total = events.len();
        let mut result = BatchResult::default();

        for (i, event) in events.iter().enumerate() {
            on_progress(i, total, event);

            match self.process_and_save(event) {
                Ok(path) => result.output_files.push(path),
                Err(e) => {
                    tracing::warn!(
                        index = i + 1,
                        session_id = %event.session_id,
                        error = %e,
                        "Failed to process event"
                    );
                    result.errors.push((i + 1, e.to_string()));
                }
            }
        }

        tracing::debug!(
            written = result.output_files.len(),
            failed = result.errors.len(),
            "Batch complete"
        );
        result
    }

    /// Count events by kind and by transcript availability.
    pub fn stats(&self, events_file: &Path) -> Result<ProcessingStats> {
        let events = read_events(events_file)?;
        let mut stats = ProcessingStats {
            total_events: events.len(),
            ..Default::default()
        };

        for event in &events {
            match event.kind() {
                Ok(EventKind::Stop) => stats.stop_events += 1,
                Ok(EventKind::Notification) => stats.notification_events += 1,
                Err(_) => {}
            }

            if store::exists(&event.transcript_path) {
                stats.processable_events += 1;
            } else {
                stats.missing_transcripts += 1;
            }
        }

        Ok(stats)
    }

    /// Write at most one sample message per event kind into `test-samples/`.
    ///
    /// Walks the log in order, skipping events whose transcript is missing,
    /// and stops once every kind has a sample.
    pub fn generate_samples(&self, events_file: &Path) -> Result<Vec<PathBuf>> {
        let events = read_events(events_file)?;
        let samples_dir = self.store.samples_dir();
        std::fs::create_dir_all(&samples_dir)?;

        let mut done: HashSet<EventKind> = HashSet::new();
        let mut written = Vec::new();

        for (i, event) in events.iter().enumerate() {
            if done.len() == EventKind::ALL.len() {
                break;
            }

            let Ok(kind) = event.kind() else {
                continue;
            };
            if done.contains(&kind) {
                continue;
            }

            if !store::exists(&event.transcript_path) {
                tracing::info!(
                    index = i + 1,
                    path = %event.transcript_path.display(),
                    "Skipping sample event, transcript not found"
                );
                continue;
            }

            let message = match self.process(event) {
                Ok(message) => message,
                Err(e) => {
                    tracing::warn!(index = i + 1, error = %e, "Failed to process sample event");
                    continue;
                }
            };

            let path = samples_dir.join(format!("sample-{}-event.json", kind));
            if let Err(e) = self.store.write_json(&path, &message) {
                tracing::warn!(path = %path.display(), error = %e, "Failed to save sample");
                continue;
            }

            tracing::info!(path = %path.display(), "Created sample");
            done.insert(kind);
            written.push(path);
        }

        Ok(written)
    }
}

/// Read every decodable event from the log, in order.
///
/// Blank lines are ignored and malformed lines are logged and skipped.
pub fn read_events(path: &Path) -> Result<Vec<HookEvent>> {
    if !store::exists(path) {
        return Err(Error::EventsFileNotFound(path.to_path_buf()));
    }

    let reader = BufReader::new(File::open(path)?);
    let mut events = Vec::new();

    // Invalid UTF-8 is a per-line decode failure, not an I/O error
    for (idx, line) in reader.split(b'\n').enumerate() {
        let line = line?;
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        match serde_json::from_slice::<HookEvent>(&line) {
            Ok(event) => events.push(event),
            Err(e) => {
                tracing::warn!(
                    line = idx + 1,
                    path = %path.display(),
                    error = %e,
                    "Skipping malformed event line"
                );
            }
        }
    }

    Ok(events)
}

/// `messenger-<kind>-<session8>-<timestamp>.json`
///
/// The event's timestamp has `:` replaced by `-`; without one the current
/// local time is used.
pub fn messenger_file_name(event: &HookEvent) -> String {
    let timestamp = match event.timestamp() {
        Some(ts) => ts.replace(':', "-"),
        None => chrono::Local::now().format("%Y-%m-%dT%H-%M-%S").to_string(),
    };

    format!(
        "messenger-{}-{}-{}.json",
        event.hook_event_name.to_lowercase(),
        store::session_prefix(&event.session_id),
        timestamp
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                dir: TempDir::new().unwrap(),
            }
        }

        fn transcript(&self, name: &str, lines: &[serde_json::Value]) -> PathBuf {
            let path = self.dir.path().join(name);
            let mut file = File::create(&path).unwrap();
            for line in lines {
                writeln!(file, "{}", line).unwrap();
            }
            path
        }

        fn stop_transcript(&self, name: &str, text: &str) -> PathBuf {
            self.transcript(
                name,
                &[serde_json::json!({
                    "type": "assistant",
                    "message": {"content": [{"type": "text", "text": text}]}
                })],
            )
        }

        fn write_transcript(&self, name: &str) -> PathBuf {
            self.transcript(
                name,
                &[serde_json::json!({
                    "type": "assistant",
                    "message": {"content": [{
                        "type": "tool_use", "id": "t1", "name": "Write",
                        "input": {"file_path": "notes.md", "content": "hi"}
                    }]}
                })],
            )
        }

        fn events(&self, events: &[HookEvent]) -> PathBuf {
            let path = self.dir.path().join("events.jsonl");
            let mut file = File::create(&path).unwrap();
            for event in events {
                writeln!(file, "{}", serde_json::to_string(event).unwrap()).unwrap();
            }
            path
        }

        fn processor(&self) -> EventProcessor {
            EventProcessor::new(OutputStore::new(self.dir.path().join("out")))
        }
    }

    fn event(kind: &str, session: &str, transcript: &Path, ts: &str) -> HookEvent {
        HookEvent {
            session_id: session.to_string(),
            transcript_path: transcript.to_path_buf(),
            cwd: "/work".to_string(),
            hook_event_name: kind.to_string(),
            timestamp: Some(ts.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_file_name() {
        let ev = event(
            "Stop",
            "1fa8811f-aaaa-bbbb",
            Path::new("/t"),
            "2025-01-02T03:04:05Z",
        );
        assert_eq!(
            messenger_file_name(&ev),
            "messenger-stop-1fa8811f-2025-01-02T03-04-05Z.json"
        );

        let mut short = ev.clone();
        short.session_id = "abc".to_string();
        short.timestamp = None;
        let name = messenger_file_name(&short);
        assert!(name.starts_with("messenger-stop-abc-"));
        assert!(!name.contains(':'));
    }

    #[test]
    fn test_process_and_save_writes_pretty_json() {
        let fx = Fixture::new();
        let transcript = fx.write_transcript("t.jsonl");
        let ev = event("Notification", "sess-0001-x", &transcript, "2025-01-01T00:00:00Z");

        let path = fx.processor().process_and_save(&ev).unwrap();
        assert!(path.starts_with(fx.dir.path().join("out")));

        let message: MessengerMessage =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(message.title, "📝 File Creation Request");
        assert_eq!(
            message.context["quick_approve"],
            "claudetogo respond --session sess-0001-x --action approve"
        );
    }

    #[test]
    fn test_read_events_skips_malformed_lines() {
        let fx = Fixture::new();
        let path = fx.dir.path().join("events.jsonl");
        std::fs::write(
            &path,
            "{\"session_id\":\"a\",\"hook_event_name\":\"Stop\"}\nnot json\n\n{\"session_id\":\"b\",\"hook_event_name\":\"Notification\"}\n",
        )
        .unwrap();

        let events = read_events(&path).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].session_id, "b");
    }

    #[test]
    fn test_read_events_skips_non_utf8_line() {
        let fx = Fixture::new();
        let path = fx.dir.path().join("events.jsonl");
        let mut log = Vec::new();
        log.extend_from_slice(b"{\"session_id\":\"a\",\"hook_event_name\":\"Stop\"}\n");
        log.extend_from_slice(b"{\"session_id\":\"\xff\xfe\",\"hook_event_name\":\"Stop\"}\n");
        log.extend_from_slice(b"{\"session_id\":\"b\",\"hook_event_name\":\"Notification\"}\n");
        std::fs::write(&path, log).unwrap();

        let events = read_events(&path).unwrap();
        let ids: Vec<&str> = events.iter().map(|e| e.session_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);

        let stats = fx.processor().stats(&path).unwrap();
        assert_eq!(stats.total_events, 2);
        assert_eq!(stats.stop_events, 1);
        assert_eq!(stats.notification_events, 1);
    }

    #[test]
    fn test_missing_events_file() {
        let result = read_events(Path::new("/nonexistent/events.jsonl"));
        assert!(matches!(result, Err(Error::EventsFileNotFound(_))));
    }

    #[test]
    fn test_process_latest_continues_past_failures() {
        let fx = Fixture::new();
        let good = fx.stop_transcript("good.jsonl", "All done.");
        let missing = fx.dir.path().join("missing.jsonl");

        let mut events = Vec::new();
        for i in 1..=10 {
            let transcript = if i % 2 == 0 { &good } else { &missing };
            events.push(event(
                "Stop",
                &format!("session{:02}", i),
                transcript,
                &format!("2025-01-01T00:00:{:02}Z", i),
            ));
        }
        let log = fx.events(&events);

        let result = fx.processor().process_latest(&log, 3).unwrap();
        // Events 8, 9, 10: 9 has no transcript
        assert_eq!(result.total(), 3);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].0, 2);
        let names: Vec<_> = result
            .output_files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert!(names[0].contains("session0"));
        assert!(names[0].contains("00-00-08Z"));
        assert!(names[1].contains("00-00-10Z"));
    }

    #[test]
    fn test_process_all_reports_progress() {
        let fx = Fixture::new();
        let t = fx.stop_transcript("t.jsonl", "Done.");
        let log = fx.events(&[
            event("Stop", "s1", &t, "2025-01-01T00:00:01Z"),
            event("Stop", "s2", &t, "2025-01-01T00:00:02Z"),
        ]);

        let mut seen = Vec::new();
        let result = fx
            .processor()
            .process_all_with_progress(&log, |current, total, ev| {
                seen.push((current, total, ev.session_id.clone()));
            })
            .unwrap();

        assert_eq!(result.output_files.len(), 2);
        assert_eq!(
            seen,
            vec![(0, 2, "s1".to_string()), (1, 2, "s2".to_string())]
        );
    }

    #[test]
    fn test_stats() {
        let fx = Fixture::new();
        let t = fx.stop_transcript("t.jsonl", "Done.");
        let missing = fx.dir.path().join("nope.jsonl");
        let log = fx.events(&[
            event("Stop", "s1", &t, "x"),
            event("notification", "s2", &missing, "x"),
            event("PreToolUse", "s3", &t, "x"),
        ]);

        let stats = fx.processor().stats(&log).unwrap();
        assert_eq!(
            stats,
            ProcessingStats {
                total_events: 3,
                stop_events: 1,
                notification_events: 1,
                processable_events: 2,
                missing_transcripts: 1,
            }
        );
    }

    #[test]
    fn test_generate_samples_one_per_kind() {
        let fx = Fixture::new();
        let stop = fx.stop_transcript("stop.jsonl", "Finished.");
        let write = fx.write_transcript("write.jsonl");
        let missing = fx.dir.path().join("missing.jsonl");
        let log = fx.events(&[
            event("Notification", "n0", &missing, "1"),
            event("Stop", "s1", &stop, "2"),
            event("Stop", "s2", &stop, "3"),
            event("Notification", "n1", &write, "4"),
        ]);

        let processor = fx.processor();
        let written = processor.generate_samples(&log).unwrap();

        assert_eq!(written.len(), 2);
        let samples = processor.store().samples_dir();
        assert!(samples.join("sample-stop-event.json").exists());
        assert!(samples.join("sample-notification-event.json").exists());

        let stop_sample: MessengerMessage = processor
            .store()
            .read_json(&samples.join("sample-stop-event.json"))
            .unwrap();
        assert_eq!(stop_sample.session_id, "s1");
    }
}
