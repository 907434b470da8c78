//! Event log watcher (service mode)
//!
//! Polls the event log and processes only the events appended since the
//! last observation.
//!
//! ```text
//! Uninitialized --establish_baseline--> Baseline --run--> Polling --cancel--> Stopped
//! ```
//!
//! Each tick compares the file size against the baseline first and only
//! re-reads the log when the size changed. A log that is rotated and regrows
//! to exactly the previous size between two ticks goes unnoticed.

use crate::error::Result;
use crate::processor::{BatchResult, EventProcessor};
use crate::store::{self, OutputStore};
use crate::types::WatcherStats;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

/// Service name written into the status marker.
pub const SERVICE_NAME: &str = "claudetogo-watcher";

/// Longest uninterrupted sleep while waiting for the next tick.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    Uninitialized,
    Baseline,
    Polling,
    Stopped,
}

/// Last observed (file size, event count) pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Baseline {
    pub file_size: u64,
    pub event_count: usize,
}

pub struct EventWatcher {
    events_file: PathBuf,
    poll_interval: Duration,
    processor: EventProcessor,
    state: WatcherState,
    baseline: Baseline,
    last_processed: DateTime<Utc>,
}

impl EventWatcher {
    pub fn new(events_file: impl Into<PathBuf>, store: OutputStore, poll_interval: Duration) -> Self {
        Self {
            events_file: events_file.into(),
            poll_interval,
            processor: EventProcessor::new(store),
            state: WatcherState::Uninitialized,
            baseline: Baseline::default(),
            last_processed: Utc::now(),
        }
    }

    pub fn state(&self) -> WatcherState {
        self.state
    }

    pub fn baseline(&self) -> Baseline {
        self.baseline
    }

    pub fn events_file(&self) -> &Path {
        &self.events_file
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn store(&self) -> &OutputStore {
        self.processor.store()
    }

    /// Record the current size and event count so existing events are never
    /// reprocessed.
    ///
    /// A missing log gives a zero baseline. If the log exists but cannot be
    /// counted, the count starts at zero.
    pub fn establish_baseline(&mut self) -> Result<()> {
        self.baseline = if store::exists(&self.events_file) {
            let file_size = fs::metadata(&self.events_file)?.len();
            let event_count = match self.processor.stats(&self.events_file) {
                Ok(stats) => stats.total_events,
                Err(e) => {
                    tracing::debug!(error = %e, "Could not count initial events");
                    0
                }
            };
            Baseline {
                file_size,
                event_count,
            }
        } else {
            tracing::info!(
                path = %self.events_file.display(),
                "Events file does not exist yet"
            );
            Baseline::default()
        };

        self.last_processed = Utc::now();
        self.state = WatcherState::Baseline;

        tracing::info!(
            events = self.baseline.event_count,
            bytes = self.baseline.file_size,
            "Baseline established"
        );
        Ok(())
    }

    /// Check the log once and process any newly appended events.
    ///
    /// Returns `None` when there was nothing to do.
    pub fn tick(&mut self) -> Result<Option<BatchResult>> {
        if !store::exists(&self.events_file) {
            return Ok(None);
        }

        let size = fs::metadata(&self.events_file)?.len();
        if size == self.baseline.file_size {
            return Ok(None);
        }

        let stats = self.processor.stats(&self.events_file)?;
        if stats.total_events <= self.baseline.event_count {
            return Ok(None);
        }

        let new_events = stats.total_events - self.baseline.event_count;
        tracing::info!(count = new_events, "Detected new events");

        let result = self.processor.process_latest(&self.events_file, new_events)?;
        for path in &result.output_files {
            tracing::info!(path = %path.display(), "Generated messenger file");
        }

        self.baseline = Baseline {
            file_size: size,
            event_count: stats.total_events,
        };
        self.last_processed = Utc::now();

        Ok(Some(result))
    }

    /// Poll until `running` is cleared.
    ///
    /// Establishes the baseline first if needed. Tick errors are logged and
    /// polling continues; `on_batch` sees every non-empty tick. Cancellation
    /// is checked between ticks, never during one.
    pub fn run<F>(&mut self, running: &AtomicBool, mut on_batch: F) -> Result<()>
    where
        F: FnMut(&BatchResult),
    {
        tracing::info!(
            events_file = %self.events_file.display(),
            output_dir = %self.processor.output_dir().display(),
            poll_ms = self.poll_interval.as_millis() as u64,
            "Starting event watcher"
        );

        if self.state == WatcherState::Uninitialized {
            self.establish_baseline()?;
        }
        self.state = WatcherState::Polling;

        while sleep_while_running(running, self.poll_interval) {
            match self.tick() {
                Ok(Some(result)) => on_batch(&result),
                Ok(None) => {}
                Err(e) => tracing::error!(error = %e, "Error checking for new events"),
            }
        }

        self.state = WatcherState::Stopped;
        tracing::info!("Event watcher stopped");
        Ok(())
    }

    pub fn stats(&self) -> Result<WatcherStats> {
        let stats = self.processor.stats(&self.events_file)?;
        Ok(WatcherStats {
            events_file: self.events_file.clone(),
            output_dir: self.processor.output_dir().to_path_buf(),
            poll_interval_ms: self.poll_interval.as_millis() as u64,
            last_processed: self.last_processed,
            total_events: stats.total_events,
            processable_events: stats.processable_events,
            is_running: self.state == WatcherState::Polling,
        })
    }
}

/// Sleep for `total`, waking early if `running` is cleared.
///
/// Returns whether the caller should keep going.
fn sleep_while_running(running: &AtomicBool, total: Duration) -> bool {
    let mut remaining = total;
    while !remaining.is_zero() {
        if !running.load(Ordering::SeqCst) {
            return false;
        }
        let step = remaining.min(SLEEP_SLICE);
        thread::sleep(step);
        remaining -= step;
    }
    running.load(Ordering::SeqCst)
}

/// Contents of the `.watcher-status` marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub service: String,
    pub status: String,
    pub started: String,
    pub events_file: PathBuf,
    pub output_dir: PathBuf,
    pub poll_interval_ms: u64,
    pub pid: u32,
}

impl ServiceStatus {
    /// Read the marker from an output directory; `None` when no service runs.
    pub fn read(store: &OutputStore) -> Option<Self> {
        let path = store.status_marker_path();
        if !store::exists(&path) {
            return None;
        }
        store.read_json(&path).ok()
    }
}

/// Status marker file that lives exactly as long as this guard.
pub struct StatusMarker {
    path: PathBuf,
}

impl StatusMarker {
    pub fn create(watcher: &EventWatcher) -> Result<Self> {
        let store = watcher.store();
        let status = ServiceStatus {
            service: SERVICE_NAME.to_string(),
            status: "running".to_string(),
            started: chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            events_file: watcher.events_file().to_path_buf(),
            output_dir: store.root().to_path_buf(),
            poll_interval_ms: watcher.poll_interval().as_millis() as u64,
            pid: std::process::id(),
        };

        let path = store.status_marker_path();
        store.write_json(&path, &status)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StatusMarker {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::debug!(path = %self.path.display(), error = %e, "Could not remove status file");
        }
    }
}

/// Run the watcher as a service: output directory, status marker, poll loop.
///
/// The marker is best-effort; failing to write it does not stop the service.
pub fn run_service<F>(watcher: &mut EventWatcher, running: &AtomicBool, on_batch: F) -> Result<()>
where
    F: FnMut(&BatchResult),
{
    watcher.store().ensure_root()?;

    let _marker = match StatusMarker::create(watcher) {
        Ok(marker) => Some(marker),
        Err(e) => {
            tracing::debug!(error = %e, "Could not create status file");
            None
        }
    };

    watcher.run(running, on_batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn stop_transcript(dir: &Path) -> PathBuf {
        let path = dir.join("transcript.jsonl");
        fs::write(
            &path,
            r#"{"type":"assistant","message":{"content":[{"type":"text","text":"Done."}]}}"#,
        )
        .unwrap();
        path
    }

    fn append_stop(log: &Path, transcript: &Path, n: usize) {
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log)
            .unwrap();
        let line = serde_json::json!({
            "session_id": format!("session-{:03}", n),
            "transcript_path": transcript,
            "cwd": "/work",
            "hook_event_name": "Stop",
            "timestamp": format!("2025-01-01T00:00:{:02}Z", n),
        });
        writeln!(file, "{}", line).unwrap();
    }

    fn watcher(dir: &TempDir) -> EventWatcher {
        EventWatcher::new(
            dir.path().join("events.jsonl"),
            OutputStore::new(dir.path().join("out")),
            Duration::from_millis(20),
        )
    }

    #[test]
    fn test_missing_log_gives_zero_baseline() {
        let dir = TempDir::new().unwrap();
        let mut watcher = watcher(&dir);
        assert_eq!(watcher.state(), WatcherState::Uninitialized);

        watcher.establish_baseline().unwrap();
        assert_eq!(watcher.baseline(), Baseline::default());
        assert_eq!(watcher.state(), WatcherState::Baseline);

        // Nothing to do until the log appears
        assert!(watcher.tick().unwrap().is_none());
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_existing_events_are_not_reprocessed() {
        let dir = TempDir::new().unwrap();
        let transcript = stop_transcript(dir.path());
        let log = dir.path().join("events.jsonl");
        append_stop(&log, &transcript, 1);
        append_stop(&log, &transcript, 2);

        let mut watcher = watcher(&dir);
        watcher.establish_baseline().unwrap();
        assert_eq!(watcher.baseline().event_count, 2);
        assert!(watcher.tick().unwrap().is_none());

        append_stop(&log, &transcript, 3);
        let result = watcher.tick().unwrap().unwrap();
        assert_eq!(result.output_files.len(), 1);
        assert!(result.output_files[0]
            .to_string_lossy()
            .contains("00-00-03Z"));
        assert_eq!(watcher.baseline().event_count, 3);
        assert_eq!(watcher.baseline().file_size, fs::metadata(&log).unwrap().len());

        // Unchanged size short-circuits
        assert!(watcher.tick().unwrap().is_none());
    }

    #[test]
    fn test_growth_without_new_events_keeps_size() {
        let dir = TempDir::new().unwrap();
        let transcript = stop_transcript(dir.path());
        let log = dir.path().join("events.jsonl");
        append_stop(&log, &transcript, 1);

        let mut watcher = watcher(&dir);
        watcher.establish_baseline().unwrap();
        let before = watcher.baseline();

        fs::OpenOptions::new()
            .append(true)
            .open(&log)
            .unwrap()
            .write_all(b"\n\n")
            .unwrap();

        assert!(watcher.tick().unwrap().is_none());
        assert_eq!(watcher.baseline(), before);
    }

    #[test]
    fn test_status_marker_removed_on_drop() {
        let dir = TempDir::new().unwrap();
        let watcher = watcher(&dir);

        let marker = StatusMarker::create(&watcher).unwrap();
        let status = ServiceStatus::read(watcher.store()).unwrap();
        assert_eq!(status.service, SERVICE_NAME);
        assert_eq!(status.status, "running");
        assert_eq!(status.poll_interval_ms, 20);
        assert_eq!(status.pid, std::process::id());

        let path = marker.path().to_path_buf();
        drop(marker);
        assert!(!path.exists());
        assert!(ServiceStatus::read(watcher.store()).is_none());
    }

    #[test]
    fn test_run_service_stops_on_cancel() {
        let dir = TempDir::new().unwrap();
        let transcript = stop_transcript(dir.path());
        let log = dir.path().join("events.jsonl");
        let mut watcher = watcher(&dir);

        let running = Arc::new(AtomicBool::new(true));
        let r = running.clone();
        let writer_log = log.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            append_stop(&writer_log, &transcript, 7);
            thread::sleep(Duration::from_millis(300));
            r.store(false, Ordering::SeqCst);
        });

        let mut batches = 0;
        run_service(&mut watcher, &running, |result| {
            batches += result.output_files.len();
        })
        .unwrap();
        handle.join().unwrap();

        assert_eq!(batches, 1);
        assert_eq!(watcher.state(), WatcherState::Stopped);
        assert!(!watcher.store().status_marker_path().exists());
    }

    #[test]
    fn test_stats() {
        let dir = TempDir::new().unwrap();
        let transcript = stop_transcript(dir.path());
        append_stop(&dir.path().join("events.jsonl"), &transcript, 1);

        let mut watcher = watcher(&dir);
        watcher.establish_baseline().unwrap();
        let stats = watcher.stats().unwrap();

        assert_eq!(stats.total_events, 1);
        assert_eq!(stats.processable_events, 1);
        assert_eq!(stats.poll_interval_ms, 20);
        assert!(!stats.is_running);
    }
}
