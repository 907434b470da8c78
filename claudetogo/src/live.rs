//! Hook ingestion and the live event monitor

use anyhow::{Context, Result};
use claudetogo_core::monitor::format_event_line;
use claudetogo_core::{hook, Config, EventTail};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

/// Read one event from stdin, append it to the log, answer Claude Code.
pub fn run_hook(config: &Config) -> Result<()> {
    let event = hook::read_event(io::stdin().lock())
        .context("failed to decode hook event from stdin")?;

    hook::append_event(&config.events.file, &event).with_context(|| {
        format!(
            "failed to save hook event to {}",
            config.events.file.display()
        )
    })?;

    let response =
        serde_json::to_string(&hook::decision()).context("failed to encode hook response")?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", response).context("failed to send hook response")?;

    tracing::info!(
        kind = %event.hook_event_name,
        session_id = %event.session_id,
        "Hook event processed"
    );
    Ok(())
}

pub fn run_monitor(config: &Config, running: &AtomicBool) -> Result<()> {
    let mut tail = EventTail::new(&config.events.file);
    let interval = config.monitor.poll_interval();

    println!(
        "Monitoring {} (poll every {}ms). Press Ctrl+C to stop.",
        tail.path().display(),
        config.monitor.poll_interval_ms
    );

    while running.load(Ordering::SeqCst) {
        match tail.poll() {
            Ok(events) => {
                for event in &events {
                    println!("{}", format_event_line(event, chrono::Local::now()));
                }
            }
            Err(e) => tracing::error!(error = %e, "Error checking for events"),
        }
        thread::sleep(interval);
    }

    println!("Monitor stopped.");
    Ok(())
}
