//! `claudetogo process` and `claudetogo service`

use anyhow::{Context, Result};
use clap::Args;
use claudetogo_core::processor::BatchResult;
use claudetogo_core::watcher::{self, EventWatcher, ServiceStatus};
use claudetogo_core::{Config, EventProcessor, OutputStore, ProcessingStats};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Args)]
pub struct ProcessArgs {
    /// Event log to read (default: from config)
    #[arg(long)]
    events_file: Option<PathBuf>,

    /// Directory for messenger files (default: from config)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Only process the last N events
    #[arg(long, value_name = "N")]
    latest: Option<usize>,

    /// Show event statistics instead of processing
    #[arg(long)]
    stats: bool,

    /// Write one sample message per event kind into test-samples/
    #[arg(long)]
    generate_samples: bool,

    /// Keep running and process new events as they arrive
    #[arg(long)]
    watch: bool,

    /// Poll interval in milliseconds (only with --watch)
    #[arg(long, value_parser = clap::value_parser!(u64).range(100..))]
    interval_ms: Option<u64>,
}

#[derive(Args)]
pub struct ServiceArgs {
    /// Event log to watch (default: from config)
    #[arg(long)]
    events_file: Option<PathBuf>,

    /// Directory for messenger files (default: from config)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Poll interval in milliseconds (default: from config)
    #[arg(long, value_parser = clap::value_parser!(u64).range(100..))]
    interval_ms: Option<u64>,
}

struct Paths {
    events_file: PathBuf,
    output_dir: PathBuf,
}

fn resolve(config: &Config, events_file: &Option<PathBuf>, output_dir: &Option<PathBuf>) -> Paths {
    Paths {
        events_file: events_file
            .clone()
            .unwrap_or_else(|| config.events.file.clone()),
        output_dir: output_dir.clone().unwrap_or_else(|| config.output.dir.clone()),
    }
}

pub fn run_process(config: &Config, args: &ProcessArgs) -> Result<()> {
    if args.watch {
        return run_service(
            config,
            &ServiceArgs {
                events_file: args.events_file.clone(),
                output_dir: args.output_dir.clone(),
                interval_ms: args.interval_ms,
            },
        );
    }

    let paths = resolve(config, &args.events_file, &args.output_dir);
    let processor = EventProcessor::new(OutputStore::new(&paths.output_dir));

    if args.stats {
        let stats = processor
            .stats(&paths.events_file)
            .context("failed to get processing stats")?;
        print_stats(&paths, &stats);
        return Ok(());
    }

    if args.generate_samples {
        let written = processor
            .generate_samples(&paths.events_file)
            .context("failed to generate samples")?;
        for path in &written {
            println!("Created sample: {}", path.display());
        }
        println!("✅ Generated {} sample(s)", written.len());
        return Ok(());
    }

    println!("Processing events from {}...", paths.events_file.display());

    let result = match args.latest {
        Some(n) => processor
            .process_latest(&paths.events_file, n)
            .context("failed to process latest events")?,
        None => {
            let pb = ProgressBar::new(0);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                    .context("invalid progress bar template")?
                    .progress_chars("#>-"),
            );

            let result = processor
                .process_all_with_progress(&paths.events_file, |current, total, event| {
                    if current == 0 {
                        pb.set_length(total as u64);
                    }
                    pb.set_position(current as u64);
                    pb.set_message(format!(
                        "{} {}",
                        event.hook_event_name,
                        claudetogo_core::store::session_prefix(&event.session_id)
                    ));
                })
                .context("failed to process events")?;

            pb.finish_and_clear();
            result
        }
    };

    print_batch(&result);

    tracing::info!(
        written = result.output_files.len(),
        failed = result.errors.len(),
        "Processing complete"
    );
    Ok(())
}

pub fn run_service(config: &Config, args: &ServiceArgs) -> Result<()> {
    let paths = resolve(config, &args.events_file, &args.output_dir);
    let interval = args
        .interval_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| config.watcher.poll_interval());

    let mut event_watcher = EventWatcher::new(
        &paths.events_file,
        OutputStore::new(&paths.output_dir),
        interval,
    );

    if let Some(existing) = ServiceStatus::read(event_watcher.store()) {
        println!(
            "⚠️  Status marker from pid {} (started {}) already present; it will be replaced.",
            existing.pid, existing.started
        );
    }

    let running = crate::shutdown_flag()?;

    println!("🔍 Watching: {}", paths.events_file.display());
    println!("📁 Output:   {}", paths.output_dir.display());
    println!(
        "Service active (poll every {}ms). Press Ctrl+C to stop.",
        interval.as_millis()
    );
    println!();

    watcher::run_service(&mut event_watcher, &running, |result| {
        let timestamp = chrono::Local::now().format("%H:%M:%S");
        println!(
            "[{}] Processed {} new event(s)",
            timestamp,
            result.total()
        );
        for path in &result.output_files {
            println!("  Generated: {}", path.display());
        }
        for (index, error) in &result.errors {
            println!("  Warning: event {} failed: {}", index, error);
        }
    })
    .context("event watcher failed")?;

    println!("Service stopped.");
    Ok(())
}

fn print_stats(paths: &Paths, stats: &ProcessingStats) {
    println!("📊 Event statistics for {}", paths.events_file.display());
    println!("  Total events:        {}", stats.total_events);
    println!("  Stop events:         {}", stats.stop_events);
    println!("  Notification events: {}", stats.notification_events);
    println!("  Processable events:  {}", stats.processable_events);
    println!("  Missing transcripts: {}", stats.missing_transcripts);
}

fn print_batch(result: &BatchResult) {
    for (index, error) in &result.errors {
        println!("  Warning: failed to process event {}: {}", index, error);
    }

    println!(
        "✅ Processed {} of {} event(s)",
        result.output_files.len(),
        result.total()
    );
    for path in &result.output_files {
        println!("  {}", path.display());
    }
}
