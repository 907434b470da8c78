//! claudetogo - Claude Code notifications for messengers
//!
//! Records Claude Code hook events, turns them into messenger-ready JSON
//! files and records the replies.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Config: $XDG_CONFIG_HOME/claudetogo/config.toml (~/.config/claudetogo/config.toml)
//! - Logs: $XDG_STATE_HOME/claudetogo/claudetogo.log.YYYY-MM-DD (~/.local/state/claudetogo/)

mod config_cmd;
mod live;
mod process;
mod respond;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use claudetogo_core::Config;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "claudetogo")]
#[command(about = "Turn Claude Code hook events into messenger-ready notifications")]
#[command(version)]
struct Args {
    /// Config file (default: ~/.config/claudetogo/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Read a hook event from stdin and append it to the event log
    Hook,

    /// Print events as they are appended to the event log
    Monitor,

    /// Process events into messenger files
    Process(process::ProcessArgs),

    /// Watch the event log and process new events as they arrive
    Service(process::ServiceArgs),

    /// Record a response for a session
    Respond {
        /// Session id (full id or 8-character prefix)
        #[arg(long)]
        session: String,

        /// approve, reject, modify or info
        #[arg(long)]
        action: String,
    },

    /// Show the status of a session
    Status {
        /// Session id (full id or 8-character prefix)
        #[arg(long)]
        session: String,
    },

    /// List requests still waiting for a response
    Pending,

    /// Show details of a session's request
    Info {
        /// Session id (full id or 8-character prefix)
        #[arg(long)]
        session: String,
    },

    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        command: config_cmd::ConfigCommand,
    },
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => Config::load().context("failed to load configuration")?,
    };

    config.apply_env_overrides();
    if args.verbose {
        config.logging.level = "debug".to_string();
    }
    Ok(config)
}

/// Install a Ctrl+C handler and return the flag it clears.
fn shutdown_flag() -> Result<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        eprintln!("\nShutting down...");
        r.store(false, Ordering::SeqCst);
    })
    .context("failed to set Ctrl+C handler")?;

    Ok(running)
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Config subcommands must work even when the config file is broken
    if let Command::Config { command } = &args.command {
        return config_cmd::run(command, args.config.as_deref());
    }

    let config = load_config(&args)?;
    config.validate().context("invalid configuration")?;

    // Initialize logging
    let _log_guard =
        claudetogo_core::logging::init(&config.logging).context("failed to initialize logging")?;

    tracing::info!(command = command_name(&args.command), "claudetogo starting");

    match &args.command {
        Command::Hook => live::run_hook(&config),
        Command::Monitor => live::run_monitor(&config, &*shutdown_flag()?),
        Command::Process(process_args) => process::run_process(&config, process_args),
        Command::Service(service_args) => process::run_service(&config, service_args),
        Command::Respond { session, action } => respond::run_respond(&config, session, action),
        Command::Status { session } => respond::run_status(&config, session),
        Command::Pending => respond::run_pending(&config),
        Command::Info { session } => respond::run_info(&config, session),
        Command::Config { .. } => Ok(()),
    }
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Hook => "hook",
        Command::Monitor => "monitor",
        Command::Process(_) => "process",
        Command::Service(_) => "service",
        Command::Respond { .. } => "respond",
        Command::Status { .. } => "status",
        Command::Pending => "pending",
        Command::Info { .. } => "info",
        Command::Config { .. } => "config",
    }
}
