//! Response commands: `respond`, `status`, `pending` and `info`

use anyhow::{Context, Result};
use claudetogo_core::store::session_prefix;
use claudetogo_core::{ActionKind, Config, MessengerMessage, OutputStore, Responder};
use serde_json::Value;

fn responder(config: &Config) -> Responder {
    Responder::new(OutputStore::new(&config.output.dir))
}

pub fn run_respond(config: &Config, session: &str, action: &str) -> Result<()> {
    let outcome = responder(config)
        .respond(session, action)
        .with_context(|| format!("failed to respond to session {}", session))?;

    println!(
        "✅ Recorded '{}' for session {}",
        outcome.record.action, session
    );
    println!("   {}", outcome.message.title);

    match outcome.record.action {
        ActionKind::Info => print_message(session, &outcome.message),
        ActionKind::Modify => {
            if let Some(command) = outcome.suggested_command() {
                println!("Review with: {}", command);
            }
        }
        ActionKind::Approve | ActionKind::Reject => {}
    }
    Ok(())
}

pub fn run_info(config: &Config, session: &str) -> Result<()> {
    run_respond(config, session, ActionKind::Info.as_str())
}

pub fn run_status(config: &Config, session: &str) -> Result<()> {
    let status = responder(config)
        .session_status(session)
        .with_context(|| format!("session not found: {}", session))?;

    println!("Session:  {}", status.session_id);
    println!("Status:   {}", status.status);
    println!(
        "Created:  {}",
        status
            .created_at
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M:%S")
    );
    if let Some(action) = status.last_action {
        println!("Response: {}", action);
    }
    println!("File:     {}", status.messenger_file.display());
    Ok(())
}

pub fn run_pending(config: &Config) -> Result<()> {
    let pending = responder(config)
        .list_pending()
        .context("failed to list pending actions")?;

    if pending.is_empty() {
        println!("No pending actions.");
        return Ok(());
    }

    println!("⏳ {} pending action(s):", pending.len());
    for action in &pending {
        println!(
            "  [{}] {} {}",
            action.created_at.with_timezone(&chrono::Local).format("%H:%M:%S"),
            session_prefix(&action.session_id),
            action.title
        );
        println!("      {}", first_line(&action.message));
    }
    Ok(())
}

fn print_message(session: &str, message: &MessengerMessage) {
    println!();
    println!("📋 Session Information: {}", session);
    println!("{}", "━".repeat(43));
    println!("Type:     {}", message.message_type);
    println!("Title:    {}", message.title);
    println!("Message:  {}", message.message);
    println!("Time:     {}", message.timestamp);

    if !message.context.is_empty() {
        println!("Context:");
        for (key, value) in &message.context {
            println!("  {}: {}", key, display_value(value));
        }
    }

    if !message.actions.is_empty() {
        println!("Actions:");
        for action in &message.actions {
            println!("  {}  {}", action.label, action.command);
        }
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => first_line(s).to_string(),
        other => other.to_string(),
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("")
}

