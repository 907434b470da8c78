//! Messenger message formatting
//!
//! Renders [`ExtractedData`] into a [`MessengerMessage`]: title, body,
//! priority and the list of [`SuggestedAction`]s a recipient can run.
//!
//! Every suggested command is a complete shell line that can be executed
//! as-is, e.g. `claudetogo respond --session <id> --action approve`.

use crate::error::{Error, Result};
use crate::extractor::value_text;
use crate::types::{
    ActionKind, EventKind, EventPayload, ExtractedData, MessageType, MessengerMessage, NotificationData,
    Priority, StopData, SuggestedAction, TaskStatus, ToolAction,
};
use serde_json::{Map, Value};
use std::path::Path;

/// Name of the executable embedded in suggested commands.
pub const COMMAND_NAME: &str = "claudetogo";

/// Command line that records a response for a session.
pub fn respond_command(session_id: &str, action: ActionKind) -> String {
    format!(
        "{} respond --session {} --action {}",
        COMMAND_NAME, session_id, action
    )
}

fn session_command(subcommand: &str, session_id: &str) -> String {
    format!("{} {} --session {}", COMMAND_NAME, subcommand, session_id)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Formatter;

impl Formatter {
    pub fn new() -> Self {
        Self
    }

    /// Render extracted data as a messenger message.
    ///
    /// Fails with [`Error::PayloadMismatch`] if the payload does not belong to
    /// the declared event kind.
    pub fn format(&self, data: &ExtractedData) -> Result<MessengerMessage> {
        match (data.event_kind, &data.payload) {
            (EventKind::Stop, EventPayload::Stop(stop)) => Ok(format_stop(data, stop)),
            (EventKind::Notification, EventPayload::Notification(notification)) => {
                Ok(format_notification(data, notification))
            }
            (EventKind::Stop, _) => Err(Error::PayloadMismatch("stop")),
            (EventKind::Notification, _) => Err(Error::PayloadMismatch("notification")),
        }
    }

    /// [`Formatter::format`] plus delivery hints in the context map.
    ///
    /// Adds `formatted_at` and `cwd_basename`, and for tool requests the
    /// `quick_approve` / `quick_reject` command lines.
    pub fn format_actionable(&self, data: &ExtractedData) -> Result<MessengerMessage> {
        let mut message = self.format(data)?;

        let context = &mut message.context;
        insert(context, "formatted_at", &data.timestamp);
        insert(context, "cwd_basename", &basename(&data.cwd));

        if message.message_type == MessageType::ActionNeeded {
            insert(
                context,
                "quick_approve",
                &respond_command(&data.session_id, ActionKind::Approve),
            );
            insert(
                context,
                "quick_reject",
                &respond_command(&data.session_id, ActionKind::Reject),
            );
        }

        Ok(message)
    }
}

fn insert(context: &mut Map<String, Value>, key: &str, value: &str) {
    context.insert(key.to_string(), Value::String(value.to_string()));
}

/// Final path component, `.` for an empty path.
fn basename(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }
    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

// ============================================
// Stop
// ============================================

fn format_stop(data: &ExtractedData, stop: &StopData) -> MessengerMessage {
    let (title, priority) = match stop.task_status {
        TaskStatus::Completed => ("✅ Task Completed", Priority::Medium),
        TaskStatus::Error => ("❌ Task Failed", Priority::High),
        TaskStatus::Cancelled => ("⏹️ Task Cancelled", Priority::Low),
    };

    let mut context = Map::new();
    insert(&mut context, "cwd", &data.cwd);
    insert(&mut context, "task_status", stop.task_status.as_str());
    insert(&mut context, "session_id", &data.session_id);
    if !stop.summary.is_empty() {
        insert(&mut context, "summary", &stop.summary);
    }

    let actions = match stop.task_status {
        TaskStatus::Completed => vec![suggested(
            ActionKind::Info,
            "ℹ️",
            "View Details",
            session_command("status", &data.session_id),
            "View full session details".to_string(),
        )],
        TaskStatus::Error => vec![
            suggested(
                ActionKind::Info,
                "🔍",
                "Debug",
                session_command("debug", &data.session_id),
                "Get debug information about the error".to_string(),
            ),
            suggested(
                ActionKind::Info,
                "📋",
                "View Log",
                session_command("log", &data.session_id),
                "View the full session log".to_string(),
            ),
        ],
        TaskStatus::Cancelled => Vec::new(),
    };

    MessengerMessage {
        message_type: MessageType::Completion,
        session_id: data.session_id.clone(),
        title: title.to_string(),
        message: stop_body(stop),
        actions,
        context,
        timestamp: data.timestamp.clone(),
        priority,
    }
}

fn stop_body(stop: &StopData) -> String {
    if stop.final_message.is_empty() {
        return "Claude has completed the task.".to_string();
    }
    let text = stop.final_message.trim();

    let lower = text.to_lowercase();
    match stop.task_status {
        TaskStatus::Error if !lower.contains("error") => format!("Error: {}", text),
        TaskStatus::Cancelled if !lower.contains("cancel") => format!("Cancelled: {}", text),
        _ => text.to_string(),
    }
}

// ============================================
// Notification
// ============================================

fn format_notification(data: &ExtractedData, notification: &NotificationData) -> MessengerMessage {
    let mut context = Map::new();
    insert(&mut context, "cwd", &data.cwd);
    insert(&mut context, "tool_name", &notification.tool_name);
    insert(&mut context, "action", notification.action.as_str());
    insert(&mut context, "session_id", &data.session_id);
    for (key, value) in &notification.details {
        context.insert(key.clone(), value.clone());
    }

    MessengerMessage {
        message_type: MessageType::ActionNeeded,
        session_id: data.session_id.clone(),
        title: notification_title(notification),
        message: notification_body(notification),
        actions: notification_actions(notification, &data.session_id),
        context,
        timestamp: data.timestamp.clone(),
        priority: Priority::High,
    }
}

fn notification_title(notification: &NotificationData) -> String {
    match notification.action {
        ToolAction::CreateFile => "📝 File Creation Request".to_string(),
        ToolAction::EditFile => "✏️ File Edit Request".to_string(),
        ToolAction::ReadFile => "👀 File Read Request".to_string(),
        ToolAction::FetchUrl => "🌐 Web Fetch Request".to_string(),
        ToolAction::ExecuteCommand => "⚡ Command Execution Request".to_string(),
        ToolAction::ListDirectory => "📂 Directory List Request".to_string(),
        ToolAction::UseTool => format!("🔧 {} Tool Request", notification.tool_name),
    }
}

/// Verb phrase completing "Claude wants to ...".
fn action_description(notification: &NotificationData) -> String {
    match notification.action {
        ToolAction::CreateFile => "create a new file".to_string(),
        ToolAction::EditFile => "edit an existing file".to_string(),
        ToolAction::ReadFile => "read a file".to_string(),
        ToolAction::FetchUrl => "fetch content from a URL".to_string(),
        ToolAction::ExecuteCommand => "execute a command".to_string(),
        ToolAction::ListDirectory => "list directory contents".to_string(),
        ToolAction::UseTool => format!("use the {} tool", notification.tool_name),
    }
}

fn detail(notification: &NotificationData, key: &str) -> Option<String> {
    notification.details.get(key).map(value_text)
}

fn notification_body(notification: &NotificationData) -> String {
    let generic = format!("Claude wants to {}", action_description(notification));

    let specific = match notification.action {
        ToolAction::CreateFile => detail(notification, "target_file").map(|file| {
            let mut body = format!("Claude wants to create file: {}", basename(&file));
            if let Some(preview) = detail(notification, "content_preview") {
                body.push_str("\n\nContent preview:\n");
                body.push_str(&preview);
            }
            body
        }),
        ToolAction::EditFile => detail(notification, "target_file")
            .map(|file| format!("Claude wants to edit file: {}", basename(&file))),
        ToolAction::ReadFile => detail(notification, "target_file")
            .map(|file| format!("Claude wants to read file: {}", basename(&file))),
        ToolAction::FetchUrl => {
            detail(notification, "target_url").map(|url| format!("Claude wants to fetch: {}", url))
        }
        ToolAction::ExecuteCommand => {
            detail(notification, "command").map(|cmd| format!("Claude wants to run: {}", cmd))
        }
        ToolAction::ListDirectory => detail(notification, "target_path")
            .map(|path| format!("Claude wants to list directory: {}", path)),
        ToolAction::UseTool => None,
    };

    specific.unwrap_or(generic)
}

fn notification_actions(notification: &NotificationData, session_id: &str) -> Vec<SuggestedAction> {
    let description = action_description(notification);

    let mut actions = vec![
        suggested(
            ActionKind::Approve,
            "✅",
            "Approve",
            respond_command(session_id, ActionKind::Approve),
            format!("Allow Claude to {}", description),
        ),
        suggested(
            ActionKind::Reject,
            "❌",
            "Reject",
            respond_command(session_id, ActionKind::Reject),
            format!("Deny the {} request", description),
        ),
    ];

    match notification.action {
        ToolAction::CreateFile | ToolAction::EditFile => {
            let command = detail(notification, "target_file")
                .map(|file| format!("cat \"{}\"", file))
                .unwrap_or_else(|| "echo 'No file specified'".to_string());
            actions.push(suggested(
                ActionKind::Modify,
                "✏️",
                "Review File",
                command,
                "Review the file before approving".to_string(),
            ));
        }
        ToolAction::ExecuteCommand => {
            let command = detail(notification, "command")
                .and_then(|cmd| cmd.split_whitespace().next().map(|p| format!("man {}", p)))
                .unwrap_or_else(|| "echo 'No command specified'".to_string());
            actions.push(suggested(
                ActionKind::Info,
                "ℹ️",
                "Command Info",
                command,
                "Get more information about this command".to_string(),
            ));
        }
        _ => {}
    }

    actions.push(suggested(
        ActionKind::Info,
        "📖",
        "More Info",
        session_command("info", session_id),
        "Get more details about this request".to_string(),
    ));

    actions
}

fn suggested(
    kind: ActionKind,
    icon: &str,
    label: &str,
    command: String,
    description: String,
) -> SuggestedAction {
    SuggestedAction {
        kind,
        label: format!("{} {}", icon, label),
        command,
        description,
        icon: Some(icon.to_string()),
    }
}
