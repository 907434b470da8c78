//! Event extraction
//!
//! Turns a [`HookEvent`] plus its session transcript into [`ExtractedData`]:
//! a completion summary for `Stop` events, or a description of the pending
//! tool request for `Notification` events.

use crate::error::Result;
use crate::transcript::{messages_by_kind, TranscriptReader};
use crate::types::{
    EventKind, EventPayload, ExtractedData, HookEvent, MessageKind, NotificationData,
    SessionInfo, StopData, TaskStatus, ToolAction, ToolUse, TranscriptMessage,
};
use serde::Serialize;
use serde_json::{Map, Value};

/// Used as the final message when the assistant's last turn has no text.
pub const EMPTY_STOP_MESSAGE: &str = "Task completed (no text response)";

const SUMMARY_MAX_CHARS: usize = 100;
const SUMMARY_CUT_CHARS: usize = 97;
const SUMMARY_MIN_BREAK: usize = 50;
const CONTENT_PREVIEW_CHARS: usize = 200;
const EDIT_PREVIEW_CHARS: usize = 100;

const ERROR_KEYWORDS: &[&str] = &["error", "failed", "cannot", "unable"];
const COMPLETION_KEYWORDS: &[&str] = &[
    "completed",
    "done",
    "finished",
    "created",
    "updated",
    "successfully",
];

/// Recent-conversation summary for an event's session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventContext {
    pub recent_user_messages: usize,
    pub recent_assistant_messages: usize,
    pub total_recent_messages: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_info: Option<SessionInfo>,
}

#[derive(Debug, Default, Clone)]
pub struct Extractor {
    reader: TranscriptReader,
}

impl Extractor {
    pub fn new() -> Self {
        Self {
            reader: TranscriptReader::new(),
        }
    }

    /// Extract structured data from one hook event.
    ///
    /// The event is validated before its transcript is touched.
    pub fn extract(&self, event: &HookEvent) -> Result<ExtractedData> {
        event.validate()?;

        match event.kind()? {
            EventKind::Stop => self.extract_stop(event),
            EventKind::Notification => self.extract_notification(event),
        }
    }

    fn extract_stop(&self, event: &HookEvent) -> Result<ExtractedData> {
        let message = self.reader.last_assistant_message(&event.transcript_path)?;

        let mut final_message = message.text();
        if final_message.is_empty() {
            final_message = EMPTY_STOP_MESSAGE.to_string();
        }

        let task_status = determine_task_status(&final_message, &message);
        let summary = summarize(&final_message);

        tracing::debug!(
            session_id = %event.session_id,
            status = %task_status,
            "Extracted stop event"
        );

        Ok(ExtractedData {
            event_kind: EventKind::Stop,
            session_id: event.session_id.clone(),
            cwd: event.cwd.clone(),
            timestamp: event_timestamp(event),
            payload: EventPayload::Stop(StopData {
                final_message,
                summary,
                task_status,
            }),
        })
    }

    fn extract_notification(&self, event: &HookEvent) -> Result<ExtractedData> {
        let message = self.reader.last_tool_use_message(&event.transcript_path)?;
        let tool_use = message.tool_use()?;
        let data = notification_data(&tool_use, event);

        tracing::debug!(
            session_id = %event.session_id,
            tool = %data.tool_name,
            action = %data.action,
            "Extracted notification event"
        );

        Ok(ExtractedData {
            event_kind: EventKind::Notification,
            session_id: event.session_id.clone(),
            cwd: event.cwd.clone(),
            timestamp: event_timestamp(event),
            payload: EventPayload::Notification(data),
        })
    }

    /// Summarise the last `max_messages` transcript lines of the event's session.
    pub fn event_context(&self, event: &HookEvent, max_messages: usize) -> Result<EventContext> {
        let recent = self
            .reader
            .conversation_context(&event.transcript_path, max_messages)?;

        let session_info = match self.reader.session_info(&event.transcript_path) {
            Ok(info) => Some(info),
            Err(e) => {
                tracing::debug!(error = %e, "No session info for event context");
                None
            }
        };

        Ok(EventContext {
            recent_user_messages: messages_by_kind(&recent, MessageKind::User).len(),
            recent_assistant_messages: messages_by_kind(&recent, MessageKind::Assistant).len(),
            total_recent_messages: recent.len(),
            session_info,
        })
    }
}

fn event_timestamp(event: &HookEvent) -> String {
    event
        .timestamp()
        .map(str::to_string)
        .unwrap_or_else(|| chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
}

/// Classify the outcome of a task from its final message.
///
/// Error keywords win over completion keywords. Anything ambiguous counts as
/// completed.
pub fn determine_task_status(final_message: &str, message: &TranscriptMessage) -> TaskStatus {
    let lower = final_message.to_lowercase();

    if ERROR_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return TaskStatus::Error;
    }
    if COMPLETION_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return TaskStatus::Completed;
    }
    if message.output_tokens() > 0 {
        return TaskStatus::Completed;
    }
    TaskStatus::Completed
}

/// Shorten a message to at most 100 characters, preferring a sentence break.
pub fn summarize(text: &str) -> String {
    if text.chars().count() <= SUMMARY_MAX_CHARS {
        return text.to_string();
    }

    let truncated: String = text.chars().take(SUMMARY_CUT_CHARS).collect();

    let break_point = truncated
        .chars()
        .enumerate()
        .filter(|(_, c)| matches!(c, '.' | '!' | '?'))
        .map(|(idx, _)| idx)
        .last();

    match break_point {
        Some(idx) if idx > SUMMARY_MIN_BREAK => truncated.chars().take(idx + 1).collect(),
        _ => format!("{}...", truncated),
    }
}

/// First `max_chars` characters of `text`, with `...` appended when cut.
pub(crate) fn preview(text: &str, max_chars: usize) -> (String, bool) {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => (format!("{}...", &text[..idx]), true),
        None => (text.to_string(), false),
    }
}

/// Render a JSON value as plain text: strings as-is, everything else as JSON.
pub(crate) fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn notification_data(tool_use: &ToolUse, event: &HookEvent) -> NotificationData {
    let tool_name = if tool_use.name.is_empty() {
        "Unknown".to_string()
    } else {
        tool_use.name.clone()
    };
    let action = ToolAction::for_tool(&tool_name);

    // Raw input first so tool-specific keys override
    let mut details = tool_use.input.clone();
    let input = &tool_use.input;

    match action {
        ToolAction::CreateFile => {
            copy_field(input, "file_path", &mut details, "target_file");
            if let Some(content) = input.get("content") {
                let content = value_text(content);
                let (text, truncated) = preview(&content, CONTENT_PREVIEW_CHARS);
                details.insert("content_preview".to_string(), Value::String(text));
                if truncated {
                    details.insert(
                        "content_length".to_string(),
                        Value::from(content.chars().count()),
                    );
                }
            }
        }
        ToolAction::ReadFile => {
            copy_field(input, "file_path", &mut details, "target_file");
        }
        ToolAction::EditFile => {
            copy_field(input, "file_path", &mut details, "target_file");
            for (source, target) in [
                ("old_string", "old_string_preview"),
                ("new_string", "new_string_preview"),
            ] {
                if let Some(value) = input.get(source) {
                    let (text, _) = preview(&value_text(value), EDIT_PREVIEW_CHARS);
                    details.insert(target.to_string(), Value::String(text));
                }
            }
        }
        ToolAction::FetchUrl => {
            copy_field(input, "url", &mut details, "target_url");
            copy_field(input, "prompt", &mut details, "fetch_prompt");
        }
        ToolAction::ExecuteCommand => {
            copy_field(input, "command", &mut details, "command");
            copy_field(input, "description", &mut details, "command_description");
        }
        ToolAction::ListDirectory => {
            copy_field(input, "path", &mut details, "target_path");
        }
        ToolAction::UseTool => {
            details.insert("tool_id".to_string(), Value::String(tool_use.id.clone()));
        }
    }

    NotificationData {
        tool_name,
        action,
        details,
        request_text: event.message().map(str::to_string),
    }
}

fn copy_field(input: &Map<String, Value>, from: &str, details: &mut Map<String, Value>, to: &str) {
    if let Some(value) = input.get(from) {
        details.insert(to.to_string(), value.clone());
    }
}
