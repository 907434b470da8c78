//! Core domain types for claudetogo
//!
//! Data flows through four shapes:
//!
//! | Type | Produced by | Consumed by |
//! |------|-------------|-------------|
//! | [`HookEvent`] | Claude Code hook (one line of the event log) | [`crate::extractor`] |
//! | [`TranscriptMessage`] | Claude Code (one line of a session transcript) | [`crate::transcript`] |
//! | [`ExtractedData`] | [`crate::extractor`] | [`crate::formatter`] |
//! | [`MessengerMessage`] | [`crate::formatter`] | disk, [`crate::responder`] |
//!
//! Everything else here ([`SessionStatus`], [`PendingAction`], [`ProcessingStats`],
//! [`WatcherStats`]) is a read model computed on demand. The only other record
//! written to disk is the [`ResponseRecord`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

use crate::error::{Error, Result};

// ============================================
// Hook events
// ============================================

/// One line of the event log, as emitted by the Claude Code hook.
///
/// Optional fields are also treated as absent when they hold an empty string,
/// since the hook writes `"timestamp": ""` rather than omitting the key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HookEvent {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub transcript_path: PathBuf,
    #[serde(default)]
    pub cwd: String,
    #[serde(default)]
    pub hook_event_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl HookEvent {
    /// Reject events missing a session id or event name.
    pub fn validate(&self) -> Result<()> {
        if self.session_id.trim().is_empty() {
            return Err(Error::Validation("session_id is required".to_string()));
        }
        if self.hook_event_name.trim().is_empty() {
            return Err(Error::Validation("hook_event_name is required".to_string()));
        }
        Ok(())
    }

    /// Parsed event kind (case-insensitive).
    pub fn kind(&self) -> Result<EventKind> {
        self.hook_event_name.parse()
    }

    /// Event timestamp, if present and non-empty.
    pub fn timestamp(&self) -> Option<&str> {
        self.timestamp.as_deref().filter(|t| !t.trim().is_empty())
    }

    /// Tool name, if present and non-empty.
    pub fn tool_name(&self) -> Option<&str> {
        self.tool_name.as_deref().filter(|t| !t.trim().is_empty())
    }

    /// Free-text request message, if present and non-empty.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref().filter(|t| !t.trim().is_empty())
    }
}

/// The two hook event kinds this system understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Stop,
    Notification,
}

impl EventKind {
    /// Lower-case identifier used in file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Stop => "stop",
            EventKind::Notification => "notification",
        }
    }

    pub const ALL: [EventKind; 2] = [EventKind::Notification, EventKind::Stop];
}

impl std::str::FromStr for EventKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stop" => Ok(EventKind::Stop),
            "notification" => Ok(EventKind::Notification),
            _ => Err(Error::UnknownEventKind(s.to_string())),
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Response printed back to Claude Code after a hook invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookDecision {
    #[serde(rename = "continue")]
    pub continue_: bool,
    pub decision: String,
}

// ============================================
// Transcripts
// ============================================

/// One line of a Claude Code session transcript.
///
/// Session metadata is repeated on every line; the first line is the
/// authoritative copy (see [`crate::transcript::TranscriptReader::session_info`]).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TranscriptMessage {
    pub uuid: Option<String>,
    pub parent_uuid: Option<String>,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub session_id: Option<String>,
    pub cwd: Option<String>,
    pub version: Option<String>,
    pub git_branch: Option<String>,
    pub timestamp: Option<String>,
    pub message: Option<MessageBody>,
}

impl TranscriptMessage {
    pub fn is_assistant(&self) -> bool {
        self.kind == MessageKind::Assistant
    }

    /// Message content, if the line carries a message body with content.
    pub fn content(&self) -> Option<&Content> {
        self.message.as_ref().and_then(|m| m.content.as_ref())
    }

    /// Text of the message; see [`Content::text`].
    pub fn text(&self) -> String {
        self.content().map(Content::text).unwrap_or_default()
    }

    /// First tool invocation in the message.
    pub fn tool_use(&self) -> Result<ToolUse> {
        match self.content() {
            Some(Content::PlainText(_)) => Err(Error::NoToolUse(
                "user messages don't contain tool_use content".to_string(),
            )),
            Some(content) => content
                .tool_use()
                .ok_or_else(|| Error::NoToolUse("no tool_use content found in message".to_string())),
            None => Err(Error::NoToolUse("message has no content".to_string())),
        }
    }

    pub fn has_tool_use(&self) -> bool {
        self.content().is_some_and(|c| c.tool_use().is_some())
    }

    /// Whether any tool invocation in the message has exactly this name.
    pub fn has_tool_use_named(&self, name: &str) -> bool {
        match self.content() {
            Some(Content::StructuredItems(items)) => items
                .iter()
                .any(|item| matches!(item, ContentItem::ToolUse { name: n, .. } if n == name)),
            _ => false,
        }
    }

    /// Output tokens reported for this turn, zero when absent.
    pub fn output_tokens(&self) -> u64 {
        self.message
            .as_ref()
            .and_then(|m| m.usage.as_ref())
            .and_then(|u| u.output_tokens)
            .unwrap_or(0)
    }
}

/// Author of a transcript line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    User,
    Assistant,
    /// Summaries, snapshots and anything else Claude Code writes
    #[default]
    #[serde(other)]
    Other,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::User => "user",
            MessageKind::Assistant => "assistant",
            MessageKind::Other => "other",
        }
    }
}

/// Nested `message` object of a transcript line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageBody {
    pub role: Option<String>,
    pub model: Option<String>,
    pub content: Option<Content>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Usage {
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}

/// Message content: a plain string for user turns, a list of typed items for
/// assistant turns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    PlainText(String),
    StructuredItems(#[serde(deserialize_with = "lenient_items")] Vec<ContentItem>),
}

/// Items that don't decode (no `type` tag, wrong field types) become
/// [`ContentItem::Unknown`] instead of failing the whole line.
fn lenient_items<'de, D>(deserializer: D) -> std::result::Result<Vec<ContentItem>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Vec::<Value>::deserialize(deserializer)?;
    Ok(values
        .into_iter()
        .map(|value| ContentItem::deserialize(value).unwrap_or(ContentItem::Unknown))
        .collect())
}

/// `null` reads as the field's default.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Content {
    /// Plain text verbatim, or every `text` item joined with a single space.
    pub fn text(&self) -> String {
        match self {
            Content::PlainText(text) => text.clone(),
            Content::StructuredItems(items) => items
                .iter()
                .filter_map(|item| match item {
                    ContentItem::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join(" "),
        }
    }

    /// First `tool_use` item, if any.
    pub fn tool_use(&self) -> Option<ToolUse> {
        match self {
            Content::PlainText(_) => None,
            Content::StructuredItems(items) => items.iter().find_map(|item| match item {
                ContentItem::ToolUse { id, name, input } => Some(ToolUse {
                    id: id.clone(),
                    name: name.clone(),
                    input: input.as_object().cloned().unwrap_or_default(),
                }),
                _ => None,
            }),
        }
    }
}

/// One typed item of structured content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentItem {
    Text {
        #[serde(default, deserialize_with = "null_as_default")]
        text: String,
    },
    ToolUse {
        #[serde(default, deserialize_with = "null_as_default")]
        id: String,
        #[serde(default, deserialize_with = "null_as_default")]
        name: String,
        #[serde(default)]
        input: Value,
    },
    ToolResult {
        #[serde(default, deserialize_with = "null_as_default")]
        tool_use_id: String,
        #[serde(default)]
        content: Value,
        #[serde(default, deserialize_with = "null_as_default")]
        is_error: bool,
    },
    // thinking, image, and future item types
    #[serde(other)]
    Unknown,
}

/// A tool invocation pulled out of assistant content.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolUse {
    pub id: String,
    pub name: String,
    pub input: Map<String, Value>,
}

/// Session metadata taken from the first transcript line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub cwd: String,
    pub version: String,
    pub git_branch: String,
}

// ============================================
// Extraction
// ============================================

/// Output of the extractor: event metadata plus a kind-specific payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedData {
    pub event_kind: EventKind,
    pub session_id: String,
    pub cwd: String,
    pub timestamp: String,
    pub payload: EventPayload,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    Stop(StopData),
    Notification(NotificationData),
}

/// What the assistant said when it stopped.
#[derive(Debug, Clone, PartialEq)]
pub struct StopData {
    pub final_message: String,
    pub summary: String,
    pub task_status: TaskStatus,
}

/// Outcome inferred from the final assistant message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Completed,
    Error,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Completed => "completed",
            TaskStatus::Error => "error",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The tool request the assistant is waiting on.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationData {
    pub tool_name: String,
    pub action: ToolAction,
    /// Raw tool input merged with tool-specific preview fields
    pub details: Map<String, Value>,
    pub request_text: Option<String>,
}

/// Normalized verb for a tool request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolAction {
    CreateFile,
    ReadFile,
    EditFile,
    FetchUrl,
    ExecuteCommand,
    ListDirectory,
    UseTool,
}

impl ToolAction {
    /// Map a Claude Code tool name (case-insensitive) to its action.
    pub fn for_tool(tool_name: &str) -> Self {
        match tool_name.to_ascii_lowercase().as_str() {
            "write" => ToolAction::CreateFile,
            "read" => ToolAction::ReadFile,
            "edit" => ToolAction::EditFile,
            "webfetch" | "fetch" => ToolAction::FetchUrl,
            "bash" => ToolAction::ExecuteCommand,
            "list" | "ls" => ToolAction::ListDirectory,
            _ => ToolAction::UseTool,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolAction::CreateFile => "create_file",
            ToolAction::ReadFile => "read_file",
            ToolAction::EditFile => "edit_file",
            ToolAction::FetchUrl => "fetch_url",
            ToolAction::ExecuteCommand => "execute_command",
            ToolAction::ListDirectory => "list_directory",
            ToolAction::UseTool => "use_tool",
        }
    }
}

impl std::fmt::Display for ToolAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================
// Messenger messages
// ============================================

/// The rendered notification persisted as `messenger-*.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessengerMessage {
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub session_id: String,
    pub title: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<SuggestedAction>,
    #[serde(default)]
    pub context: Map<String, Value>,
    pub timestamp: String,
    pub priority: Priority,
}

impl MessengerMessage {
    /// Whether the message offers an action of this kind.
    pub fn offers(&self, kind: ActionKind) -> bool {
        self.actions.iter().any(|a| a.kind == kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Completion,
    ActionNeeded,
    /// Written by something other than this formatter
    #[serde(other)]
    Other,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Completion => "completion",
            MessageType::ActionNeeded => "action_needed",
            MessageType::Other => "other",
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// A button-like follow-up offered alongside a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedAction {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    pub label: String,
    pub command: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Approve,
    Reject,
    Modify,
    Info,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Approve => "approve",
            ActionKind::Reject => "reject",
            ActionKind::Modify => "modify",
            ActionKind::Info => "info",
        }
    }
}

impl std::str::FromStr for ActionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "approve" => Ok(ActionKind::Approve),
            "reject" => Ok(ActionKind::Reject),
            "modify" => Ok(ActionKind::Modify),
            "info" => Ok(ActionKind::Info),
            _ => Err(Error::InvalidAction(s.to_string())),
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================
// Responses and read models
// ============================================

/// A user's reply, stored under `responses/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub session_id: String,
    pub action: ActionKind,
    pub timestamp: String,
    pub message_type: MessageType,
    pub message_title: String,
}

/// Derived state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    PendingResponse,
    Completed,
    Active,
}

impl SessionState {
    pub fn for_message(message_type: MessageType) -> Self {
        match message_type {
            MessageType::ActionNeeded => SessionState::PendingResponse,
            MessageType::Completion => SessionState::Completed,
            MessageType::Other => SessionState::Active,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::PendingResponse => "pending_response",
            SessionState::Completed => "completed",
            SessionState::Active => "active",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatus {
    pub session_id: String,
    pub status: SessionState,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_action: Option<ActionKind>,
    #[serde(default)]
    pub context: Map<String, Value>,
    pub messenger_file: PathBuf,
}

/// An `action_needed` message nobody has answered yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingAction {
    pub session_id: String,
    pub message_type: MessageType,
    pub title: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub messenger_file: PathBuf,
}

/// Counts over the whole event log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingStats {
    pub total_events: usize,
    pub stop_events: usize,
    pub notification_events: usize,
    pub processable_events: usize,
    pub missing_transcripts: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherStats {
    pub events_file: PathBuf,
    pub output_dir: PathBuf,
    pub poll_interval_ms: u64,
    pub last_processed: DateTime<Utc>,
    pub total_events: usize,
    pub processable_events: usize,
    pub is_running: bool,
}
