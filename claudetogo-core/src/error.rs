//! Error types for claudetogo-core

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the claudetogo-core library
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A hook event is missing a required field
    #[error("invalid hook event: {0}")]
    Validation(String),

    /// A transcript line could not be decoded
    #[error("failed to parse line {line} in transcript file {}: {message}", path.display())]
    TranscriptParse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// Transcript file is missing on disk
    #[error("transcript file does not exist: {}", .0.display())]
    TranscriptNotFound(PathBuf),

    /// Transcript has no messages at all
    #[error("no messages found in transcript file: {}", .0.display())]
    NoMessages(PathBuf),

    /// Transcript has no assistant turn
    #[error("no assistant messages found in transcript")]
    NoAssistantMessage,

    /// No tool invocation could be located
    #[error("no tool use found: {0}")]
    NoToolUse(String),

    /// Event log file is missing on disk
    #[error("events file does not exist: {}", .0.display())]
    EventsFileNotFound(PathBuf),

    /// Hook event kind is neither Stop nor Notification
    #[error("unknown hook event type: {0}")]
    UnknownEventKind(String),

    /// Extracted payload does not match the declared event kind
    #[error("invalid {0} event data")]
    PayloadMismatch(&'static str),

    /// No messenger file exists for the requested session
    #[error("no messenger file found for session ID: {0}")]
    SessionNotFound(String),

    /// Requested action is not offered by the session's message
    #[error("invalid action '{0}' for this message type")]
    InvalidAction(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Glob pattern error
    #[error("invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

/// Result type alias for claudetogo-core
pub type Result<T> = std::result::Result<T, Error>;
