//! Response handling
//!
//! Matches a user's reply back to the messenger file it answers, checks the
//! requested action against what that message offered, and records it under
//! `responses/`.
//!
//! Sessions are looked up by the 8-character prefix embedded in file names.
//! Candidate files are then opened and accepted if the stored session id and
//! the queried id are prefixes of one another, so both short and full ids
//! work. Two sessions sharing a prefix resolve to whichever file the glob
//! yields first.

use crate::error::{Error, Result};
use crate::store::{self, OutputStore};
use crate::types::{
    ActionKind, MessageType, MessengerMessage, PendingAction, ResponseRecord, SessionState,
    SessionStatus,
};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// What happened when a response was recorded.
#[derive(Debug, Clone)]
pub struct ResponseOutcome {
    pub record: ResponseRecord,
    pub message: MessengerMessage,
    pub messenger_file: PathBuf,
}

impl ResponseOutcome {
    /// Command line of the offered action matching the recorded one, if any.
    pub fn suggested_command(&self) -> Option<&str> {
        self.message
            .actions
            .iter()
            .find(|a| a.kind == self.record.action)
            .map(|a| a.command.as_str())
    }
}

pub struct Responder {
    store: OutputStore,
}

impl Responder {
    pub fn new(store: OutputStore) -> Self {
        Self { store }
    }

    /// Record `action` as the reply to the session's message.
    pub fn respond(&self, session_id: &str, action: &str) -> Result<ResponseOutcome> {
        tracing::info!(session_id, action, "Processing response");

        let messenger_file = self.find_messenger_file(session_id)?;
        let message: MessengerMessage = self.store.read_json(&messenger_file)?;

        if !is_valid_action(&message, action) {
            return Err(Error::InvalidAction(action.to_string()));
        }
        let action: ActionKind = action.parse()?;

        let record = ResponseRecord {
            session_id: session_id.to_string(),
            action,
            timestamp: chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            message_type: message.message_type,
            message_title: message.title.clone(),
        };
        self.store
            .write_json(&self.store.response_path(session_id), &record)?;

        match action {
            ActionKind::Approve => tracing::info!(session_id, "Action approved"),
            ActionKind::Reject => tracing::info!(session_id, "Action rejected"),
            ActionKind::Modify => tracing::info!(session_id, "Review requested"),
            ActionKind::Info => tracing::info!(session_id, "Info requested"),
        }

        Ok(ResponseOutcome {
            record,
            message,
            messenger_file,
        })
    }

    /// Locate the messenger file for a session (full id or prefix).
    pub fn find_messenger_file(&self, session_id: &str) -> Result<PathBuf> {
        if session_id.trim().is_empty() {
            return Err(Error::Validation("session_id is required".to_string()));
        }

        let prefix = glob::Pattern::escape(store::session_prefix(session_id));
        let patterns = [
            format!("messenger-notification-{}-*.json", prefix),
            format!("messenger-stop-{}-*.json", prefix),
            format!("messenger-*-{}-*.json", prefix),
        ];

        for pattern in &patterns {
            for candidate in self.store.glob(pattern)? {
                let message: MessengerMessage = match self.store.read_json(&candidate) {
                    Ok(message) => message,
                    Err(e) => {
                        tracing::debug!(path = %candidate.display(), error = %e, "Skipping unreadable messenger file");
                        continue;
                    }
                };

                if message.session_id.starts_with(session_id)
                    || session_id.starts_with(&message.session_id)
                {
                    return Ok(candidate);
                }
            }
        }

        Err(Error::SessionNotFound(session_id.to_string()))
    }

    /// Unanswered `action_needed` messages, oldest first.
    pub fn list_pending(&self) -> Result<Vec<PendingAction>> {
        let mut pending = Vec::new();

        for file in self.store.glob("messenger-notification-*.json")? {
            let message: MessengerMessage = match self.store.read_json(&file) {
                Ok(message) => message,
                Err(e) => {
                    tracing::debug!(path = %file.display(), error = %e, "Failed to load messenger file");
                    continue;
                }
            };

            if message.message_type != MessageType::ActionNeeded {
                continue;
            }
            if store::exists(&self.store.response_path(&message.session_id)) {
                continue;
            }
            let Ok(created_at) = modified_at(&file) else {
                continue;
            };

            pending.push(PendingAction {
                session_id: message.session_id,
                message_type: message.message_type,
                title: message.title,
                message: message.message,
                created_at,
                messenger_file: file,
            });
        }

        pending.sort_by_key(|p| p.created_at);
        Ok(pending)
    }

    /// Derived status of a session, including the last recorded action.
    pub fn session_status(&self, session_id: &str) -> Result<SessionStatus> {
        let messenger_file = self.find_messenger_file(session_id)?;
        let message: MessengerMessage = self.store.read_json(&messenger_file)?;
        let created_at = modified_at(&messenger_file)?;

        let response_path = self.store.response_path(session_id);
        let last_action = if store::exists(&response_path) {
            match self.store.read_json::<ResponseRecord>(&response_path) {
                Ok(record) => Some(record.action),
                Err(e) => {
                    tracing::debug!(path = %response_path.display(), error = %e, "Unreadable response record");
                    None
                }
            }
        } else {
            None
        };

        Ok(SessionStatus {
            session_id: session_id.to_string(),
            status: SessionState::for_message(message.message_type),
            created_at,
            last_action,
            context: message.context,
            messenger_file,
        })
    }
}

/// Whether `action` may be recorded against `message`.
///
/// A tool request only accepts actions it offered. Anything else accepts
/// `approve`, `reject` and `info`.
pub fn is_valid_action(message: &MessengerMessage, action: &str) -> bool {
    let Ok(kind) = action.parse::<ActionKind>() else {
        return false;
    };

    if message.message_type == MessageType::ActionNeeded && !message.actions.is_empty() {
        return message.offers(kind);
    }

    matches!(
        kind,
        ActionKind::Approve | ActionKind::Reject | ActionKind::Info
    )
}

fn modified_at(path: &Path) -> Result<DateTime<Utc>> {
    let modified = std::fs::metadata(path)?.modified()?;
    Ok(DateTime::<Utc>::from(modified))
}
