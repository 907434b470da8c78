//! Claude Code transcript reader
//!
//! Reads session transcripts (`~/.claude/projects/<encoded-cwd>/<session>.jsonl`)
//! and answers the questions the extractor needs: what the assistant said
//! last, which tool it last tried to use, and what the surrounding
//! conversation looks like.
//!
//! # Error Handling
//!
//! Unlike the event log, a transcript is all-or-nothing: a single malformed
//! line rejects the whole file with [`Error::TranscriptParse`] naming the
//! 1-based line number. Chain and context queries assume a complete, ordered
//! sequence, so a partially read transcript would give wrong answers rather
//! than degraded ones. Blank lines are skipped.
//!
//! Every query re-reads the file. Transcripts are append-only and owned by
//! Claude Code, so a cached copy would go stale between events.

use crate::error::{Error, Result};
use crate::store;
use crate::types::{MessageKind, SessionInfo, TranscriptMessage};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Stateless reader over transcript files.
#[derive(Debug, Default, Clone, Copy)]
pub struct TranscriptReader;

impl TranscriptReader {
    pub fn new() -> Self {
        Self
    }

    /// Parse every line of a transcript, in file order.
    pub fn parse_file(&self, path: &Path) -> Result<Vec<TranscriptMessage>> {
        if !store::exists(path) {
            return Err(Error::TranscriptNotFound(path.to_path_buf()));
        }

        let reader = BufReader::new(File::open(path)?);
        let mut messages = Vec::new();

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let message = serde_json::from_str::<TranscriptMessage>(line).map_err(|e| {
                Error::TranscriptParse {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    message: e.to_string(),
                }
            })?;
            messages.push(message);
        }

        tracing::trace!(path = %path.display(), count = messages.len(), "Parsed transcript");
        Ok(messages)
    }

    /// The final line of the transcript.
    pub fn latest_message(&self, path: &Path) -> Result<TranscriptMessage> {
        self.parse_file(path)?
            .pop()
            .ok_or_else(|| Error::NoMessages(path.to_path_buf()))
    }

    /// Most recent assistant turn.
    pub fn last_assistant_message(&self, path: &Path) -> Result<TranscriptMessage> {
        let messages = self.parse_file(path)?;
        find_last(&messages, TranscriptMessage::is_assistant)
            .cloned()
            .ok_or(Error::NoAssistantMessage)
    }

    /// Most recent assistant turn that invokes any tool.
    pub fn last_tool_use_message(&self, path: &Path) -> Result<TranscriptMessage> {
        let messages = self.parse_file(path)?;
        find_last(&messages, |m| m.is_assistant() && m.has_tool_use())
            .cloned()
            .ok_or_else(|| Error::NoToolUse("no tool use messages found in transcript".to_string()))
    }

    /// Most recent assistant turn that invokes the named tool.
    pub fn find_tool_use_by_name(&self, path: &Path, tool_name: &str) -> Result<TranscriptMessage> {
        let messages = self.parse_file(path)?;
        find_last(&messages, |m| m.is_assistant() && m.has_tool_use_named(tool_name))
            .cloned()
            .ok_or_else(|| Error::NoToolUse(format!("no tool use found for tool: {}", tool_name)))
    }

    /// The last `max_messages` lines, or all of them if there are fewer.
    pub fn conversation_context(
        &self,
        path: &Path,
        max_messages: usize,
    ) -> Result<Vec<TranscriptMessage>> {
        let mut messages = self.parse_file(path)?;
        let start = messages.len().saturating_sub(max_messages);
        Ok(messages.split_off(start))
    }

    /// Follow `parentUuid` links back from `start_uuid`, returned root first.
    ///
    /// A missing or unknown parent ends the chain; an unknown `start_uuid`
    /// yields an empty chain.
    pub fn message_chain(&self, path: &Path, start_uuid: &str) -> Result<Vec<TranscriptMessage>> {
        let messages = self.parse_file(path)?;
        Ok(build_chain(&messages, start_uuid))
    }

    /// Session metadata from the first line.
    pub fn session_info(&self, path: &Path) -> Result<SessionInfo> {
        let messages = self.parse_file(path)?;
        let first = messages
            .first()
            .ok_or_else(|| Error::NoMessages(path.to_path_buf()))?;

        Ok(SessionInfo {
            session_id: first.session_id.clone().unwrap_or_default(),
            cwd: first.cwd.clone().unwrap_or_default(),
            version: first.version.clone().unwrap_or_default(),
            git_branch: first.git_branch.clone().unwrap_or_default(),
        })
    }
}

/// Messages of one kind, in order.
pub fn messages_by_kind(messages: &[TranscriptMessage], kind: MessageKind) -> Vec<&TranscriptMessage> {
    messages.iter().filter(|m| m.kind == kind).collect()
}

/// Scan backwards for the most recent message matching `predicate`.
fn find_last<F>(messages: &[TranscriptMessage], predicate: F) -> Option<&TranscriptMessage>
where
    F: Fn(&TranscriptMessage) -> bool,
{
    messages.iter().rev().find(|m| predicate(m))
}

fn build_chain(messages: &[TranscriptMessage], start_uuid: &str) -> Vec<TranscriptMessage> {
    let by_uuid: HashMap<&str, &TranscriptMessage> = messages
        .iter()
        .filter_map(|m| m.uuid.as_deref().map(|uuid| (uuid, m)))
        .collect();

    let mut chain = Vec::new();
    let mut current = Some(start_uuid);

    while let Some(uuid) = current.filter(|u| !u.is_empty()) {
        let Some(message) = by_uuid.get(uuid) else {
            break;
        };
        // A parent cycle would otherwise never terminate
        if chain.len() > messages.len() {
            tracing::warn!(uuid, "Cycle detected in transcript parent chain");
            break;
        }
        chain.push((*message).clone());
        current = message.parent_uuid.as_deref();
    }

    chain.reverse();
    chain
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_transcript(lines: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file
    }

    const USER: &str = r#"{"uuid":"u1","parentUuid":null,"type":"user","sessionId":"sess-1","cwd":"/work/app","version":"1.0.80","gitBranch":"main","message":{"role":"user","content":"Create a README"}}"#;
    const ASSISTANT_TOOL: &str = r#"{"uuid":"a1","parentUuid":"u1","type":"assistant","sessionId":"sess-1","message":{"role":"assistant","content":[{"type":"text","text":"Writing it now."},{"type":"tool_use","id":"toolu_1","name":"Write","input":{"file_path":"/work/app/README.md","content":"hi"}}]}}"#;
    const TOOL_RESULT: &str = r#"{"uuid":"u2","parentUuid":"a1","type":"user","sessionId":"sess-1","message":{"role":"user","content":[{"type":"tool_result","tool_use_id":"toolu_1","content":"ok"}]}}"#;
    const ASSISTANT_TEXT: &str = r#"{"uuid":"a2","parentUuid":"u2","type":"assistant","sessionId":"sess-1","message":{"role":"assistant","content":[{"type":"text","text":"Done."}],"usage":{"output_tokens":12}}}"#;

    #[test]
    fn test_parse_file_in_order() {
        let file = write_transcript(&[USER, ASSISTANT_TOOL, "", TOOL_RESULT, ASSISTANT_TEXT]);
        let messages = TranscriptReader::new().parse_file(file.path()).unwrap();

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].kind, MessageKind::User);
        assert_eq!(messages[0].text(), "Create a README");
        assert_eq!(messages[3].output_tokens(), 12);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let result = TranscriptReader::new().parse_file(Path::new("/nonexistent/t.jsonl"));
        assert!(matches!(result, Err(Error::TranscriptNotFound(_))));
    }

    #[test]
    fn test_malformed_line_rejects_whole_file() {
        let file = write_transcript(&[USER, "{not json", ASSISTANT_TEXT]);
        let err = TranscriptReader::new().parse_file(file.path()).unwrap_err();

        match &err {
            Error::TranscriptParse { line, path, .. } => {
                assert_eq!(*line, 2);
                assert_eq!(path, file.path());
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_backward_scans() {
        let file = write_transcript(&[USER, ASSISTANT_TOOL, TOOL_RESULT, ASSISTANT_TEXT]);
        let reader = TranscriptReader::new();

        let latest = reader.latest_message(file.path()).unwrap();
        assert_eq!(latest.uuid.as_deref(), Some("a2"));

        let assistant = reader.last_assistant_message(file.path()).unwrap();
        assert_eq!(assistant.text(), "Done.");

        let tool_msg = reader.last_tool_use_message(file.path()).unwrap();
        assert_eq!(tool_msg.uuid.as_deref(), Some("a1"));
        assert_eq!(tool_msg.tool_use().unwrap().name, "Write");

        let by_name = reader.find_tool_use_by_name(file.path(), "Write").unwrap();
        assert_eq!(by_name.uuid.as_deref(), Some("a1"));
        assert!(matches!(
            reader.find_tool_use_by_name(file.path(), "Bash"),
            Err(Error::NoToolUse(_))
        ));
    }

    #[test]
    fn test_empty_transcript() {
        let file = write_transcript(&[]);
        let reader = TranscriptReader::new();

        assert!(matches!(
            reader.latest_message(file.path()),
            Err(Error::NoMessages(_))
        ));
        assert!(matches!(
            reader.session_info(file.path()),
            Err(Error::NoMessages(_))
        ));
        assert!(matches!(
            reader.last_assistant_message(file.path()),
            Err(Error::NoAssistantMessage)
        ));
    }

    #[test]
    fn test_tool_result_is_not_a_tool_use() {
        let file = write_transcript(&[USER, TOOL_RESULT]);
        let result = TranscriptReader::new().last_tool_use_message(file.path());
        assert!(matches!(result, Err(Error::NoToolUse(_))));
    }

    #[test]
    fn test_message_chain_root_first() {
        let file = write_transcript(&[USER, ASSISTANT_TOOL, TOOL_RESULT, ASSISTANT_TEXT]);
        let chain = TranscriptReader::new()
            .message_chain(file.path(), "u2")
            .unwrap();

        let ids: Vec<_> = chain.iter().filter_map(|m| m.uuid.as_deref()).collect();
        assert_eq!(ids, vec!["u1", "a1", "u2"]);
    }

    #[test]
    fn test_message_chain_stops_at_dangling_parent() {
        let orphan = r#"{"uuid":"x2","parentUuid":"gone","type":"assistant","message":{"content":"hi"}}"#;
        let file = write_transcript(&[USER, orphan]);
        let reader = TranscriptReader::new();

        let chain = reader.message_chain(file.path(), "x2").unwrap();
        assert_eq!(chain.len(), 1);

        let none = reader.message_chain(file.path(), "unknown").unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_conversation_context_window() {
        let file = write_transcript(&[USER, ASSISTANT_TOOL, TOOL_RESULT, ASSISTANT_TEXT]);
        let reader = TranscriptReader::new();

        let last_two = reader.conversation_context(file.path(), 2).unwrap();
        let ids: Vec<_> = last_two.iter().filter_map(|m| m.uuid.as_deref()).collect();
        assert_eq!(ids, vec!["u2", "a2"]);

        let all = reader.conversation_context(file.path(), 50).unwrap();
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn test_session_info_from_first_line() {
        let file = write_transcript(&[USER, ASSISTANT_TEXT]);
        let info = TranscriptReader::new().session_info(file.path()).unwrap();

        assert_eq!(info.session_id, "sess-1");
        assert_eq!(info.cwd, "/work/app");
        assert_eq!(info.version, "1.0.80");
        assert_eq!(info.git_branch, "main");
    }

    #[test]
    fn test_messages_by_kind() {
        let file = write_transcript(&[USER, ASSISTANT_TOOL, TOOL_RESULT, ASSISTANT_TEXT]);
        let messages = TranscriptReader::new().parse_file(file.path()).unwrap();

        assert_eq!(messages_by_kind(&messages, MessageKind::User).len(), 2);
        assert_eq!(messages_by_kind(&messages, MessageKind::Assistant).len(), 2);
        assert!(messages_by_kind(&messages, MessageKind::Other).is_empty());
    }
}
