//! Filesystem access for generated output
//!
//! [`OutputStore`] owns the messenger output directory layout:
//!
//! ```text
//! <root>/
//! ├── messenger-<kind>-<session8>-<timestamp>.json
//! ├── responses/response-<session8>.json
//! ├── test-samples/sample-<kind>-event.json
//! └── .watcher-status
//! ```
//!
//! Components receive a store instead of reaching for a global default
//! directory, so tests can point each one at a temporary root.

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

const RESPONSES_DIR: &str = "responses";
const SAMPLES_DIR: &str = "test-samples";
const STATUS_MARKER: &str = ".watcher-status";

/// Number of session-id characters embedded in file names.
pub const SESSION_PREFIX_LEN: usize = 8;

/// Whether anything exists at `path`.
pub fn exists(path: &Path) -> bool {
    path.exists()
}

/// First [`SESSION_PREFIX_LEN`] characters of a session id (or all of it).
pub fn session_prefix(session_id: &str) -> &str {
    match session_id.char_indices().nth(SESSION_PREFIX_LEN) {
        Some((idx, _)) => &session_id[..idx],
        None => session_id,
    }
}

/// Root-relative access to the messenger output directory.
#[derive(Debug, Clone)]
pub struct OutputStore {
    root: PathBuf,
}

impl OutputStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn responses_dir(&self) -> PathBuf {
        self.root.join(RESPONSES_DIR)
    }

    pub fn samples_dir(&self) -> PathBuf {
        self.root.join(SAMPLES_DIR)
    }

    pub fn status_marker_path(&self) -> PathBuf {
        self.root.join(STATUS_MARKER)
    }

    /// Path of the response record for a session.
    pub fn response_path(&self, session_id: &str) -> PathBuf {
        self.responses_dir()
            .join(format!("response-{}.json", session_prefix(session_id)))
    }

    /// Create the root directory (and parents) if missing.
    pub fn ensure_root(&self) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    /// Write `value` as pretty-printed JSON, creating parent directories.
    ///
    /// Existing files are truncated; there is no locking.
    pub fn write_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(value)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Files under the root matching a file-name glob, in glob (lexical) order.
    ///
    /// Unreadable entries are skipped.
    pub fn glob(&self, file_pattern: &str) -> Result<Vec<PathBuf>> {
        let root = glob::Pattern::escape(&self.root.to_string_lossy());
        let pattern = format!("{}/{}", root, file_pattern);
        Ok(glob::glob(&pattern)?.flatten().collect())
    }
}
