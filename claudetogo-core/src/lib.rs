//! # claudetogo-core
//!
//! Core library for claudetogo - turns Claude Code hook events into
//! messenger-ready notifications.
//!
//! This library provides:
//! - Domain types for hook events, transcripts and messenger messages
//! - Transcript parsing and per-tool data extraction
//! - Message formatting with suggested follow-up actions
//! - Batch and incremental (watcher) processing of the event log
//! - Response recording and session status
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! ```text
//! Claude Code hook ─► event log ─► EventWatcher ─► EventProcessor
//!                                                     │
//!                     TranscriptReader ◄─ Extractor ◄─┤
//!                                         Formatter ◄─┘
//!                                             │
//!                         messenger-*.json ◄──┘ ◄── Responder
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use claudetogo_core::{Config, EventProcessor, OutputStore};
//!
//! let config = Config::load().expect("failed to load config");
//! let processor = EventProcessor::new(OutputStore::new(&config.output.dir));
//! let result = processor
//!     .process_latest(&config.events.file, 5)
//!     .expect("failed to process events");
//! println!("wrote {} files", result.output_files.len());
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use error::{Error, Result};
pub use extractor::Extractor;
pub use formatter::Formatter;
pub use monitor::EventTail;
pub use processor::{BatchResult, EventProcessor};
pub use responder::{ResponseOutcome, Responder};
pub use store::OutputStore;
pub use transcript::TranscriptReader;
pub use types::*;
pub use watcher::{EventWatcher, StatusMarker};

// Public modules
pub mod config;
pub mod error;
pub mod extractor;
pub mod formatter;
pub mod hook;
pub mod logging;
pub mod monitor;
pub mod processor;
pub mod responder;
pub mod store;
pub mod transcript;
pub mod types;
pub mod watcher;
