//! Structured logging for policyforge.
//!
//! Console output on stderr (stdout carries policy documents), optional JSON
//! formatting, an optional daily rolling NDJSON file, and per-resource scan
//! events.

pub mod event_logger;
pub mod logger;

pub use event_logger::{EventLogEntry, EventLogger, ScanEvent, SCAN_EVENTS_TARGET};
pub use logger::{init_logger, LogSettings, LOG_FILE_PREFIX};
