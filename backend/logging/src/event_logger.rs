//! Scan Event Logger
//!
//! One structured event per resource (resolved, unresolved, skipped), emitted
//! on the `scan_events` target so it can be filtered or routed on its own.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

pub const SCAN_EVENTS_TARGET: &str = "scan_events";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScanEvent {
    Resolved {
        address: String,
    },
    Unresolved {
        address: String,
        type_name: String,
        reason: String,
    },
    Skipped {
        address: String,
    },
}

#[derive(Debug, Serialize)]
pub struct EventLogEntry {
    /// The scanned path or records file.
    pub scan: String,
    pub timestamp: DateTime<Utc>,
    pub event: ScanEvent,
}

impl EventLogEntry {
    pub fn new(scan: &str, event: ScanEvent) -> Self {
        Self {
            scan: scan.to_string(),
            timestamp: Utc::now(),
            event,
        }
    }
}

pub struct EventLogger;

impl EventLogger {
    pub fn log_event(scan: &str, event: ScanEvent) {
        let entry = EventLogEntry::new(scan, event);
        match serde_json::to_string(&entry) {
            Ok(json) => info!(target: SCAN_EVENTS_TARGET, event = %json, "Scan event"),
            Err(_) => info!(target: SCAN_EVENTS_TARGET, event = ?entry, "Scan event"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn events_serialize_with_type_tag() {
        let entry = EventLogEntry::new(
            "infra/",
            ScanEvent::Unresolved {
                address: "aws_foo.bar".into(),
                type_name: "aws_foo".into(),
                reason: "resource aws_foo not implemented".into(),
            },
        );
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["scan"], json!("infra/"));
        assert_eq!(value["event"]["type"], json!("unresolved"));
        assert_eq!(value["event"]["type_name"], json!("aws_foo"));
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn logging_without_subscriber_is_a_no_op() {
        EventLogger::log_event("x", ScanEvent::Skipped { address: "random_id.a".into() });
    }
}
