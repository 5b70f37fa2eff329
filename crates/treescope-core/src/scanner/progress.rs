/// Scan progress and the events sent from the scan thread to the host shell
/// via a crossbeam channel.
use crate::model::{DirectoryRollup, FileSystemEntry, ScanError};
use serde::Serialize;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Cumulative traversal progress.
#[derive(Debug, Clone)]
pub struct ScanProgress {
    /// Entries emitted so far.
    pub items_scanned: u64,
    /// Sum of content bytes over emitted entries.
    pub total_size: u64,
    /// Path most recently popped from the traversal stack.
    pub current_path: PathBuf,
    /// Every per-item error recorded so far, in discovery order.
    pub errors: Vec<ScanError>,
    started: Instant,
}

impl ScanProgress {
    pub fn new() -> Self {
        Self {
            items_scanned: 0,
            total_size: 0,
            current_path: PathBuf::new(),
            errors: Vec::new(),
            started: Instant::now(),
        }
    }

    pub fn error_count(&self) -> u64 {
        self.errors.len() as u64
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Average throughput since the traversal started.
    pub fn items_per_second(&self) -> f64 {
        let secs = self.elapsed().as_secs_f64();
        if secs > 0.0 {
            self.items_scanned as f64 / secs
        } else {
            0.0
        }
    }

    pub(crate) fn record_error(&mut self, error: ScanError) {
        self.errors.push(error);
    }
}

impl Default for ScanProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// Events streamed from the core to the host shell.
///
/// Serialises as `{"event": "<name>", "data": {...}}` with camelCase fields,
/// which is the payload shape the host's display layer consumes. Batch data
/// is always an owned copy.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
#[serde(rename_all_fields = "camelCase")]
pub enum ScanEvent {
    /// The session row exists and traversal is about to begin.
    ScanStarted {
        session_id: i64,
        #[serde(with = "crate::model::lossy_path")]
        path: PathBuf,
    },
    /// Running totals, one per flushed batch, plus the per-item errors
    /// recorded since the previous progress event.
    ScanProgress {
        items_scanned: u64,
        total_size: u64,
        error_count: u64,
        errors: Vec<ScanError>,
    },
    /// The entries of one batch plus the rollups that batch changed.
    TreeDataDelta {
        entries: Vec<FileSystemEntry>,
        rollups: Vec<DirectoryRollup>,
    },
    /// Traversal ran to exhaustion.
    ScanCompleted {
        session_id: i64,
        total_items: u64,
        total_size: u64,
    },
    /// Traversal observed the cancel signal.
    ScanCancelled { session_id: i64 },
    /// The scan could not do its job (unreadable root, store failure).
    ScanError { message: String },
}

impl ScanEvent {
    /// The wire name of this event.
    pub fn name(&self) -> &'static str {
        match self {
            ScanEvent::ScanStarted { .. } => "scanStarted",
            ScanEvent::ScanProgress { .. } => "scanProgress",
            ScanEvent::TreeDataDelta { .. } => "treeDataDelta",
            ScanEvent::ScanCompleted { .. } => "scanCompleted",
            ScanEvent::ScanCancelled { .. } => "scanCancelled",
            ScanEvent::ScanError { .. } => "scanError",
        }
    }

    /// Render the host payload.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialise_with_tag_and_camel_case_fields() {
        let event = ScanEvent::ScanProgress {
            items_scanned: 3,
            total_size: 150,
            error_count: 1,
            errors: vec![ScanError {
                path: PathBuf::from("/r/locked"),
                code: 13,
                message: "Cannot read directory: permission denied".to_string(),
                timestamp: chrono::Utc::now(),
            }],
        };
        let value: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(value["event"], "scanProgress");
        assert_eq!(value["data"]["itemsScanned"], 3);
        assert_eq!(value["data"]["errorCount"], 1);
        assert_eq!(value["data"]["errors"][0]["path"], "/r/locked");
        assert_eq!(value["data"]["errors"][0]["code"], 13);
        assert_eq!(event.name(), "scanProgress");
    }

    #[test]
    fn started_event_carries_session_id() {
        let event = ScanEvent::ScanStarted {
            session_id: 7,
            path: PathBuf::from("/r"),
        };
        let value: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(value["data"]["sessionId"], 7);
        assert_eq!(value["data"]["path"], "/r");
    }

    #[test]
    fn throughput_is_zero_before_any_item() {
        let progress = ScanProgress::new();
        assert_eq!(progress.items_scanned, 0);
        assert!(progress.items_per_second() >= 0.0);
    }
}
