/// Scanner module: drives one scan session end to end.
///
/// A scan runs on its own named thread. The thread owns a [`Walker`], an
/// [`Aggregator`] and a [`Store`] connection, and for every flushed batch it
///
/// 1. folds the entries into the aggregator,
/// 2. persists the entries and the touched rollups,
/// 3. pushes progress and a tree delta to the host over a bounded channel.
///
/// The host never shares mutable state with the scan thread; everything it
/// learns arrives as an owned [`ScanEvent`]. Dropping the receiver does not
/// stop the scan, cancelling does.
pub mod cancel;
pub mod progress;
pub mod walker;

pub use cancel::CancellationToken;
pub use progress::{ScanEvent, ScanProgress};
pub use walker::{Batch, WalkOutcome, Walker};

use crate::aggregate::Aggregator;
use crate::config::{ScanConfig, StoreConfig};
use crate::error::{ScanStartError, StoreResult};
use crate::model::{format_rate, format_size, SessionStatus, SessionTotals};
use crate::store::Store;
use crate::treemap::{self, LayoutItem, PlacedRectangle, Rect};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::thread;
use tracing::{debug, error, info, warn};

/// What a finished scan thread reports when joined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSummary {
    pub session_id: i64,
    pub status: SessionStatus,
    pub totals: SessionTotals,
    /// Batches whose entry or rollup write failed and was dropped.
    pub failed_writes: u64,
}

/// Handle to a running or completed scan.
pub struct ScanHandle {
    /// Id of the session row created before the thread started.
    pub session_id: i64,
    /// Events from the scan thread. Disconnects once the scan has finished.
    pub events: Receiver<ScanEvent>,
    cancel: CancellationToken,
    thread: Option<thread::JoinHandle<ScanSummary>>,
}

impl ScanHandle {
    /// Request the scan to stop at its next stack pop.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Block until the scan thread exits. `None` if it panicked.
    pub fn join(mut self) -> Option<ScanSummary> {
        let thread = self.thread.take()?;
        match thread.join() {
            Ok(summary) => Some(summary),
            Err(_) => {
                error!("Scan thread for session {} panicked", self.session_id);
                None
            }
        }
    }
}

/// Start a scan of `root` on a background thread.
///
/// The session row is created synchronously so the returned handle already
/// carries its id. Only a store failure or a refused thread spawn fails
/// here; filesystem problems surface later as events.
pub fn start_scan(
    root: PathBuf,
    store: Store,
    config: ScanConfig,
    cancel: CancellationToken,
) -> Result<ScanHandle, ScanStartError> {
    let volume = volume_id(&root);
    let session_id = store.create_session(&root, volume.as_deref())?;

    let (events_tx, events_rx) = crossbeam_channel::bounded::<ScanEvent>(config.event_capacity);
    let pipeline = Pipeline {
        root,
        session_id,
        store,
        config,
        cancel: cancel.clone(),
        events: events_tx,
    };

    let thread = thread::Builder::new()
        .name("treescope-scanner".into())
        .spawn(move || pipeline.run())
        .map_err(ScanStartError::Spawn)?;

    Ok(ScanHandle {
        session_id,
        events: events_rx,
        cancel,
        thread: Some(thread),
    })
}

struct Pipeline {
    root: PathBuf,
    session_id: i64,
    store: Store,
    config: ScanConfig,
    cancel: CancellationToken,
    events: Sender<ScanEvent>,
}

impl Pipeline {
    fn run(mut self) -> ScanSummary {
        info!(
            "Starting scan of {} (session {})",
            self.root.display(),
            self.session_id
        );
        self.emit(ScanEvent::ScanStarted {
            session_id: self.session_id,
            path: self.root.clone(),
        });

        let mut walker = Walker::new(self.root.clone(), self.cancel.clone(), self.config.clone());
        let mut aggregator = Aggregator::new(self.root.clone());
        let mut failed_writes = 0u64;

        while let Some(batch) = walker.next_batch() {
            if !batch.entries.is_empty() {
                let rollups = aggregator.apply(&batch.entries);

                if let Err(e) = self.store.insert_entries(self.session_id, &batch.entries) {
                    error!(
                        "Dropped {} entries of session {}: {e}",
                        batch.entries.len(),
                        self.session_id
                    );
                    failed_writes += 1;
                }
                if let Err(e) = self.store.upsert_rollups(self.session_id, &rollups) {
                    error!(
                        "Dropped {} rollups of session {}: {e}",
                        rollups.len(),
                        self.session_id
                    );
                    failed_writes += 1;
                }

                self.emit(ScanEvent::TreeDataDelta {
                    entries: batch.entries,
                    rollups,
                });
            }

            for err in &batch.new_errors {
                debug!("Skipped {}: {}", err.path.display(), err.message);
            }
            debug!(
                "{} items, {} at {}",
                batch.items_scanned,
                format_size(batch.total_size),
                batch.current_path.display()
            );
            self.emit(ScanEvent::ScanProgress {
                items_scanned: batch.items_scanned,
                total_size: batch.total_size,
                error_count: batch.error_count,
                errors: batch.new_errors,
            });
        }

        let progress = walker.progress();
        let totals = SessionTotals {
            total_items: progress.items_scanned,
            total_size: progress.total_size,
            error_count: progress.error_count(),
        };
        let status = match walker.outcome() {
            WalkOutcome::Cancelled => SessionStatus::Cancelled,
            _ if progress.items_scanned == 0 => SessionStatus::Error,
            _ => SessionStatus::Completed,
        };

        if let Err(e) = self.record_end(status, totals) {
            error!("Cannot finalise session {}: {e}", self.session_id);
            self.emit(ScanEvent::ScanError {
                message: format!("cannot finalise session {}: {e}", self.session_id),
            });
        }

        match status {
            SessionStatus::Cancelled => {
                info!("Scan of {} cancelled", self.root.display());
                self.emit(ScanEvent::ScanCancelled {
                    session_id: self.session_id,
                });
            }
            SessionStatus::Error => {
                let reason = progress
                    .errors
                    .first()
                    .map(|e| e.message.clone())
                    .unwrap_or_else(|| "nothing could be read".to_string());
                warn!("Scan of {} failed: {reason}", self.root.display());
                self.emit(ScanEvent::ScanError {
                    message: format!("cannot scan {}: {reason}", self.root.display()),
                });
            }
            _ => {
                info!(
                    "Scan complete: {} items, {}, {} errors, {failed_writes} failed writes \
                     in {:.2?} ({})",
                    totals.total_items,
                    format_size(totals.total_size),
                    totals.error_count,
                    progress.elapsed(),
                    format_rate(progress.items_per_second()),
                );
                self.emit(ScanEvent::ScanCompleted {
                    session_id: self.session_id,
                    total_items: totals.total_items,
                    total_size: totals.total_size,
                });
            }
        }

        if failed_writes > 0 {
            warn!(
                "Session {} is missing data from {failed_writes} failed writes",
                self.session_id
            );
        }

        ScanSummary {
            session_id: self.session_id,
            status,
            totals,
            failed_writes,
        }
    }

    fn record_end(&self, status: SessionStatus, totals: SessionTotals) -> StoreResult<()> {
        self.store.finish_session(self.session_id, status, totals)?;
        if status != SessionStatus::Error {
            self.store.set_last_session_id(self.session_id)?;
        }
        Ok(())
    }

    fn emit(&self, event: ScanEvent) {
        if self.events.send(event).is_err() {
            debug!("Event receiver for session {} is gone", self.session_id);
        }
    }
}

#[cfg(unix)]
fn volume_id(root: &Path) -> Option<String> {
    use std::os::unix::fs::MetadataExt;
    std::fs::metadata(root).ok().map(|m| format!("dev:{}", m.dev()))
}

#[cfg(not(unix))]
fn volume_id(_root: &Path) -> Option<String> {
    None
}

/// Host-facing entry points: at most one scan in flight at a time.
pub struct ScanController {
    store_config: StoreConfig,
    scan_config: ScanConfig,
    current: Mutex<Option<CancellationToken>>,
}

impl ScanController {
    pub fn new(store_config: StoreConfig, scan_config: ScanConfig) -> Self {
        Self {
            store_config,
            scan_config,
            current: Mutex::new(None),
        }
    }

    /// Start scanning `root`, cancelling any scan this controller started
    /// before. The previous scan still finishes its in-flight batch and
    /// records itself as cancelled.
    pub fn start_scan(&self, root: impl Into<PathBuf>) -> Result<ScanHandle, ScanStartError> {
        let root = root.into();
        let token = CancellationToken::new();
        if let Some(previous) = self.current.lock().replace(token.clone()) {
            if !previous.is_cancelled() {
                info!("Cancelling previous scan before scanning {}", root.display());
                previous.cancel();
            }
        }

        let store = Store::open(&self.store_config)?;
        start_scan(root, store, self.scan_config.clone(), token)
    }

    /// Signal the current scan, if any. Idempotent.
    pub fn cancel_scan(&self) {
        if let Some(token) = self.current.lock().as_ref() {
            info!("Scan cancellation requested");
            token.cancel();
        }
    }

    /// Lay out `items` inside `bounds`. Pure; does not touch the scan.
    pub fn layout(&self, items: &[LayoutItem], bounds: Rect) -> Vec<PlacedRectangle> {
        treemap::layout(items, bounds)
    }
}
