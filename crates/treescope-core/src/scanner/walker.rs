/// Iterative, cancellable directory traversal.
///
/// An explicit stack replaces recursion, so tree depth never threatens the
/// thread's call stack. Each step pops one path, classifies it with
/// `symlink_metadata` (links are never followed), emits an entry, and for
/// directories pushes every child path.
///
/// Symbolic links are emitted as [`EntryKind::Symlink`] and never pushed,
/// which keeps link cycles out of the walk entirely.
///
/// # Batching
///
/// Entries collect into a local batch which is handed out when it holds
/// `batch_size` entries or when `flush_interval` has passed since the last
/// flush. The final partial batch is always returned, including after
/// cancellation.
///
/// # Errors
///
/// An unreadable path is recorded as a [`ScanError`] and skipped. A directory
/// whose listing fails is still emitted; its subtree is simply not discovered.
use super::cancel::CancellationToken;
use super::progress::ScanProgress;
use crate::config::ScanConfig;
use crate::model::{EntryKind, FileSystemEntry, ScanError};
use chrono::{DateTime, Utc};
use compact_str::CompactString;
use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::debug;

/// How a traversal ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkOutcome {
    /// Still has work to do.
    InProgress,
    /// The stack was exhausted.
    Completed,
    /// The cancel signal was observed.
    Cancelled,
}

/// One flushed group of entries and the progress at flush time.
#[derive(Debug, Clone)]
pub struct Batch {
    pub entries: Vec<FileSystemEntry>,
    /// Errors recorded since the previous batch.
    pub new_errors: Vec<ScanError>,
    pub items_scanned: u64,
    pub total_size: u64,
    pub error_count: u64,
    pub current_path: PathBuf,
    pub items_per_second: f64,
}

/// Depth-first walker yielding [`Batch`]es.
pub struct Walker {
    root: PathBuf,
    stack: Vec<PathBuf>,
    cancel: CancellationToken,
    config: ScanConfig,
    pending: Vec<FileSystemEntry>,
    last_flush: Instant,
    errors_reported: usize,
    progress: ScanProgress,
    outcome: WalkOutcome,
}

impl Walker {
    pub fn new(root: impl Into<PathBuf>, cancel: CancellationToken, config: ScanConfig) -> Self {
        let root = root.into();
        let capacity = config.batch_size.max(1);
        Self {
            stack: vec![root.clone()],
            root,
            cancel,
            pending: Vec::with_capacity(capacity),
            config,
            last_flush: Instant::now(),
            errors_reported: 0,
            progress: ScanProgress::new(),
            outcome: WalkOutcome::InProgress,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn outcome(&self) -> WalkOutcome {
        self.outcome
    }

    pub fn progress(&self) -> &ScanProgress {
        &self.progress
    }

    /// Advance until a batch is ready or the walk ends.
    pub fn next_batch(&mut self) -> Option<Batch> {
        if self.outcome != WalkOutcome::InProgress {
            return None;
        }

        while let Some(path) = self.pop() {
            self.visit(path);

            let due = self.pending.len() >= self.config.batch_size
                || self.last_flush.elapsed() >= self.config.flush_interval;
            if due && !self.pending.is_empty() {
                return Some(self.flush());
            }
        }

        // Stack exhausted or cancel observed: hand out whatever remains.
        if self.pending.is_empty() && self.errors_reported == self.progress.errors.len() {
            None
        } else {
            Some(self.flush())
        }
    }

    /// Pop the next path unless the walk is over. Checks cancellation first.
    fn pop(&mut self) -> Option<PathBuf> {
        if self.cancel.is_cancelled() {
            debug!("Traversal of {} cancelled", self.root.display());
            self.outcome = WalkOutcome::Cancelled;
            return None;
        }
        match self.stack.pop() {
            Some(path) => Some(path),
            None => {
                self.outcome = WalkOutcome::Completed;
                None
            }
        }
    }

    fn visit(&mut self, path: PathBuf) {
        self.progress.current_path.clone_from(&path);

        let meta = match fs::symlink_metadata(&path) {
            Ok(meta) => meta,
            Err(err) => {
                self.progress
                    .record_error(ScanError::from_io(path, &err, ""));
                return;
            }
        };

        let is_root = path == self.root;
        let entry = build_entry(path, &meta, is_root);

        match entry.kind {
            EntryKind::Directory => self.push_children(&entry.path),
            EntryKind::Symlink => {
                debug!("Recording symlink without following: {}", entry.path.display())
            }
            EntryKind::File => {}
        }

        self.progress.items_scanned += 1;
        self.progress.total_size += entry.content_size();
        self.pending.push(entry);
    }

    fn push_children(&mut self, dir: &Path) {
        let read_dir = match fs::read_dir(dir) {
            Ok(rd) => rd,
            Err(err) => {
                self.progress.record_error(ScanError::from_io(
                    dir.to_path_buf(),
                    &err,
                    "Cannot read directory",
                ));
                return;
            }
        };

        for child in read_dir {
            match child {
                Ok(child) => self.stack.push(child.path()),
                Err(err) => self.progress.record_error(ScanError::from_io(
                    dir.to_path_buf(),
                    &err,
                    "Cannot read directory entry",
                )),
            }
        }
    }

    fn flush(&mut self) -> Batch {
        self.last_flush = Instant::now();
        let new_errors = self.progress.errors[self.errors_reported..].to_vec();
        self.errors_reported = self.progress.errors.len();
        Batch {
            entries: std::mem::replace(
                &mut self.pending,
                Vec::with_capacity(self.config.batch_size.max(1)),
            ),
            new_errors,
            items_scanned: self.progress.items_scanned,
            total_size: self.progress.total_size,
            error_count: self.progress.error_count(),
            current_path: self.progress.current_path.clone(),
            items_per_second: self.progress.items_per_second(),
        }
    }
}

impl Iterator for Walker {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        self.next_batch()
    }
}

/// Build an entry from `lstat` metadata.
fn build_entry(path: PathBuf, meta: &Metadata, is_root: bool) -> FileSystemEntry {
    let file_type = meta.file_type();
    let kind = if file_type.is_symlink() {
        EntryKind::Symlink
    } else if file_type.is_dir() {
        EntryKind::Directory
    } else {
        EntryKind::File
    };

    let name = match path.file_name() {
        Some(name) => CompactString::new(name.to_string_lossy()),
        None => CompactString::new(path.to_string_lossy()),
    };
    let parent = if is_root {
        None
    } else {
        path.parent().map(Path::to_path_buf)
    };
    let extension = match kind {
        EntryKind::Directory => None,
        _ => path
            .extension()
            .map(|ext| CompactString::new(ext.to_string_lossy())),
    };
    let modified = meta.modified().ok().map(DateTime::<Utc>::from);

    FileSystemEntry {
        path,
        name,
        parent,
        kind,
        size: meta.len(),
        modified,
        extension,
    }
}
