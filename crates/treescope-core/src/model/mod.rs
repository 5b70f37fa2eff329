/// Data model shared by the scanner, aggregator, store, and host shell.
///
/// Everything here is plain owned data: batches and rollup snapshots are
/// copied across threads, never shared by reference.
pub mod entry;
pub mod lossy_path;
pub mod rollup;
pub mod session;
pub mod size;

pub use entry::{EntryKind, FileSystemEntry, ScanError};
pub use rollup::{path_depth, DirectoryRollup};
pub use session::{ScanSession, SessionStatus, SessionTotals};
pub use size::{format_count, format_rate, format_size};
