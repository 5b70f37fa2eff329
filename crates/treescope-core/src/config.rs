/// Scan and store settings.
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable that overrides the default database location.
pub const DB_PATH_ENV: &str = "TREESCOPE_DB";

/// Entries accumulated before a batch is flushed.
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Maximum time a non-empty batch is held before it is flushed.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(100);

/// Maximum number of events that may queue up between scan thread and host.
///
/// When the host falls behind, the scan thread blocks on `send` instead of
/// growing the queue without bound.
pub const DEFAULT_EVENT_CAPACITY: usize = 4_096;

/// Traversal batching policy.
///
/// A batch is flushed when it reaches `batch_size` entries **or** when
/// `flush_interval` has elapsed since the previous flush, whichever comes
/// first. Each flushed batch is one aggregation update and one durable write.
/// `event_capacity` bounds the host event channel.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub batch_size: usize,
    pub flush_interval: Duration,
    pub event_capacity: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

/// Location of the embedded database file.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub path: PathBuf,
}

impl StoreConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `$TREESCOPE_DB` if set, otherwise `<data dir>/TreeScope/treescope.db`.
    ///
    /// Falls back to the working directory when the platform exposes no
    /// per-user data directory.
    pub fn default_location() -> Self {
        if let Some(path) = std::env::var_os(DB_PATH_ENV) {
            return Self::new(path);
        }
        let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(base.join("TreeScope").join("treescope.db"))
    }
}
