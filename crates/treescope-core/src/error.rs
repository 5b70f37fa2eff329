/// Error types for the persistence layer.
///
/// Per-item filesystem problems are not errors here: they are recorded as
/// [`crate::model::ScanError`] values and travel with the scan progress.
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by [`crate::store::Store`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// Any SQLite failure (open, prepare, constraint violation, I/O).
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The directory that should hold the database file could not be created.
    #[error("cannot create database directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A schema migration statement failed; the whole migration was rolled back.
    #[error("migration to version {version} failed at statement #{statement}: {source}")]
    Migration {
        version: u32,
        statement: usize,
        #[source]
        source: rusqlite::Error,
    },

    /// A stored value could not be decoded.
    #[error("corrupt row: {message}")]
    Corrupt { message: String },
}

/// Convenience alias used throughout the store module.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that prevent a scan from starting at all.
#[derive(Debug, Error)]
pub enum ScanStartError {
    /// The store could not be opened or the session row could not be created.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The OS refused to spawn the scan thread.
    #[error("cannot spawn scan thread: {0}")]
    Spawn(#[source] std::io::Error),
}
