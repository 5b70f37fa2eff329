/// One filesystem object discovered by a scan, plus the per-item error record.
use chrono::{DateTime, Utc};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Classification of a scanned item, taken from `lstat` (links are not followed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
}

impl EntryKind {
    /// Stable text form used in the database and in events.
    pub fn as_str(self) -> &'static str {
        match self {
            EntryKind::File => "file",
            EntryKind::Directory => "directory",
            EntryKind::Symlink => "symlink",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(EntryKind::File),
            "directory" => Ok(EntryKind::Directory),
            "symlink" => Ok(EntryKind::Symlink),
            other => Err(format!("unknown entry kind '{other}'")),
        }
    }
}

/// A single scanned item. Immutable once produced by the traversal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSystemEntry {
    /// Absolute path, unique within one scan run.
    #[serde(with = "crate::model::lossy_path")]
    pub path: PathBuf,
    /// Final path component (or the whole root path when it has none).
    pub name: CompactString,
    /// `None` only for the scan root.
    #[serde(with = "crate::model::lossy_path::option")]
    pub parent: Option<PathBuf>,
    pub kind: EntryKind,
    /// Byte length reported by `lstat`.
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
    pub extension: Option<CompactString>,
}

impl FileSystemEntry {
    #[inline]
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    #[inline]
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    /// Bytes this entry contributes to its ancestors' rollups.
    ///
    /// Only files carry content. A directory's inode length and a symlink's
    /// target-path length both count as zero.
    #[inline]
    pub fn content_size(&self) -> u64 {
        if self.is_file() {
            self.size
        } else {
            0
        }
    }
}

/// A non-fatal problem reading one path. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanError {
    #[serde(with = "crate::model::lossy_path")]
    pub path: PathBuf,
    /// Raw OS error number, or `-1` when the platform gave none.
    pub code: i32,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ScanError {
    pub fn from_io(path: PathBuf, err: &std::io::Error, context: &str) -> Self {
        Self {
            path,
            code: err.raw_os_error().unwrap_or(-1),
            message: if context.is_empty() {
                err.to_string()
            } else {
                format!("{context}: {err}")
            },
            timestamp: Utc::now(),
        }
    }
}
