/// Per-directory accumulated statistics.
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// Recursively accumulated statistics for one directory path.
///
/// Mutated only by [`crate::aggregate::Aggregator`]; everyone else sees
/// copies taken at batch boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryRollup {
    #[serde(with = "crate::model::lossy_path")]
    pub path: PathBuf,
    /// Sum of the sizes of every file beneath `path`.
    pub total_size: u64,
    /// Number of files beneath `path`, transitively.
    pub file_count: u64,
    /// Number of directories beneath `path`, transitively (excluding itself).
    pub dir_count: u64,
    /// Count of non-empty path segments.
    pub depth: u32,
}

impl DirectoryRollup {
    /// An empty rollup for `path`, with its depth derived from the path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            total_size: 0,
            file_count: 0,
            dir_count: 0,
            depth: path_depth(path),
        }
    }
}

/// Number of normal (named) components in `path`; `/` and prefixes don't count.
pub fn path_depth(path: &Path) -> u32 {
    path.components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .count() as u32
}
