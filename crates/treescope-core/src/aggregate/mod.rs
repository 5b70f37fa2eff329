/// Streaming hierarchical aggregation.
///
/// The [`Aggregator`] owns the `path -> DirectoryRollup` map for one scan and
/// folds each traversal batch into it. Every update is a plain addition, so
/// the final figures do not depend on the order in which entries arrive.
///
/// # Ancestor walk
///
/// For each entry the walk starts at the entry's own path (directories) or
/// its parent (everything else) and climbs one segment at a time with
/// `Path::parent`. It stops after the scan root, or at the filesystem root
/// sentinel when an entry lies outside the scan root.
///
/// # Counting
///
/// At every visited ancestor:
/// - files add their byte length,
/// - files add one to `file_count`,
/// - directories add one to `dir_count` of every *strict* ancestor.
///
/// A directory's own level only materialises its (possibly empty) rollup.
///
/// The map is not synchronised. It lives on the pipeline thread and is only
/// ever handed out as cloned snapshots.
use crate::model::{DirectoryRollup, EntryKind, FileSystemEntry};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

pub struct Aggregator {
    root: PathBuf,
    rollups: HashMap<PathBuf, DirectoryRollup>,
}

impl Aggregator {
    /// Create an empty aggregator for a scan rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            rollups: HashMap::with_capacity(4_096),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Fold one batch into the map and return copies of every rollup it touched.
    ///
    /// Callers must apply each entry at most once: there is no deduplication.
    pub fn apply(&mut self, batch: &[FileSystemEntry]) -> Vec<DirectoryRollup> {
        let mut touched: Vec<PathBuf> = Vec::new();
        let mut seen: HashSet<PathBuf> = HashSet::new();

        for entry in batch {
            let start = match entry.kind {
                EntryKind::Directory => entry.path.as_path(),
                EntryKind::File | EntryKind::Symlink => match entry.parent.as_deref() {
                    Some(parent) => parent,
                    None => continue,
                },
            };

            let bytes = entry.content_size();
            let mut current = Some(start);
            while let Some(dir) = current {
                if !dir.starts_with(&self.root) {
                    break;
                }

                let rollup = self
                    .rollups
                    .entry(dir.to_path_buf())
                    .or_insert_with(|| DirectoryRollup::new(dir));
                rollup.total_size += bytes;
                match entry.kind {
                    EntryKind::File => rollup.file_count += 1,
                    EntryKind::Directory if dir != entry.path => rollup.dir_count += 1,
                    _ => {}
                }

                if seen.insert(dir.to_path_buf()) {
                    touched.push(dir.to_path_buf());
                }

                if dir == self.root {
                    break;
                }
                current = dir.parent();
            }
        }

        touched
            .iter()
            .filter_map(|p| self.rollups.get(p).cloned())
            .collect()
    }

    pub fn rollup(&self, path: &Path) -> Option<&DirectoryRollup> {
        self.rollups.get(path)
    }

    /// Snapshot of the whole map, in no particular order.
    pub fn snapshot(&self) -> Vec<DirectoryRollup> {
        self.rollups.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.rollups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rollups.is_empty()
    }

    /// Drop every rollup, keeping the root.
    pub fn reset(&mut self) {
        self.rollups.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compact_str::CompactString;

    fn entry(path: &str, kind: EntryKind, size: u64) -> FileSystemEntry {
        let path = PathBuf::from(path);
        let parent = if path == Path::new("/r") {
            None
        } else {
            path.parent().map(Path::to_path_buf)
        };
        FileSystemEntry {
            name: CompactString::new(path.file_name().unwrap().to_string_lossy()),
            path,
            parent,
            kind,
            size,
            modified: None,
            extension: None,
        }
    }

    fn sample_tree() -> Vec<FileSystemEntry> {
        vec![
            entry("/r", EntryKind::Directory, 0),
            entry("/r/a.txt", EntryKind::File, 100),
            entry("/r/sub", EntryKind::Directory, 0),
            entry("/r/sub/b.txt", EntryKind::File, 50),
        ]
    }

    #[test]
    fn rolls_up_sizes_and_file_counts() {
        let mut agg = Aggregator::new("/r");
        agg.apply(&sample_tree());

        let root = agg.rollup(Path::new("/r")).unwrap();
        assert_eq!(root.total_size, 150);
        assert_eq!(root.file_count, 2);
        assert_eq!(root.dir_count, 1);
        assert_eq!(root.depth, 1);

        let sub = agg.rollup(Path::new("/r/sub")).unwrap();
        assert_eq!(sub.total_size, 50);
        assert_eq!(sub.file_count, 1);
        assert_eq!(sub.dir_count, 0);
        assert_eq!(sub.depth, 2);
    }

    #[test]
    fn totals_are_independent_of_batch_order() {
        let entries = sample_tree();
        let mut reference = Aggregator::new("/r");
        reference.apply(&entries);

        // Every rotation, and the reversed order, one entry per batch.
        let mut orders: Vec<Vec<FileSystemEntry>> = (0..entries.len())
            .map(|k| {
                let mut v = entries.clone();
                v.rotate_left(k);
                v
            })
            .collect();
        orders.push(entries.iter().rev().cloned().collect());

        for order in orders {
            let mut agg = Aggregator::new("/r");
            for single in order.chunks(1) {
                agg.apply(single);
            }
            for expected in reference.snapshot() {
                assert_eq!(agg.rollup(&expected.path), Some(&expected));
            }
            assert_eq!(agg.len(), reference.len());
        }
    }

    #[test]
    fn returns_only_touched_rollups() {
        let mut agg = Aggregator::new("/r");
        agg.apply(&sample_tree());

        let changed = agg.apply(&[entry("/r/sub/c.bin", EntryKind::File, 5)]);
        let mut paths: Vec<_> = changed.iter().map(|r| r.path.clone()).collect();
        paths.sort();
        assert_eq!(paths, vec![PathBuf::from("/r"), PathBuf::from("/r/sub")]);
        // Snapshots carry the cumulative values, not the delta.
        let root = changed.iter().find(|r| r.path == Path::new("/r")).unwrap();
        assert_eq!(root.total_size, 155);
    }

    #[test]
    fn empty_directory_gets_a_rollup() {
        let mut agg = Aggregator::new("/r");
        agg.apply(&[
            entry("/r", EntryKind::Directory, 0),
            entry("/r/empty", EntryKind::Directory, 4096),
        ]);
        let empty = agg.rollup(Path::new("/r/empty")).unwrap();
        assert_eq!((empty.total_size, empty.file_count, empty.dir_count), (0, 0, 0));
        assert_eq!(agg.rollup(Path::new("/r")).unwrap().total_size, 0);
    }

    #[test]
    fn symlinks_add_neither_bytes_nor_files() {
        let mut agg = Aggregator::new("/r");
        agg.apply(&[
            entry("/r", EntryKind::Directory, 0),
            entry("/r/a.txt", EntryKind::File, 100),
            entry("/r/link", EntryKind::Symlink, 26),
        ]);
        let root = agg.rollup(Path::new("/r")).unwrap();
        assert_eq!(root.total_size, 100);
        assert_eq!(root.file_count, 1);
    }

    #[test]
    fn walk_stops_at_scan_root() {
        let mut agg = Aggregator::new("/r");
        agg.apply(&sample_tree());
        assert!(agg.rollup(Path::new("/")).is_none());
        assert_eq!(agg.len(), 2);
    }

    #[test]
    fn reset_clears_everything() {
        let mut agg = Aggregator::new("/r");
        agg.apply(&sample_tree());
        agg.reset();
        assert!(agg.is_empty());
    }
}
