/// Host-side view of one scan: every entry and the latest rollup per
/// directory, fed either live from [`ScanEvent`]s or reloaded from the store.
///
/// This is what the display layer queries to build each treemap level.
use crate::error::StoreResult;
use crate::model::{DirectoryRollup, FileSystemEntry};
use crate::scanner::ScanEvent;
use crate::store::Store;
use crate::treemap::LayoutItem;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Default)]
pub struct ScanDataset {
    session_id: Option<i64>,
    root: Option<PathBuf>,
    entries: HashMap<PathBuf, FileSystemEntry>,
    /// Parent path to child paths, in arrival order.
    children: HashMap<PathBuf, Vec<PathBuf>>,
    rollups: HashMap<PathBuf, DirectoryRollup>,
}

impl ScanDataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a finished (or interrupted) session from the store.
    /// `None` if the session does not exist.
    pub fn load(store: &Store, session_id: i64) -> StoreResult<Option<Self>> {
        let Some(session) = store.session(session_id)? else {
            return Ok(None);
        };
        let mut dataset = Self {
            session_id: Some(session.id),
            root: Some(session.root_path),
            ..Self::default()
        };
        dataset.apply_delta(store.entries(session_id)?, store.rollups(session_id)?);
        Ok(Some(dataset))
    }

    /// Fold one event into the view. A `scanStarted` event resets it.
    pub fn apply_event(&mut self, event: &ScanEvent) {
        match event {
            ScanEvent::ScanStarted { session_id, path } => {
                self.clear();
                self.session_id = Some(*session_id);
                self.root = Some(path.clone());
            }
            ScanEvent::TreeDataDelta { entries, rollups } => {
                self.apply_delta(entries.iter().cloned(), rollups.iter().cloned());
            }
            _ => {}
        }
    }

    /// Add entries and replace rollups. Rollups are cumulative snapshots,
    /// so the newest value for a path always wins.
    pub fn apply_delta(
        &mut self,
        entries: impl IntoIterator<Item = FileSystemEntry>,
        rollups: impl IntoIterator<Item = DirectoryRollup>,
    ) {
        for entry in entries {
            if let Some(parent) = &entry.parent {
                if !self.entries.contains_key(&entry.path) {
                    self.children
                        .entry(parent.clone())
                        .or_default()
                        .push(entry.path.clone());
                }
            }
            self.entries.insert(entry.path.clone(), entry);
        }
        for rollup in rollups {
            self.rollups.insert(rollup.path.clone(), rollup);
        }
    }

    pub fn session_id(&self) -> Option<i64> {
        self.session_id
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn entry(&self, path: &Path) -> Option<&FileSystemEntry> {
        self.entries.get(path)
    }

    pub fn rollup(&self, path: &Path) -> Option<&DirectoryRollup> {
        self.rollups.get(path)
    }

    /// Direct children of `parent`, in arrival order.
    pub fn children(&self, parent: &Path) -> Vec<&FileSystemEntry> {
        self.children
            .get(parent)
            .map(|paths| paths.iter().filter_map(|p| self.entries.get(p)).collect())
            .unwrap_or_default()
    }

    /// Treemap input for the level under `focus`.
    ///
    /// Directories are weighted by their rollup total; a directory with no
    /// rollup yet, and any zero-byte item, is left out.
    pub fn layout_items(&self, focus: &Path) -> Vec<LayoutItem> {
        self.children(focus)
            .into_iter()
            .filter_map(|entry| {
                let size = if entry.is_dir() {
                    self.rollups.get(&entry.path).map_or(0, |r| r.total_size)
                } else {
                    entry.size
                };
                (size > 0).then(|| LayoutItem {
                    path: entry.path.clone(),
                    name: entry.name.to_string(),
                    is_directory: entry.is_dir(),
                    size,
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.session_id = None;
        self.root = None;
        self.entries.clear();
        self.children.clear();
        self.rollups.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Aggregator;
    use crate::model::EntryKind;
    use compact_str::CompactString;

    fn entry(path: &str, parent: Option<&str>, kind: EntryKind, size: u64) -> FileSystemEntry {
        let path = PathBuf::from(path);
        FileSystemEntry {
            name: CompactString::new(path.file_name().unwrap().to_string_lossy()),
            extension: None,
            path,
            parent: parent.map(PathBuf::from),
            kind,
            size,
            modified: None,
        }
    }

    fn tree() -> Vec<FileSystemEntry> {
        vec![
            entry("/r", None, EntryKind::Directory, 0),
            entry("/r/a.txt", Some("/r"), EntryKind::File, 100),
            entry("/r/sub", Some("/r"), EntryKind::Directory, 0),
            entry("/r/sub/b.txt", Some("/r/sub"), EntryKind::File, 50),
            entry("/r/empty", Some("/r"), EntryKind::Directory, 0),
            entry("/r/zero.txt", Some("/r"), EntryKind::File, 0),
        ]
    }

    fn started() -> ScanEvent {
        ScanEvent::ScanStarted {
            session_id: 1,
            path: PathBuf::from("/r"),
        }
    }

    #[test]
    fn deltas_build_the_tree() {
        let entries = tree();
        let rollups = Aggregator::new("/r").apply(&entries);

        let mut ds = ScanDataset::new();
        ds.apply_event(&started());
        ds.apply_event(&ScanEvent::TreeDataDelta { entries, rollups });

        assert_eq!(ds.session_id(), Some(1));
        assert_eq!(ds.root(), Some(Path::new("/r")));
        assert_eq!(ds.len(), 6);
        assert_eq!(ds.rollup(Path::new("/r")).unwrap().total_size, 150);
        let names: Vec<&str> = ds
            .children(Path::new("/r"))
            .iter()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(names, vec!["a.txt", "sub", "empty", "zero.txt"]);
    }

    #[test]
    fn layout_items_weight_directories_by_rollup() {
        let entries = tree();
        let rollups = Aggregator::new("/r").apply(&entries);
        let mut ds = ScanDataset::new();
        ds.apply_delta(entries, rollups);

        let items = ds.layout_items(Path::new("/r"));
        let pairs: Vec<(&str, u64, bool)> = items
            .iter()
            .map(|i| (i.name.as_str(), i.size, i.is_directory))
            .collect();
        assert_eq!(pairs, vec![("a.txt", 100, false), ("sub", 50, true)]);
    }

    #[test]
    fn newer_rollup_replaces_older() {
        let mut ds = ScanDataset::new();
        let mut agg = Aggregator::new("/r");
        let batch = tree();
        let first = agg.apply(&batch[..2]);
        ds.apply_delta(batch[..2].to_vec(), first);
        assert_eq!(ds.rollup(Path::new("/r")).unwrap().total_size, 100);

        let second = agg.apply(&batch[2..]);
        ds.apply_delta(batch[2..].to_vec(), second);
        assert_eq!(ds.rollup(Path::new("/r")).unwrap().total_size, 150);
    }

    #[test]
    fn scan_started_resets_previous_data() {
        let mut ds = ScanDataset::new();
        ds.apply_delta(tree(), Vec::new());
        ds.apply_event(&ScanEvent::ScanStarted {
            session_id: 2,
            path: PathBuf::from("/other"),
        });
        assert!(ds.is_empty());
        assert_eq!(ds.session_id(), Some(2));
        assert!(ds.children(Path::new("/r")).is_empty());
    }

    #[test]
    fn load_round_trips_through_the_store() {
        let mut store = Store::open_in_memory().unwrap();
        let session = store.create_session(Path::new("/r"), None).unwrap();
        let entries = tree();
        let rollups = Aggregator::new("/r").apply(&entries);
        store.insert_entries(session, &entries).unwrap();
        store.upsert_rollups(session, &rollups).unwrap();

        let ds = ScanDataset::load(&store, session).unwrap().unwrap();
        assert_eq!(ds.len(), 6);
        assert_eq!(ds.rollup(Path::new("/r/sub")).unwrap().file_count, 1);
        assert_eq!(ds.layout_items(Path::new("/r")).len(), 2);

        assert!(ScanDataset::load(&store, session + 1).unwrap().is_none());
    }
}
