/// Append-only storage of scanned entries.
use super::paths::{SqlPath, StoredPath};
use super::{from_db, to_db, Store};
use crate::error::StoreResult;
use crate::model::{EntryKind, FileSystemEntry};
use compact_str::CompactString;
use rusqlite::types::Type;
use rusqlite::{params, Row};
use std::path::Path;

const ENTRY_COLUMNS: &str = "path, name, parent_path, kind, size, mtime, extension";

impl Store {
    /// Insert one batch of entries in a single transaction.
    ///
    /// Any failing row (e.g. a duplicate `(session, path)`) rolls back the
    /// whole batch and returns the error; nothing is retried.
    pub fn insert_entries(
        &mut self,
        session_id: i64,
        entries: &[FileSystemEntry],
    ) -> StoreResult<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO file_entries
                     (session_id, path, name, parent_path, kind, size, mtime, extension)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for entry in entries {
                stmt.execute(params![
                    session_id,
                    SqlPath(&entry.path),
                    entry.name.as_str(),
                    entry.parent.as_deref().map(SqlPath),
                    entry.kind.as_str(),
                    to_db(entry.size),
                    entry.modified,
                    entry.extension.as_deref(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(entries.len())
    }

    /// Every entry of a session in insertion order.
    pub fn entries(&self, session_id: i64) -> StoreResult<Vec<FileSystemEntry>> {
        let sql =
            format!("SELECT {ENTRY_COLUMNS} FROM file_entries WHERE session_id = ?1 ORDER BY id");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([session_id], entry_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Direct children of `parent` within a session.
    pub fn children(&self, session_id: i64, parent: &Path) -> StoreResult<Vec<FileSystemEntry>> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM file_entries
              WHERE session_id = ?1 AND parent_path = ?2
              ORDER BY id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![session_id, SqlPath(parent)],
            entry_from_row,
        )?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn entry_count(&self, session_id: i64) -> StoreResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM file_entries WHERE session_id = ?1",
            [session_id],
            |row| row.get(0),
        )?;
        Ok(from_db(count))
    }
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<FileSystemEntry> {
    let kind: String = row.get(3)?;
    let kind = kind
        .parse::<EntryKind>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, e.into()))?;
    Ok(FileSystemEntry {
        path: row.get::<_, StoredPath>(0)?.0,
        name: CompactString::from(row.get::<_, String>(1)?),
        parent: row.get::<_, Option<StoredPath>>(2)?.map(|p| p.0),
        kind,
        size: from_db(row.get(4)?),
        modified: row.get(5)?,
        extension: row.get::<_, Option<String>>(6)?.map(CompactString::from),
    })
}
