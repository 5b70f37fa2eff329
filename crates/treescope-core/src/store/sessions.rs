/// Session lifecycle: one insert at scan start, one update at scan end, and
/// the `last_session_id` pointer in `app_state`.
use super::paths::{SqlPath, StoredPath};
use super::{from_db, to_db, Store};
use crate::error::{StoreError, StoreResult};
use crate::model::{ScanSession, SessionStatus, SessionTotals};
use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};
use std::path::Path;
use tracing::debug;

const LAST_SESSION_KEY: &str = "last_session_id";

const SESSION_COLUMNS: &str = "id, root_path, volume_id, started_at, finished_at, status, \
                               total_items, total_size, error_count";

impl Store {
    /// Insert a `running` session and return its store-assigned id.
    pub fn create_session(&self, root: &Path, volume_id: Option<&str>) -> StoreResult<i64> {
        self.conn.execute(
            "INSERT INTO scan_sessions (root_path, volume_id, started_at, status)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                SqlPath(root),
                volume_id,
                Utc::now(),
                SessionStatus::Running.as_str()
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!("Created session {id} for {}", root.display());
        Ok(id)
    }

    /// Record the terminal status and final totals of a session.
    pub fn finish_session(
        &self,
        session_id: i64,
        status: SessionStatus,
        totals: SessionTotals,
    ) -> StoreResult<()> {
        let updated = self.conn.execute(
            "UPDATE scan_sessions
                SET status = ?1, finished_at = ?2,
                    total_items = ?3, total_size = ?4, error_count = ?5
              WHERE id = ?6",
            params![
                status.as_str(),
                Utc::now(),
                to_db(totals.total_items),
                to_db(totals.total_size),
                to_db(totals.error_count),
                session_id
            ],
        )?;
        if updated == 0 {
            return Err(StoreError::Sqlite(rusqlite::Error::QueryReturnedNoRows));
        }
        Ok(())
    }

    pub fn session(&self, session_id: i64) -> StoreResult<Option<ScanSession>> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM scan_sessions WHERE id = ?1");
        Ok(self
            .conn
            .query_row(&sql, [session_id], session_from_row)
            .optional()?)
    }

    /// Most recent sessions first.
    pub fn sessions(&self, limit: usize) -> StoreResult<Vec<ScanSession>> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM scan_sessions ORDER BY id DESC LIMIT ?1");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([to_db(limit as u64)], session_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn set_last_session_id(&self, session_id: i64) -> StoreResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO app_state (key, value, updated_at) VALUES (?1, ?2, ?3)",
            params![LAST_SESSION_KEY, session_id.to_string(), Utc::now()],
        )?;
        Ok(())
    }

    /// The pointer written by [`Store::set_last_session_id`], if any.
    pub fn last_session_id(&self) -> StoreResult<Option<i64>> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM app_state WHERE key = ?1",
                [LAST_SESSION_KEY],
                |row| row.get(0),
            )
            .optional()?;

        match value {
            None => Ok(None),
            Some(raw) => match raw.parse::<i64>() {
                Ok(id) if id > 0 => Ok(Some(id)),
                _ => Err(StoreError::Corrupt {
                    message: format!("{LAST_SESSION_KEY} = '{raw}'"),
                }),
            },
        }
    }

    /// The session the host can redisplay without rescanning.
    ///
    /// The pointer is best-effort: a dangling id yields `None`.
    pub fn last_session(&self) -> StoreResult<Option<ScanSession>> {
        match self.last_session_id()? {
            Some(id) => self.session(id),
            None => Ok(None),
        }
    }
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<ScanSession> {
    let status: String = row.get(5)?;
    let status = status
        .parse::<SessionStatus>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, e.into()))?;
    Ok(ScanSession {
        id: row.get(0)?,
        root_path: row.get::<_, StoredPath>(1)?.0,
        volume_id: row.get(2)?,
        started_at: row.get(3)?,
        finished_at: row.get(4)?,
        status,
        total_items: from_db(row.get::<_, Option<i64>>(6)?.unwrap_or(0)),
        total_size: from_db(row.get::<_, Option<i64>>(7)?.unwrap_or(0)),
        error_count: from_db(row.get::<_, Option<i64>>(8)?.unwrap_or(0)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn session_lifecycle() {
        let store = Store::open_in_memory().unwrap();
        let id = store.create_session(Path::new("/r"), Some("dev-42")).unwrap();

        let running = store.session(id).unwrap().unwrap();
        assert_eq!(running.status, SessionStatus::Running);
        assert_eq!(running.root_path, PathBuf::from("/r"));
        assert_eq!(running.volume_id.as_deref(), Some("dev-42"));
        assert!(running.finished_at.is_none());

        let totals = SessionTotals {
            total_items: 4,
            total_size: 150,
            error_count: 1,
        };
        store
            .finish_session(id, SessionStatus::Completed, totals)
            .unwrap();

        let done = store.session(id).unwrap().unwrap();
        assert_eq!(done.status, SessionStatus::Completed);
        assert_eq!(done.total_items, 4);
        assert_eq!(done.total_size, 150);
        assert_eq!(done.error_count, 1);
        assert!(done.finished_at.unwrap() >= done.started_at);
    }

    #[test]
    fn ids_are_assigned_by_the_store() {
        let store = Store::open_in_memory().unwrap();
        let a = store.create_session(Path::new("/a"), None).unwrap();
        let b = store.create_session(Path::new("/b"), None).unwrap();
        assert!(b > a);
        let listed: Vec<i64> = store.sessions(10).unwrap().iter().map(|s| s.id).collect();
        assert_eq!(listed, vec![b, a]);
    }

    #[test]
    fn finishing_unknown_session_fails() {
        let store = Store::open_in_memory().unwrap();
        let totals = SessionTotals {
            total_items: 0,
            total_size: 0,
            error_count: 0,
        };
        assert!(store
            .finish_session(999, SessionStatus::Cancelled, totals)
            .is_err());
    }

    #[test]
    fn last_session_pointer() {
        let store = Store::open_in_memory().unwrap();
        assert_eq!(store.last_session_id().unwrap(), None);
        assert!(store.last_session().unwrap().is_none());

        let first = store.create_session(Path::new("/a"), None).unwrap();
        store.set_last_session_id(first).unwrap();
        let second = store.create_session(Path::new("/b"), None).unwrap();
        store.set_last_session_id(second).unwrap();

        assert_eq!(store.last_session_id().unwrap(), Some(second));
        assert_eq!(store.last_session().unwrap().unwrap().root_path, PathBuf::from("/b"));
    }

    #[test]
    fn dangling_pointer_yields_none() {
        let store = Store::open_in_memory().unwrap();
        store.set_last_session_id(77).unwrap();
        assert!(store.last_session().unwrap().is_none());
    }
}
