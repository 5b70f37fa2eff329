/// Persistence layer: scan sessions, raw entries, and rollups in SQLite.
///
/// One [`Store`] wraps one connection. The scan pipeline opens its own store
/// and moves it onto the scan thread, so no connection is ever shared between
/// threads.
///
/// # Write granularity
///
/// Each traversal batch produces exactly two calls: [`Store::insert_entries`]
/// and [`Store::upsert_rollups`]. Each runs in its own transaction, so a batch
/// is either fully stored or fully rolled back. Nothing is retried.
///
/// # Durability
///
/// WAL journaling with `synchronous = NORMAL`: a crash may lose the last
/// committed transaction but never corrupts earlier ones. Everything in here
/// can be rebuilt by rescanning.
pub mod entries;
pub mod migrations;
mod paths;
pub mod rollups;
pub mod sessions;

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// How long a writer waits on a lock held by another connection (e.g. a
/// cancelled scan still flushing its last batch).
const BUSY_WAIT: Duration = Duration::from_secs(5);

/// A migrated SQLite connection.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (creating if needed) the database described by `config` and
    /// bring its schema up to date.
    ///
    /// Any error here is fatal to the application.
    pub fn open(config: &StoreConfig) -> StoreResult<Self> {
        Self::open_path(&config.path)
    }

    pub fn open_path(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(path)?;
        info!("SQLite database opened at {}", path.display());
        Self::init(conn)
    }

    /// A private in-memory database, mainly for tests.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(mut conn: Connection) -> StoreResult<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        let journal: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.busy_timeout(BUSY_WAIT)?;
        debug!("SQLite pragmas configured (journal_mode = {journal})");

        migrations::run(&mut conn)?;
        Ok(Self { conn })
    }

    pub fn schema_version(&self) -> StoreResult<u32> {
        migrations::current_version(&self.conn)
    }
}

/// Sizes and counts are `u64` in memory and `INTEGER` (i64) on disk.
#[inline]
pub(crate) fn to_db(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[inline]
pub(crate) fn from_db(value: i64) -> u64 {
    value.max(0) as u64
}
