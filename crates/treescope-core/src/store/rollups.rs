/// Directory rollups keyed by `(session, path)`.
///
/// Upserts overwrite every numeric column with the aggregator's current
/// cumulative values. The aggregator is the source of truth; the table only
/// mirrors it, so batches must be written in emission order.
use super::paths::{SqlPath, StoredPath};
use super::{from_db, to_db, Store};
use crate::error::StoreResult;
use crate::model::DirectoryRollup;
use rusqlite::{params, OptionalExtension, Row};
use std::path::Path;

impl Store {
    /// Upsert one batch of changed rollups in a single transaction.
    pub fn upsert_rollups(
        &mut self,
        session_id: i64,
        rollups: &[DirectoryRollup],
    ) -> StoreResult<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO dir_aggregates
                     (session_id, path, total_size, file_count, dir_count, depth)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT (session_id, path) DO UPDATE SET
                     total_size = excluded.total_size,
                     file_count = excluded.file_count,
                     dir_count  = excluded.dir_count,
                     depth      = excluded.depth",
            )?;
            for rollup in rollups {
                stmt.execute(params![
                    session_id,
                    SqlPath(&rollup.path),
                    to_db(rollup.total_size),
                    to_db(rollup.file_count),
                    to_db(rollup.dir_count),
                    rollup.depth,
                ])?;
            }
        }
        tx.commit()?;
        Ok(rollups.len())
    }

    pub fn rollup(&self, session_id: i64, path: &Path) -> StoreResult<Option<DirectoryRollup>> {
        Ok(self
            .conn
            .query_row(
                "SELECT path, total_size, file_count, dir_count, depth
                   FROM dir_aggregates WHERE session_id = ?1 AND path = ?2",
                params![session_id, SqlPath(path)],
                rollup_from_row,
            )
            .optional()?)
    }

    /// All rollups of a session, shallowest first.
    pub fn rollups(&self, session_id: i64) -> StoreResult<Vec<DirectoryRollup>> {
        let mut stmt = self.conn.prepare(
            "SELECT path, total_size, file_count, dir_count, depth
               FROM dir_aggregates WHERE session_id = ?1
              ORDER BY depth, path",
        )?;
        let rows = stmt.query_map([session_id], rollup_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

fn rollup_from_row(row: &Row<'_>) -> rusqlite::Result<DirectoryRollup> {
    Ok(DirectoryRollup {
        path: row.get::<_, StoredPath>(0)?.0,
        total_size: from_db(row.get(1)?),
        file_count: from_db(row.get(2)?),
        dir_count: from_db(row.get(3)?),
        depth: row.get(4)?,
    })
}
