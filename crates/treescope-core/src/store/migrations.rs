/// Versioned, forward-only schema migrations.
///
/// The current version is `MAX(version)` from `schema_version`, or 0 when that
/// table does not exist yet. Every migration newer than the current version
/// runs inside its own transaction, statement by statement; the first failing
/// statement rolls the whole migration back. Scripts only use
/// `IF NOT EXISTS` forms so re-running one is harmless. There is no downgrade.
use crate::error::{StoreError, StoreResult};
use chrono::Utc;
use rusqlite::{params, Connection};
use tracing::{debug, info};

/// One migration script.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "initial schema",
        sql: include_str!("migrations/001_initial.sql"),
    },
    Migration {
        version: 2,
        description: "index file entries by parent",
        sql: include_str!("migrations/002_entry_parent_index.sql"),
    },
];

/// Highest version known to this build.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |m| m.version)
}

/// Schema version recorded in the database, 0 for a fresh file.
pub fn current_version(conn: &Connection) -> StoreResult<u32> {
    let has_table: bool = conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM sqlite_master
                         WHERE type = 'table' AND name = 'schema_version')",
        [],
        |row| row.get(0),
    )?;
    if !has_table {
        return Ok(0);
    }
    let version: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(version.unwrap_or(0).max(0) as u32)
}

/// Bring the schema up to [`latest_version`]. Returns the resulting version.
pub fn run(conn: &mut Connection) -> StoreResult<u32> {
    let from = current_version(conn)?;
    info!("Current schema version: {from}");

    let mut version = from;
    for migration in MIGRATIONS.iter().filter(|m| m.version > from) {
        apply(conn, migration)?;
        version = migration.version;
    }

    debug!("Schema is at version {version}");
    Ok(version)
}

/// Run one migration atomically and record it in `schema_version`.
pub(crate) fn apply(conn: &mut Connection, migration: &Migration) -> StoreResult<()> {
    let tx = conn.transaction()?;

    let statements = split_statements(migration.sql);
    for (i, sql) in statements.iter().enumerate() {
        debug!(
            "Migration {} statement #{}: {}",
            migration.version,
            i + 1,
            preview(sql)
        );
        tx.execute_batch(sql).map_err(|source| StoreError::Migration {
            version: migration.version,
            statement: i + 1,
            source,
        })?;
    }

    tx.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?1, ?2)",
        params![migration.version, Utc::now()],
    )
    .map_err(|source| StoreError::Migration {
        version: migration.version,
        statement: statements.len() + 1,
        source,
    })?;

    tx.commit()?;
    info!(
        "Applied migration {} ({}), {} statements",
        migration.version,
        migration.description,
        statements.len()
    );
    Ok(())
}

/// Split a script on `;`, dropping comment-only and blank lines.
fn split_statements(script: &str) -> Vec<String> {
    script
        .split(';')
        .map(|chunk| {
            chunk
                .lines()
                .filter(|line| {
                    let trimmed = line.trim();
                    !trimmed.is_empty() && !trimmed.starts_with("--")
                })
                .collect::<Vec<_>>()
                .join("\n")
        })
        .filter(|sql| !sql.trim().is_empty())
        .collect()
}

fn preview(sql: &str) -> String {
    sql.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(80)
        .collect()
}
