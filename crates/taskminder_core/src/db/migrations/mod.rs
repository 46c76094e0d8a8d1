//! Ordered schema migrations for the task store.
//!
//! # Invariants
//! - Versions strictly increase; the last one is the supported schema.
//! - All pending scripts run in one transaction, each followed by a
//!   `PRAGMA user_version` bump.
//! - Scripts use `IF NOT EXISTS`, so a `tasks` table created by an older,
//!   unversioned build is adopted rather than rejected.

use crate::db::{DbError, DbResult};
use log::{debug, info};
use rusqlite::Connection;

/// `(version, script)` pairs in application order.
const MIGRATIONS: &[(u32, &str)] = &[(1, include_str!("0001_init.sql"))];

/// Schema version this build writes.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |(version, _)| *version)
}

/// Brings `conn` up to [`latest_version`]. A current store is untouched.
///
/// # Errors
/// - `UnsupportedSchemaVersion` when the store is newer than this build.
/// - `Migration` when a script fails; nothing from the batch is kept.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let from = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    let latest = latest_version();

    if from > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from,
            latest_supported: latest,
        });
    }
    if from == latest {
        debug!("event=db_migrate module=db status=skip version={from}");
        return Ok(());
    }

    let tx = conn.transaction()?;
    for (version, script) in MIGRATIONS.iter().filter(|(version, _)| *version > from) {
        tx.execute_batch(script)
            .and_then(|()| tx.pragma_update(None, "user_version", version))
            .map_err(|source| DbError::Migration {
                version: *version,
                source,
            })?;
    }
    tx.commit()?;

    info!("event=db_migrate module=db status=ok from_version={from} to_version={latest}");
    Ok(())
}
