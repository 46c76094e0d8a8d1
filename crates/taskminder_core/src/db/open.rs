//! Task store connection setup.
//!
//! Returned connections have a busy timeout set and every migration
//! applied.

use super::migrations::apply_migrations;
use super::{DbError, DbResult};
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const IN_MEMORY_TARGET: &str = ":memory:";

/// Opens a task database file, creating it when absent.
///
/// Emits `db_open` start/ok/error events with the elapsed time.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    let path = path.as_ref();
    open_with(&path.display().to_string(), || Connection::open(path))
}

/// Opens a private in-memory task database.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_with(IN_MEMORY_TARGET, Connection::open_in_memory)
}

fn open_with(
    target: &str,
    connect: impl FnOnce() -> rusqlite::Result<Connection>,
) -> DbResult<Connection> {
    let started_at = Instant::now();
    let mode = if target == IN_MEMORY_TARGET { "memory" } else { "file" };
    info!("event=db_open module=db status=start mode={mode}");

    let result = connect()
        .map_err(|source| DbError::Open {
            target: target.to_string(),
            source,
        })
        .and_then(|mut conn| {
            conn.busy_timeout(BUSY_TIMEOUT)?;
            apply_migrations(&mut conn)?;
            Ok(conn)
        });

    let duration_ms = started_at.elapsed().as_millis();
    match &result {
        Ok(_) => info!("event=db_open module=db status=ok mode={mode} duration_ms={duration_ms}"),
        Err(err) => error!(
            "event=db_open module=db status=error mode={mode} duration_ms={duration_ms} error_code={} error={err}",
            err.code()
        ),
    }
    result
}
