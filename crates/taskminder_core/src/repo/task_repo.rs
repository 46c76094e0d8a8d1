//! Task repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide stable CRUD APIs over the canonical `tasks` table.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths validate and normalize input before SQL mutations.
//! - Every write is one statement, so no reader sees a partial record.
//! - Reads are ordered by `date ASC, id ASC`.
//! - Rows with an unparsable `date` are returned as-is; rows with an
//!   unknown `repeat` or non-boolean flags are rejected as invalid data.

use crate::db::migrations::apply_migrations;
use crate::db::{open_db, open_db_in_memory, DbError};
use crate::model::date::{format_task_date, local_day_bounds, now_canonical};
use crate::model::task::{NewTask, Repeat, Task, TaskId, TaskPatch, TaskValidationError};
use chrono::NaiveDate;
use log::{debug, info};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

const TASK_SELECT_SQL: &str = "SELECT
    id,
    title,
    description,
    date,
    repeat,
    done,
    notified,
    createdAt
FROM tasks";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for task persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Input rejected before any write.
    Validation(TaskValidationError),
    /// Storage medium failure.
    Db(DbError),
    NotFound(TaskId),
    /// Persisted row cannot be mapped back to a task.
    InvalidData(String),
    /// Backend has no storage on this platform.
    Unavailable(String),
}

impl RepoError {
    /// Returns whether this error belongs to the storage class (I/O,
    /// corruption, missing backend) rather than caller input.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            Self::Db(_) | Self::InvalidData(_) | Self::Unavailable(_)
        )
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "task not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted task data: {message}"),
            Self::Unavailable(message) => write!(f, "task storage unavailable: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::InvalidData(_) | Self::Unavailable(_) => None,
        }
    }
}

impl From<TaskValidationError> for RepoError {
    fn from(value: TaskValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Durable CRUD over task records, independent of storage technology.
pub trait TaskRepository: Send + Sync {
    /// Creates the backing schema when absent. Idempotent.
    fn init(&self) -> RepoResult<()>;
    /// Assigns `id` and `createdAt`, persists, and returns the full record.
    fn create(&self, input: &NewTask) -> RepoResult<Task>;
    fn get(&self, id: &str) -> RepoResult<Option<Task>>;
    /// All tasks ascending by `date`.
    fn get_all(&self) -> RepoResult<Vec<Task>>;
    /// Tasks due within one local calendar day, ascending by `date`.
    fn get_for_day(&self, day: NaiveDate) -> RepoResult<Vec<Task>>;
    /// Applies the provided fields. An empty patch is a no-op.
    fn update(&self, id: &str, patch: &TaskPatch) -> RepoResult<()>;
    /// Removes one task. Deleting a missing id is not an error.
    fn delete(&self, id: &str) -> RepoResult<()>;
}

/// Builds the record `create` persists: validated input plus generated
/// identity fields.
pub(crate) fn build_task(input: &NewTask) -> RepoResult<Task> {
    let normalized = input.normalized()?;
    Ok(Task {
        id: Uuid::new_v4().to_string(),
        title: normalized.title,
        description: normalized.description,
        date: normalized.date,
        repeat: normalized.repeat,
        done: false,
        notified: false,
        created_at: now_canonical(),
    })
}

/// Canonical `[start, end]` text bounds of one local day.
pub(crate) fn day_bounds_text(day: NaiveDate) -> Option<(String, String)> {
    local_day_bounds(day).map(|(start, end)| (format_task_date(start), format_task_date(end)))
}

/// SQLite-backed task repository owning its connection.
pub struct SqliteTaskRepository {
    conn: Mutex<Connection>,
}

impl SqliteTaskRepository {
    /// Wraps an already-configured connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Opens (or creates) a task database file with migrations applied.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        Ok(Self::new(open_db(path)?))
    }

    /// Opens a private in-memory task database.
    pub fn open_in_memory() -> RepoResult<Self> {
        Ok(Self::new(open_db_in_memory()?))
    }

    fn lock(&self) -> RepoResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| RepoError::Unavailable("task connection lock poisoned".to_string()))
    }
}

impl TaskRepository for SqliteTaskRepository {
    fn init(&self) -> RepoResult<()> {
        let mut conn = self.lock()?;
        apply_migrations(&mut conn)?;
        Ok(())
    }

    fn create(&self, input: &NewTask) -> RepoResult<Task> {
        let task = build_task(input)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO tasks (
                id,
                title,
                description,
                date,
                repeat,
                done,
                notified,
                createdAt
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                task.id.as_str(),
                task.title.as_str(),
                task.description.as_deref(),
                task.date.as_str(),
                task.repeat.as_str(),
                bool_to_int(task.done),
                bool_to_int(task.notified),
                task.created_at.as_str(),
            ],
        )?;

        debug!(
            "event=task_create module=repo status=ok task_id={} repeat={}",
            task.id, task.repeat
        );
        Ok(task)
    }

    fn get(&self, id: &str) -> RepoResult<Option<Task>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!("{TASK_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_task_row(row)?));
        }
        Ok(None)
    }

    fn get_all(&self) -> RepoResult<Vec<Task>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!("{TASK_SELECT_SQL} ORDER BY date ASC, id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?);
        }
        Ok(tasks)
    }

    fn get_for_day(&self, day: NaiveDate) -> RepoResult<Vec<Task>> {
        let Some((start, end)) = day_bounds_text(day) else {
            info!("event=task_list_day module=repo status=skip reason=no_local_bounds day={day}");
            return Ok(Vec::new());
        };

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "{TASK_SELECT_SQL}
             WHERE date BETWEEN ?1 AND ?2
             ORDER BY date ASC, id ASC;"
        ))?;
        let mut rows = stmt.query(params![start, end])?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?);
        }
        Ok(tasks)
    }

    fn update(&self, id: &str, patch: &TaskPatch) -> RepoResult<()> {
        if patch.is_empty() {
            return Ok(());
        }
        let patch = patch.normalized()?;

        let mut assignments: Vec<&'static str> = Vec::new();
        let mut bind_values: Vec<Value> = Vec::new();
        if let Some(title) = patch.title {
            assignments.push("title = ?");
            bind_values.push(Value::Text(title));
        }
        if let Some(description) = patch.description {
            assignments.push("description = ?");
            bind_values.push(description.map_or(Value::Null, Value::Text));
        }
        if let Some(date) = patch.date {
            assignments.push("date = ?");
            bind_values.push(Value::Text(date));
        }
        if let Some(repeat) = patch.repeat {
            assignments.push("repeat = ?");
            bind_values.push(Value::Text(repeat.as_str().to_string()));
        }
        if let Some(done) = patch.done {
            assignments.push("done = ?");
            bind_values.push(Value::Integer(bool_to_int(done)));
        }
        if let Some(notified) = patch.notified {
            assignments.push("notified = ?");
            bind_values.push(Value::Integer(bool_to_int(notified)));
        }
        bind_values.push(Value::Text(id.to_string()));

        let sql = format!("UPDATE tasks SET {} WHERE id = ?;", assignments.join(", "));
        let conn = self.lock()?;
        let changed = conn.execute(&sql, params_from_iter(bind_values))?;
        if changed == 0 {
            return Err(RepoError::NotFound(id.to_string()));
        }

        debug!(
            "event=task_update module=repo status=ok task_id={id} fields={}",
            assignments.len()
        );
        Ok(())
    }

    fn delete(&self, id: &str) -> RepoResult<()> {
        let conn = self.lock()?;
        let changed = conn.execute("DELETE FROM tasks WHERE id = ?1;", [id])?;
        debug!("event=task_delete module=repo status=ok task_id={id} removed={changed}");
        Ok(())
    }
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<Task> {
    let id: String = row.get("id")?;

    let repeat_text: String = row.get("repeat")?;
    let repeat = repeat_text.parse::<Repeat>().map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid repeat `{repeat_text}` in tasks.repeat for task {id}"
        ))
    })?;

    let done = int_to_bool(row.get("done")?)
        .ok_or_else(|| RepoError::InvalidData(format!("invalid done flag for task {id}")))?;
    let notified = int_to_bool(row.get("notified")?)
        .ok_or_else(|| RepoError::InvalidData(format!("invalid notified flag for task {id}")))?;

    Ok(Task {
        title: row.get("title")?,
        description: row.get("description")?,
        date: row.get("date")?,
        repeat,
        done,
        notified,
        created_at: row.get("createdAt")?,
        id,
    })
}

fn bool_to_int(value: bool) -> i64 {
    i64::from(value)
}

fn int_to_bool(value: i64) -> Option<bool> {
    match value {
        0 => Some(false),
        1 => Some(true),
        _ => None,
    }
}
