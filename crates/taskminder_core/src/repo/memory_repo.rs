//! Non-durable task repository strategies.
//!
//! # Responsibility
//! - `MemoryTaskRepository`: in-process store with the same observable
//!   semantics as the SQLite implementation (ordering, not-found, idempotent
//!   delete). Used for tests and ephemeral sessions.
//! - `UnavailableTaskRepository`: stub for platforms without storage; reads
//!   are empty and writes fail with `RepoError::Unavailable`.

use crate::model::task::{NewTask, Task, TaskPatch};
use crate::repo::task_repo::{build_task, day_bounds_text, RepoError, RepoResult, TaskRepository};
use chrono::NaiveDate;
use log::{debug, warn};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// In-process task repository keyed by task id.
#[derive(Default)]
pub struct MemoryTaskRepository {
    tasks: Mutex<BTreeMap<String, Task>>,
}

impl MemoryTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored tasks. Still answers after a writer panicked.
    pub fn len(&self) -> usize {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> RepoResult<MutexGuard<'_, BTreeMap<String, Task>>> {
        self.tasks
            .lock()
            .map_err(|_| RepoError::Unavailable("memory task store lock poisoned".to_string()))
    }
}

impl TaskRepository for MemoryTaskRepository {
    fn init(&self) -> RepoResult<()> {
        Ok(())
    }

    fn create(&self, input: &NewTask) -> RepoResult<Task> {
        let task = build_task(input)?;
        self.lock()?.insert(task.id.clone(), task.clone());
        debug!(
            "event=task_create module=repo backend=memory status=ok task_id={}",
            task.id
        );
        Ok(task)
    }

    fn get(&self, id: &str) -> RepoResult<Option<Task>> {
        Ok(self.lock()?.get(id).cloned())
    }

    fn get_all(&self) -> RepoResult<Vec<Task>> {
        let tasks = self.lock()?;
        Ok(sorted_by_date(tasks.values().cloned().collect()))
    }

    fn get_for_day(&self, day: NaiveDate) -> RepoResult<Vec<Task>> {
        let Some((start, end)) = day_bounds_text(day) else {
            return Ok(Vec::new());
        };
        let tasks = self.lock()?;
        let matching = tasks
            .values()
            .filter(|task| task.date.as_str() >= start.as_str() && task.date.as_str() <= end.as_str())
            .cloned()
            .collect();
        Ok(sorted_by_date(matching))
    }

    fn update(&self, id: &str, patch: &TaskPatch) -> RepoResult<()> {
        if patch.is_empty() {
            return Ok(());
        }
        let patch = patch.normalized()?;
        let mut tasks = self.lock()?;
        let task = tasks
            .get_mut(id)
            .ok_or_else(|| RepoError::NotFound(id.to_string()))?;
        task.apply_patch(&patch);
        Ok(())
    }

    fn delete(&self, id: &str) -> RepoResult<()> {
        self.lock()?.remove(id);
        Ok(())
    }
}

/// Repository for platforms that provide no task storage at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableTaskRepository;

impl UnavailableTaskRepository {
    fn unavailable<T>(operation: &'static str) -> RepoResult<T> {
        warn!("event=task_{operation} module=repo backend=unavailable status=error");
        Err(RepoError::Unavailable(format!(
            "`{operation}` is not supported without a task store"
        )))
    }
}

impl TaskRepository for UnavailableTaskRepository {
    fn init(&self) -> RepoResult<()> {
        warn!("event=repo_init module=repo backend=unavailable status=ok mode=mock");
        Ok(())
    }

    fn create(&self, _input: &NewTask) -> RepoResult<Task> {
        Self::unavailable("create")
    }

    fn get(&self, _id: &str) -> RepoResult<Option<Task>> {
        Ok(None)
    }

    fn get_all(&self) -> RepoResult<Vec<Task>> {
        Ok(Vec::new())
    }

    fn get_for_day(&self, _day: NaiveDate) -> RepoResult<Vec<Task>> {
        Ok(Vec::new())
    }

    fn update(&self, _id: &str, _patch: &TaskPatch) -> RepoResult<()> {
        Self::unavailable("update")
    }

    fn delete(&self, _id: &str) -> RepoResult<()> {
        Self::unavailable("delete")
    }
}

fn sorted_by_date(mut tasks: Vec<Task>) -> Vec<Task> {
    tasks.sort_by(|left, right| {
        left.date
            .cmp(&right.date)
            .then_with(|| left.id.cmp(&right.id))
    });
    tasks
}

#[cfg(test)]
mod tests {
    use super::MemoryTaskRepository;
    use crate::model::task::NewTask;
    use crate::repo::task_repo::{RepoError, TaskRepository};
    use std::panic::{self, AssertUnwindSafe};

    #[test]
    fn len_counts_tasks_after_the_lock_was_poisoned() {
        let repo = MemoryTaskRepository::new();
        repo.create(&NewTask::new("Water plants", "2030-01-01T08:00:00.000Z"))
            .unwrap();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let _guard = repo.tasks.lock().unwrap();
            panic!("writer died holding the lock");
        }));
        assert!(outcome.is_err());
        assert!(repo.tasks.is_poisoned());

        assert_eq!(repo.len(), 1);
        assert!(!repo.is_empty());
        assert!(matches!(repo.get_all(), Err(RepoError::Unavailable(_))));
    }
}
