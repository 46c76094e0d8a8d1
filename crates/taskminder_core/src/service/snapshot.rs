//! Immutable task snapshot and subscriber registry.
//!
//! # Invariants
//! - A published snapshot is never mutated; changes swap in a new `Arc`.
//! - Both lists stay sorted by `date ASC, id ASC`.
//! - Listeners are invoked in registration order.

use crate::model::task::{Task, TaskId};
use chrono::NaiveDate;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// In-memory projection of the task store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskSnapshot {
    pub all_tasks: Vec<Task>,
    pub today_tasks: Vec<Task>,
    /// `true` while at least one fetch is in flight.
    pub loading: bool,
    /// Message of the most recent failed fetch, cleared by the next
    /// successful one.
    pub last_error: Option<String>,
}

impl TaskSnapshot {
    pub fn find(&self, id: &str) -> Option<&Task> {
        self.all_tasks.iter().find(|task| task.id == id)
    }

    /// Whether either list holds `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.all_tasks
            .iter()
            .chain(&self.today_tasks)
            .any(|task| task.id == id)
    }

    /// Completed tasks, ascending by date.
    pub fn completed(&self) -> Vec<&Task> {
        self.all_tasks.iter().filter(|task| task.done).collect()
    }

    /// Inserts or replaces `task` in `all_tasks`, and adds it to or drops it
    /// from `today_tasks` depending on whether it falls on `today`.
    pub(crate) fn place(&mut self, task: Task, today: NaiveDate) {
        self.place_today(&task, today);
        upsert_sorted(&mut self.all_tasks, task);
    }

    pub(crate) fn remove(&mut self, id: &str) {
        self.all_tasks.retain(|task| task.id != id);
        self.today_tasks.retain(|task| task.id != id);
    }

    /// Replays one recorded change onto `all_tasks` only.
    pub(crate) fn replay_all(&mut self, change: &SnapshotChange) {
        match change {
            SnapshotChange::Upsert(task) => upsert_sorted(&mut self.all_tasks, task.clone()),
            SnapshotChange::Remove(id) => self.all_tasks.retain(|task| &task.id != id),
        }
    }

    /// Replays one recorded change onto `today_tasks` only.
    pub(crate) fn replay_today(&mut self, change: &SnapshotChange, today: NaiveDate) {
        match change {
            SnapshotChange::Upsert(task) => self.place_today(task, today),
            SnapshotChange::Remove(id) => self.today_tasks.retain(|task| &task.id != id),
        }
    }

    fn place_today(&mut self, task: &Task, today: NaiveDate) {
        if task.falls_on(today) {
            upsert_sorted(&mut self.today_tasks, task.clone());
        } else {
            self.today_tasks.retain(|existing| existing.id != task.id);
        }
    }
}

/// One committed single-record change, kept so it can be re-applied to a
/// fetch result that was read before the change landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SnapshotChange {
    Upsert(Task),
    Remove(TaskId),
}

impl SnapshotChange {
    pub(crate) fn apply(&self, snapshot: &mut TaskSnapshot, today: NaiveDate) {
        match self {
            Self::Upsert(task) => snapshot.place(task.clone(), today),
            Self::Remove(id) => snapshot.remove(id),
        }
    }
}

fn upsert_sorted(tasks: &mut Vec<Task>, task: Task) {
    tasks.retain(|existing| existing.id != task.id);
    let index = tasks.partition_point(|existing| {
        (existing.date.as_str(), existing.id.as_str()) < (task.date.as_str(), task.id.as_str())
    });
    tasks.insert(index, task);
}

type Listener = Arc<dyn Fn(&TaskSnapshot) + Send + Sync>;

#[derive(Default)]
pub(crate) struct ListenerRegistry {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

/// Shared, lockable listener list.
#[derive(Default, Clone)]
pub(crate) struct Listeners {
    inner: Arc<Mutex<ListenerRegistry>>,
}

impl Listeners {
    pub(crate) fn add(&self, listener: Listener) -> Subscription {
        let mut registry = self.lock();
        registry.next_id += 1;
        let id = registry.next_id;
        registry.entries.push((id, listener));
        Subscription {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Calls every listener with `snapshot`.
    ///
    /// The registry lock is released before listeners run, so a listener may
    /// unsubscribe itself or others.
    pub(crate) fn notify(&self, snapshot: &TaskSnapshot) {
        let listeners: Vec<Listener> = self
            .lock()
            .entries
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(snapshot);
        }
    }

    fn lock(&self) -> MutexGuard<'_, ListenerRegistry> {
        lock_registry(&self.inner)
    }
}

fn lock_registry(registry: &Mutex<ListenerRegistry>) -> MutexGuard<'_, ListenerRegistry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle returned by `TaskCache::subscribe`.
///
/// Dropping the handle keeps the listener registered; call
/// [`Subscription::unsubscribe`] to remove it.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<ListenerRegistry>>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Removes the listener. No-op when the cache is already gone.
    pub fn unsubscribe(self) {
        if let Some(registry) = self.registry.upgrade() {
            lock_registry(&registry)
                .entries
                .retain(|(id, _)| *id != self.id);
        }
    }
}
