//! Task cache: the single mutation surface for callers.
//!
//! # Responsibility
//! - Keep an in-memory snapshot (`all_tasks`, `today_tasks`) consistent with
//!   the repository and the reminder scheduler.
//! - Order every mutation as: durable write, snapshot swap, reminder update.
//! - Notify subscribers synchronously after each state change.
//!
//! # Invariants
//! - One writer at a time; readers take the published `Arc` snapshot.
//! - The snapshot only advances after the matching durable step succeeds.
//! - A reminder is never scheduled for a task that failed to persist.
//! - `remove_task` cancels the reminder before deleting the record.
//! - A fetch result is dropped only when a later fetch of the same list has
//!   already been applied; mutations committed while it ran are replayed
//!   onto it.

use crate::clock::{Clock, SystemClock};
use crate::config::ReschedulePolicy;
use crate::model::task::{NewTask, Task, TaskId, TaskPatch, TaskValidationError};
use crate::reminder::center::NotificationCenter;
use crate::reminder::scheduler::ReminderScheduler;
use crate::repo::task_repo::{RepoError, RepoResult, TaskRepository};
use crate::service::snapshot::{Listeners, SnapshotChange, Subscription, TaskSnapshot};
use chrono::NaiveDate;
use log::{debug, info, warn};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

pub type CacheResult<T> = Result<T, CacheError>;

/// Errors surfaced by cache operations.
#[derive(Debug)]
pub enum CacheError {
    /// Input rejected before any persistence attempt.
    Validation(TaskValidationError),
    NotFound(TaskId),
    /// Storage failure; the snapshot is left unchanged.
    Storage(RepoError),
}

impl Display for CacheError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "task not found: {id}"),
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CacheError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Storage(err) => Some(err),
            Self::NotFound(_) => None,
        }
    }
}

impl From<TaskValidationError> for CacheError {
    fn from(value: TaskValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for CacheError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound(id) => Self::NotFound(id),
            other => Self::Storage(other),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum FetchTarget {
    All,
    Today,
}

impl FetchTarget {
    fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Today => "today",
        }
    }
}

/// Bookkeeping owned by the single writer.
///
/// Fetch tickets are only ever compared with other fetch tickets. Mutations
/// do not invalidate a running fetch; they are journaled instead and
/// replayed onto its result when it lands.
#[derive(Debug, Default)]
struct WriterState {
    last_ticket: u64,
    all_applied: u64,
    today_applied: u64,
    fetches_in_flight: BTreeSet<u64>,
    journal: Vec<(u64, SnapshotChange)>,
}

impl WriterState {
    fn next_ticket(&mut self) -> u64 {
        self.last_ticket += 1;
        self.last_ticket
    }

    /// Journals a committed change while any fetch could have missed it.
    fn record_mutation(&mut self, change: &SnapshotChange) {
        if self.fetches_in_flight.is_empty() {
            return;
        }
        let ticket = self.next_ticket();
        self.journal.push((ticket, change.clone()));
    }

    /// Changes committed after the fetch holding `ticket` started.
    fn changes_since(&self, ticket: u64) -> impl Iterator<Item = &SnapshotChange> {
        self.journal
            .iter()
            .filter(move |(at, _)| *at > ticket)
            .map(|(_, change)| change)
    }

    /// Drops journal entries no in-flight fetch can still need.
    fn prune_journal(&mut self) {
        match self.fetches_in_flight.first().copied() {
            Some(oldest) => self.journal.retain(|(at, _)| *at > oldest),
            None => self.journal.clear(),
        }
    }
}

/// Reactive task cache over a repository and a reminder scheduler.
pub struct TaskCache<R: TaskRepository, N: NotificationCenter> {
    repo: R,
    scheduler: ReminderScheduler<N>,
    clock: Box<dyn Clock>,
    policy: ReschedulePolicy,
    writer: Mutex<WriterState>,
    snapshot: RwLock<Arc<TaskSnapshot>>,
    listeners: Listeners,
}

impl<R: TaskRepository, N: NotificationCenter> TaskCache<R, N> {
    /// Creates an empty cache using the system clock and the default
    /// reschedule policy.
    pub fn new(repo: R, scheduler: ReminderScheduler<N>) -> Self {
        Self {
            repo,
            scheduler,
            clock: Box::new(SystemClock),
            policy: ReschedulePolicy::default(),
            writer: Mutex::new(WriterState::default()),
            snapshot: RwLock::new(Arc::new(TaskSnapshot::default())),
            listeners: Listeners::default(),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_reschedule_policy(mut self, policy: ReschedulePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn scheduler(&self) -> &ReminderScheduler<N> {
        &self.scheduler
    }

    pub fn reschedule_policy(&self) -> ReschedulePolicy {
        self.policy
    }

    /// Current published snapshot. Never blocks on a writer.
    pub fn snapshot(&self) -> Arc<TaskSnapshot> {
        Arc::clone(&self.snapshot.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Registers a listener called with every new snapshot.
    ///
    /// Listeners run synchronously on the mutating thread, in registration
    /// order, and must not call mutating cache operations.
    pub fn subscribe(
        &self,
        listener: impl Fn(&TaskSnapshot) + Send + Sync + 'static,
    ) -> Subscription {
        self.listeners.add(Arc::new(listener))
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.len()
    }

    /// Reloads `all_tasks` from the repository.
    ///
    /// On failure the previous list is kept, `last_error` is set, and the
    /// error is returned for the caller to inspect.
    pub fn fetch_all(&self) -> CacheResult<()> {
        let ticket = self.begin_fetch();
        let result = self.repo.get_all();
        self.finish_fetch(FetchTarget::All, ticket, result)
    }

    /// Reloads `today_tasks` from the repository. Same failure contract as
    /// [`TaskCache::fetch_all`].
    pub fn fetch_today(&self) -> CacheResult<()> {
        let ticket = self.begin_fetch();
        let result = self.repo.get_for_day(self.clock.today());
        self.finish_fetch(FetchTarget::Today, ticket, result)
    }

    /// Reads one day straight from the repository without touching the
    /// snapshot.
    pub fn tasks_for_day(&self, day: NaiveDate) -> CacheResult<Vec<Task>> {
        Ok(self.repo.get_for_day(day)?)
    }

    /// Persists a new task, adds it to the snapshot, then schedules its
    /// reminder.
    pub fn add_new_task(&self, input: &NewTask) -> CacheResult<Task> {
        let input = input.normalized()?;
        let mut writer = self.lock_writer();

        let task = self.repo.create(&input).map_err(|err| {
            warn!("event=task_add module=cache status=error error={err}");
            err
        })?;

        self.publish_mutation(&mut writer, SnapshotChange::Upsert(task.clone()));
        let scheduled = self.scheduler.schedule(&task);

        info!(
            "event=task_add module=cache status=ok task_id={} repeat={} reminder={scheduled}",
            task.id, task.repeat
        );
        Ok(task)
    }

    /// Flips `done`, persists it, and cancels the reminder when the task
    /// becomes done.
    pub fn toggle_task_done(&self, id: &str) -> CacheResult<Task> {
        let mut writer = self.lock_writer();
        let mut task = self.resolve(id)?;
        let done = !task.done;

        self.repo
            .update(id, &TaskPatch::default().with_done(done))
            .map_err(|err| {
                warn!("event=task_toggle module=cache status=error task_id={id} error={err}");
                err
            })?;
        task.done = done;

        self.publish_mutation(&mut writer, SnapshotChange::Upsert(task.clone()));

        if done {
            self.scheduler.cancel(id);
        } else if self.policy == ReschedulePolicy::Always {
            self.scheduler.schedule(&task);
        }

        info!("event=task_toggle module=cache status=ok task_id={id} done={done}");
        Ok(task)
    }

    /// Persists a partial update, merges it into the cached record, and
    /// relocates it between the lists.
    ///
    /// The reminder is rescheduled when `date` or `repeat` changed (or on
    /// every update under `ReschedulePolicy::Always`). Otherwise a task that
    /// ends up done only has its reminder cancelled.
    pub fn update_existing_task(&self, id: &str, patch: &TaskPatch) -> CacheResult<Task> {
        let patch = patch.normalized()?;
        let mut writer = self.lock_writer();

        if patch.is_empty() {
            return self.resolve(id);
        }

        self.repo.update(id, &patch).map_err(|err| {
            warn!("event=task_update module=cache status=error task_id={id} error={err}");
            err
        })?;

        let mut task = self.resolve(id)?;
        task.apply_patch(&patch);

        self.publish_mutation(&mut writer, SnapshotChange::Upsert(task.clone()));

        if patch.touches_schedule() || self.policy == ReschedulePolicy::Always {
            self.scheduler.schedule(&task);
        } else if task.done {
            // Done tasks never keep a reminder, whichever fields changed.
            self.scheduler.cancel(id);
        }

        info!(
            "event=task_update module=cache status=ok task_id={id} reschedule={}",
            patch.touches_schedule()
        );
        Ok(task)
    }

    /// Cancels the reminder, deletes the record, then drops it from both
    /// lists.
    ///
    /// If the delete fails the reminder stays cancelled and the snapshot
    /// keeps the record.
    pub fn remove_task(&self, id: &str) -> CacheResult<()> {
        let mut writer = self.lock_writer();
        self.scheduler.cancel(id);

        self.repo.delete(id).map_err(|err| {
            warn!("event=task_remove module=cache status=error task_id={id} error={err}");
            err
        })?;

        let cached = self.snapshot().contains(id);
        let change = SnapshotChange::Remove(id.to_string());
        if cached {
            self.publish_mutation(&mut writer, change);
        } else {
            // Nothing to show, but a running fetch may still bring it back.
            writer.record_mutation(&change);
        }
        info!("event=task_remove module=cache status=ok task_id={id} cached={cached}");
        Ok(())
    }

    /// Records that a reminder for `id` was delivered. Idempotent.
    pub fn mark_notified(&self, id: &str) -> CacheResult<Task> {
        let mut writer = self.lock_writer();
        let mut task = self.resolve(id)?;
        if task.notified {
            return Ok(task);
        }

        self.repo
            .update(id, &TaskPatch::default().with_notified(true))?;
        task.notified = true;

        self.publish_mutation(&mut writer, SnapshotChange::Upsert(task.clone()));
        debug!("event=task_notified module=cache status=ok task_id={id}");
        Ok(task)
    }

    /// Re-registers reminders for every cached task, for a notification
    /// facility that starts empty. Returns how many are active.
    pub fn rearm_reminders(&self) -> usize {
        let _writer = self.lock_writer();
        let snapshot = self.snapshot();
        let armed = snapshot
            .all_tasks
            .iter()
            .filter(|task| self.scheduler.schedule(task))
            .count();
        info!(
            "event=reminder_rearm module=cache status=ok tasks={} armed={armed}",
            snapshot.all_tasks.len()
        );
        armed
    }

    fn begin_fetch(&self) -> u64 {
        let mut writer = self.lock_writer();
        let ticket = writer.next_ticket();
        writer.fetches_in_flight.insert(ticket);
        self.publish(|snapshot| snapshot.loading = true);
        ticket
    }

    fn finish_fetch(
        &self,
        target: FetchTarget,
        ticket: u64,
        result: RepoResult<Vec<Task>>,
    ) -> CacheResult<()> {
        let mut writer = self.lock_writer();
        writer.fetches_in_flight.remove(&ticket);
        let still_loading = !writer.fetches_in_flight.is_empty();

        let outcome = match result {
            Ok(tasks) => {
                self.apply_fetch(&mut writer, target, ticket, tasks, still_loading);
                Ok(())
            }
            Err(err) => {
                warn!(
                    "event=task_fetch module=cache status=error target={} error={err}",
                    target.as_str()
                );
                let message = err.to_string();
                self.publish(|snapshot| {
                    snapshot.loading = still_loading;
                    snapshot.last_error = Some(message);
                });
                Err(err.into())
            }
        };
        writer.prune_journal();
        outcome
    }

    fn apply_fetch(
        &self,
        writer: &mut WriterState,
        target: FetchTarget,
        ticket: u64,
        tasks: Vec<Task>,
        still_loading: bool,
    ) {
        let applied = match target {
            FetchTarget::All => &mut writer.all_applied,
            FetchTarget::Today => &mut writer.today_applied,
        };
        if ticket < *applied {
            debug!(
                "event=task_fetch module=cache status=skip target={} reason=stale ticket={ticket} applied={}",
                target.as_str(),
                *applied
            );
            self.publish(|snapshot| snapshot.loading = still_loading);
            return;
        }
        *applied = ticket;

        let state: &WriterState = writer;
        let today = self.clock.today();
        let count = tasks.len();
        let replayed = state.changes_since(ticket).count();
        self.publish(|snapshot| {
            match target {
                FetchTarget::All => {
                    snapshot.all_tasks = tasks;
                    for change in state.changes_since(ticket) {
                        snapshot.replay_all(change);
                    }
                }
                FetchTarget::Today => {
                    snapshot.today_tasks = tasks;
                    for change in state.changes_since(ticket) {
                        snapshot.replay_today(change, today);
                    }
                }
            }
            snapshot.loading = still_loading;
            snapshot.last_error = None;
        });
        debug!(
            "event=task_fetch module=cache status=ok target={} count={count} replayed={replayed}",
            target.as_str()
        );
    }

    /// Looks a task up in the snapshot, falling back to the repository for
    /// records not fetched yet.
    fn resolve(&self, id: &str) -> CacheResult<Task> {
        if let Some(task) = self.snapshot().find(id) {
            return Ok(task.clone());
        }
        self.repo
            .get(id)?
            .ok_or_else(|| CacheError::NotFound(id.to_string()))
    }

    fn publish_mutation(&self, writer: &mut WriterState, change: SnapshotChange) {
        writer.record_mutation(&change);
        let today = self.clock.today();
        self.publish(|snapshot| change.apply(snapshot, today));
    }

    /// Swaps in a changed copy of the snapshot and notifies listeners.
    ///
    /// Callers hold the writer lock, so notifications follow mutation order.
    fn publish(&self, change: impl FnOnce(&mut TaskSnapshot)) {
        let mut next = TaskSnapshot::clone(&self.snapshot());
        change(&mut next);
        let next = Arc::new(next);
        *self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::clone(&next);
        self.listeners.notify(&next);
    }

    fn lock_writer(&self) -> MutexGuard<'_, WriterState> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
