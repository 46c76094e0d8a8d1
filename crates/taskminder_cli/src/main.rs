//! CLI bootstrap binary.
//!
//! # Responsibility
//! - Wire configuration, storage, scheduler and cache the way an app shell
//!   would, then print a one-shot summary of the task snapshot.

use chrono::Local;
use std::process::ExitCode;
use taskminder_core::{
    core_version, init_logging, reminder_identifier, CoreConfig, DatabaseLocation,
    InMemoryNotificationCenter, NotificationPermission, ReminderScheduler, SqliteTaskRepository,
    TaskCache, TaskRepository,
};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("taskminder: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = CoreConfig::from_env()?;
    if let Some(log_dir) = &config.log_dir {
        init_logging(&config.log_level, log_dir)?;
    }

    let repo = match &config.database {
        DatabaseLocation::File(path) => SqliteTaskRepository::open(path)?,
        DatabaseLocation::InMemory => SqliteTaskRepository::open_in_memory()?,
    };
    repo.init()?;

    let permission = if config.notifications_enabled {
        NotificationPermission::Granted
    } else {
        NotificationPermission::Denied
    };
    let scheduler = ReminderScheduler::new(InMemoryNotificationCenter::new(), permission);
    let cache = TaskCache::new(repo, scheduler).with_reschedule_policy(config.reschedule_policy);

    // Fetch failures are non-fatal; the snapshot records them.
    for result in [cache.fetch_all(), cache.fetch_today()] {
        if let Err(err) = result {
            eprintln!("taskminder: fetch failed: {err}");
        }
    }

    // The in-process center starts empty every run.
    let armed = cache.rearm_reminders();
    let snapshot = cache.snapshot();

    println!("taskminder_core version={}", core_version());
    println!(
        "tasks all={} today={} done={} reminders={armed}",
        snapshot.all_tasks.len(),
        snapshot.today_tasks.len(),
        snapshot.completed().len()
    );

    let now = Local::now().naive_local();
    for task in &snapshot.today_tasks {
        let next = cache
            .scheduler()
            .center()
            .get(&reminder_identifier(&task.id))
            .and_then(|request| request.trigger.next_fire_after(now));
        match next {
            Some(at) => println!("- {} [{}] next={at}", task.id, task.repeat),
            None => println!("- {} [{}]", task.id, task.repeat),
        }
    }
    Ok(())
}
