use serde_json::json;
use taskminder_core::{
    reminder_identifier, route_notification_response, InMemoryNotificationCenter,
    NotificationCenter, NotificationError, NotificationPermission, ReminderRequest,
    ReminderScheduler, ReminderTrigger, Repeat, ScheduleOutcome, SchedulingError, Task,
};

fn task(id: &str, date: &str, repeat: Repeat) -> Task {
    Task {
        id: id.to_string(),
        title: format!("title of {id}"),
        description: None,
        date: date.to_string(),
        repeat,
        done: false,
        notified: false,
        created_at: "2026-01-01T00:00:00.000Z".to_string(),
    }
}

fn granted() -> ReminderScheduler<InMemoryNotificationCenter> {
    ReminderScheduler::new(
        InMemoryNotificationCenter::new(),
        NotificationPermission::Granted,
    )
}

struct RejectingCenter;

impl NotificationCenter for RejectingCenter {
    fn register(&self, _request: ReminderRequest) -> Result<(), NotificationError> {
        Err(NotificationError::Rejected("quota exceeded".to_string()))
    }

    fn cancel(&self, identifier: &str) -> Result<(), NotificationError> {
        Err(NotificationError::NotFound(identifier.to_string()))
    }
}

#[test]
fn daily_task_gets_daily_trigger_at_local_time() {
    let scheduler = granted();
    let daily = task("d1", "2026-01-10T07:05", Repeat::Daily);

    assert!(scheduler.schedule(&daily));

    let request = scheduler
        .center()
        .get(&reminder_identifier("d1"))
        .unwrap();
    assert_eq!(request.trigger, ReminderTrigger::Daily { hour: 7, minute: 5 });
}

#[test]
fn weekly_task_uses_sunday_based_weekday() {
    let scheduler = granted();
    // 2026-01-10 is a Saturday.
    let weekly = task("w1", "2026-01-10T14:30", Repeat::Weekly);

    assert_eq!(
        scheduler.try_schedule(&weekly).unwrap(),
        ScheduleOutcome::Scheduled(ReminderTrigger::Weekly {
            weekday: 7,
            hour: 14,
            minute: 30
        })
    );
}

#[test]
fn monthly_task_uses_day_of_month() {
    let scheduler = granted();
    let monthly = task("m1", "2030-06-15T09:00", Repeat::Monthly);

    assert!(scheduler.schedule(&monthly));
    assert_eq!(
        scheduler.center().get("task-reminder-m1").unwrap().trigger,
        ReminderTrigger::Monthly {
            day: 15,
            hour: 9,
            minute: 0
        }
    );
}

#[test]
fn non_recurring_and_done_tasks_are_not_scheduled() {
    let scheduler = granted();
    let once = task("once", "2026-01-10T08:00", Repeat::None);
    let mut finished = task("finished", "2026-01-10T08:00", Repeat::Daily);
    finished.done = true;

    assert!(!scheduler.schedule(&once));
    assert_eq!(
        scheduler.try_schedule(&finished).unwrap(),
        ScheduleOutcome::NotEligible
    );
    assert!(scheduler.center().is_empty());
}

#[test]
fn repeated_scheduling_keeps_one_registration_per_task() {
    let scheduler = granted();
    let mut daily = task("d1", "2026-01-10T07:00", Repeat::Daily);

    assert!(scheduler.schedule(&daily));
    daily.date = "2026-01-10T08:15".to_string();
    assert!(scheduler.schedule(&daily));
    assert!(scheduler.schedule(&daily));

    assert_eq!(scheduler.center().len(), 1);
    assert_eq!(
        scheduler.center().pending()[0].trigger,
        ReminderTrigger::Daily {
            hour: 8,
            minute: 15
        }
    );
}

#[test]
fn scheduling_an_ineligible_task_cancels_its_previous_reminder() {
    let scheduler = granted();
    let mut weekly = task("w1", "2026-01-10T14:30", Repeat::Weekly);
    assert!(scheduler.schedule(&weekly));

    weekly.repeat = Repeat::None;
    assert!(!scheduler.schedule(&weekly));
    assert!(!scheduler.center().is_pending(&reminder_identifier("w1")));

    weekly.repeat = Repeat::Weekly;
    weekly.done = true;
    assert!(!scheduler.schedule(&weekly));
    assert!(scheduler.center().is_empty());
}

#[test]
fn unparsable_date_is_reported_and_registers_nothing() {
    let scheduler = granted();
    let broken = task("b1", "someday", Repeat::Daily);

    assert!(!scheduler.schedule(&broken));
    assert_eq!(
        scheduler.try_schedule(&broken).unwrap_err(),
        SchedulingError::InvalidDate {
            task_id: "b1".to_string(),
            value: "someday".to_string()
        }
    );
    assert!(scheduler.center().is_empty());
}

#[test]
fn denied_permission_registers_nothing() {
    let scheduler = ReminderScheduler::new(
        InMemoryNotificationCenter::new(),
        NotificationPermission::Denied,
    );
    let daily = task("d1", "2026-01-10T07:00", Repeat::Daily);

    assert!(!scheduler.schedule(&daily));
    assert_eq!(
        scheduler.try_schedule(&daily).unwrap_err(),
        SchedulingError::PermissionDenied
    );
    assert!(scheduler.center().is_empty());
    assert_eq!(scheduler.permission(), NotificationPermission::Denied);
}

#[test]
fn cancel_is_idempotent() {
    let scheduler = granted();
    assert!(scheduler.schedule(&task("d1", "2026-01-10T07:00", Repeat::Daily)));

    scheduler.cancel("d1");
    scheduler.cancel("d1");
    scheduler.cancel("never-scheduled");

    assert!(scheduler.center().is_empty());
}

#[test]
fn rejecting_backend_surfaces_as_backend_error() {
    let scheduler = ReminderScheduler::new(RejectingCenter, NotificationPermission::Granted);
    let daily = task("d1", "2026-01-10T07:00", Repeat::Daily);

    assert!(!scheduler.schedule(&daily));
    assert!(matches!(
        scheduler.try_schedule(&daily).unwrap_err(),
        SchedulingError::Backend(NotificationError::Rejected(_))
    ));
}

#[test]
fn registration_content_describes_the_task() {
    let scheduler = granted();
    let weekly = task("w1", "2026-01-10T14:30", Repeat::Weekly);
    assert!(scheduler.schedule(&weekly));

    let request = scheduler.center().get("task-reminder-w1").unwrap();
    assert_eq!(request.identifier, "task-reminder-w1");
    assert_eq!(request.content.title, "Task reminder");
    assert_eq!(request.content.body, "title of w1");
    assert_eq!(request.content.subtitle.as_deref(), Some("(weekly)"));
    assert_eq!(request.content.payload.task_id, "w1");
    assert_eq!(request.content.payload.route, "task");
    assert_eq!(request.content.payload.params.id, "w1");
}

#[test]
fn delivered_reminder_routes_back_to_its_task() {
    let scheduler = granted();
    assert!(scheduler.schedule(&task("d1", "2026-01-10T07:00", Repeat::Daily)));

    let data = scheduler.center().deliver("task-reminder-d1").unwrap();
    assert_eq!(
        data,
        json!({ "taskId": "d1", "route": "task", "params": { "id": "d1" } })
    );
    assert_eq!(route_notification_response(&data), Some("d1".to_string()));

    // Recurring registrations stay pending after delivery.
    assert!(scheduler.center().is_pending("task-reminder-d1"));
    assert!(scheduler.center().deliver("task-reminder-unknown").is_none());
}
