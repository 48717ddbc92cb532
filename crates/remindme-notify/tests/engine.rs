use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use remindme_core::config::NotificationConfig;
use remindme_core::{ClassInfo, ClassType, ClockTime, GroupTag, WeeklySchedule, Weekday};
use remindme_notify::{
    BackgroundTask, ChannelSpec, HostError, HostHandle, Lifecycle, NotificationContent,
    NotificationHost, NotificationScheduler, PermissionStatus, PurposeTag, ReplanOutcome,
    ReplanScope, SettingsStore, Trigger,
};
use remindme_schedule::{HolidayCalendar, InMemoryKeyValueStore};
use tokio::sync::Notify;

const FOREIGN_TAG: &str = "streak-reminder";

#[derive(Debug, Clone)]
struct Entry {
    tag: String,
    trigger: Option<Trigger>,
}

/// In-memory host that records what it is asked to do and can be told to
/// fail or stall.
struct FakeHost {
    permission: Mutex<PermissionStatus>,
    entries: Mutex<Vec<Entry>>,
    channels: Mutex<Vec<ChannelSpec>>,
    tasks: Mutex<Vec<BackgroundTask>>,
    fail_cancel: Mutex<Option<PurposeTag>>,
    fail_schedule: Mutex<Option<PurposeTag>>,
    hold: Mutex<Option<Arc<Notify>>>,
    entered: Notify,
    cancel_calls: AtomicUsize,
    next_handle: AtomicUsize,
}

impl FakeHost {
    fn new(permission: PermissionStatus) -> Arc<Self> {
        Arc::new(Self {
            permission: Mutex::new(permission),
            entries: Mutex::new(vec![Entry {
                tag: FOREIGN_TAG.to_string(),
                trigger: None,
            }]),
            channels: Mutex::default(),
            tasks: Mutex::default(),
            fail_cancel: Mutex::default(),
            fail_schedule: Mutex::default(),
            hold: Mutex::default(),
            entered: Notify::new(),
            cancel_calls: AtomicUsize::new(0),
            next_handle: AtomicUsize::new(1),
        })
    }

    fn count(&self, tag: &str) -> usize {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.tag == tag)
            .count()
    }

    fn trigger_of(&self, tag: PurposeTag) -> Option<Trigger> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.tag == tag.as_str())
            .and_then(|e| e.trigger)
    }
}

#[async_trait]
impl NotificationHost for FakeHost {
    async fn request_permission(&self) -> Result<PermissionStatus, HostError> {
        Ok(*self.permission.lock().unwrap())
    }

    async fn register_channel(&self, spec: &ChannelSpec) -> Result<(), HostError> {
        self.channels.lock().unwrap().push(spec.clone());
        Ok(())
    }

    async fn register_background_task(&self, task: &BackgroundTask) -> Result<(), HostError> {
        self.tasks.lock().unwrap().push(task.clone());
        Ok(())
    }

    async fn schedule_at(
        &self,
        trigger: &Trigger,
        content: &NotificationContent,
    ) -> Result<HostHandle, HostError> {
        if *self.fail_schedule.lock().unwrap() == Some(content.tag) {
            return Err(HostError::new("scheduling rejected"));
        }
        self.entries.lock().unwrap().push(Entry {
            tag: content.tag.as_str().to_string(),
            trigger: Some(*trigger),
        });
        let id = self.next_handle.fetch_add(1, Ordering::SeqCst);
        Ok(HostHandle(format!("n-{id}")))
    }

    async fn cancel(&self, tag: PurposeTag) -> Result<(), HostError> {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        let hold = self.hold.lock().unwrap().clone();
        if let Some(hold) = hold {
            self.entered.notify_one();
            hold.notified().await;
        }
        if *self.fail_cancel.lock().unwrap() == Some(tag) {
            return Err(HostError::new("cancel rejected"));
        }
        self.entries
            .lock()
            .unwrap()
            .retain(|e| e.tag != tag.as_str());
        Ok(())
    }

    async fn cancel_all(&self) -> Result<(), HostError> {
        self.entries.lock().unwrap().clear();
        Ok(())
    }
}

fn class(start: (u8, u8), end: (u8, u8), course: &str) -> ClassInfo {
    ClassInfo {
        period: start.0 as u32,
        start_time: ClockTime::saturating(start.0, start.1),
        end_time: ClockTime::saturating(end.0, end.1),
        course_name: course.to_string(),
        instructor: "Dr. Karim".to_string(),
        building: "AB1".to_string(),
        room: "301".to_string(),
        group: GroupTag::all(),
        class_type: ClassType::Lecture,
    }
}

fn week() -> WeeklySchedule {
    WeeklySchedule::from_days([
        (Weekday::Monday, vec![class((9, 0), (10, 0), "Math")]),
        (Weekday::Tuesday, vec![class((11, 0), (12, 0), "Physics")]),
    ])
}

// 2026-10-12 is a Monday.
fn monday_at(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 10, 12)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

fn scheduler(host: Arc<FakeHost>, kv: Arc<InMemoryKeyValueStore>) -> Arc<NotificationScheduler> {
    Arc::new(
        NotificationScheduler::new(host, kv, &NotificationConfig::default())
            .with_now_provider(Arc::new(|| monday_at(7, 0))),
    )
}

async fn ready_with_week() -> (Arc<FakeHost>, Arc<InMemoryKeyValueStore>, Arc<NotificationScheduler>) {
    let host = FakeHost::new(PermissionStatus::Granted);
    let kv = Arc::new(InMemoryKeyValueStore::new());
    let engine = scheduler(host.clone(), kv.clone());
    assert_eq!(engine.initialize().await, Lifecycle::Ready);
    engine.update_schedule(week(), HolidayCalendar::default()).await;
    (host, kv, engine)
}

#[tokio::test]
async fn initialize_registers_channel_and_background_task() {
    let (host, _, engine) = ready_with_week().await;

    let channels = host.channels.lock().unwrap().clone();
    assert_eq!(channels.len(), 1);
    assert_eq!(channels[0].id, "class-alarm");

    let tasks = host.tasks.lock().unwrap().clone();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].interval, Duration::from_secs(900));

    assert_eq!(engine.lifecycle(), Lifecycle::Ready);
}

#[tokio::test]
async fn replanning_twice_keeps_one_entry_per_tag() {
    let (host, _, engine) = ready_with_week().await;

    engine.replan(ReplanScope::all()).await;
    engine.replan(ReplanScope::all()).await;

    assert_eq!(host.count(PurposeTag::EveningReminder.as_str()), 1);
    assert_eq!(host.count(PurposeTag::PreClassAlarm.as_str()), 1);
    assert_eq!(host.count(FOREIGN_TAG), 1);
    assert_eq!(
        host.trigger_of(PurposeTag::PreClassAlarm),
        Some(Trigger::At { at: monday_at(8, 0) })
    );
}

#[tokio::test]
async fn toggles_gate_their_own_category() {
    let (host, kv, engine) = ready_with_week().await;

    engine.toggle_alarms(false).await.unwrap();
    assert_eq!(host.count(PurposeTag::EveningReminder.as_str()), 1);
    assert_eq!(host.count(PurposeTag::PreClassAlarm.as_str()), 0);

    engine.toggle_notifications(false).await.unwrap();
    assert_eq!(host.count(PurposeTag::EveningReminder.as_str()), 0);

    engine.toggle_alarms(true).await.unwrap();
    assert_eq!(host.count(PurposeTag::PreClassAlarm.as_str()), 1);
    assert_eq!(host.count(PurposeTag::EveningReminder.as_str()), 0);

    let stored = SettingsStore::new(kv).load().unwrap();
    assert!(!stored.notifications_enabled);
    assert!(stored.alarms_enabled);
}

#[tokio::test]
async fn settings_survive_a_restart() {
    let (_, kv, engine) = ready_with_week().await;
    engine.toggle_alarms(false).await.unwrap();
    engine.shutdown();

    let host = FakeHost::new(PermissionStatus::Granted);
    let restarted = scheduler(host.clone(), kv);
    restarted.initialize().await;
    restarted
        .update_schedule(week(), HolidayCalendar::default())
        .await;

    let status = restarted.status();
    assert!(!status.settings.alarms_enabled);
    assert!(status.settings.last_scheduled_at.is_some());
    assert_eq!(host.count(PurposeTag::PreClassAlarm.as_str()), 0);
}

#[tokio::test]
async fn denied_permission_leaves_the_scheduler_inert() {
    let host = FakeHost::new(PermissionStatus::Denied);
    let engine = scheduler(host.clone(), Arc::new(InMemoryKeyValueStore::new()));

    assert_eq!(engine.initialize().await, Lifecycle::Inert);
    let outcome = engine.update_schedule(week(), HolidayCalendar::default()).await;
    assert_eq!(outcome, ReplanOutcome::Skipped);
    assert_eq!(host.count(PurposeTag::EveningReminder.as_str()), 0);
    assert!(host.tasks.lock().unwrap().is_empty());

    assert_eq!(engine.refresh_permission().await, Lifecycle::Inert);

    *host.permission.lock().unwrap() = PermissionStatus::Granted;
    assert_eq!(engine.refresh_permission().await, Lifecycle::Ready);
    assert_eq!(host.count(PurposeTag::EveningReminder.as_str()), 1);
    assert_eq!(host.count(PurposeTag::PreClassAlarm.as_str()), 1);
    assert_eq!(host.tasks.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn failed_cancel_skips_recreating_that_tag() {
    let (host, _, engine) = ready_with_week().await;
    *host.fail_cancel.lock().unwrap() = Some(PurposeTag::PreClassAlarm);

    let outcome = engine.replan(ReplanScope::all()).await;

    assert_eq!(
        outcome,
        ReplanOutcome::Completed {
            scheduled: 1,
            failed: 0
        }
    );
    assert_eq!(host.count(PurposeTag::PreClassAlarm.as_str()), 1);
    assert_eq!(host.count(PurposeTag::EveningReminder.as_str()), 1);
    assert_eq!(engine.lifecycle(), Lifecycle::Ready);
}

#[tokio::test]
async fn failed_schedule_is_skipped_not_fatal() {
    let (host, _, engine) = ready_with_week().await;
    *host.fail_schedule.lock().unwrap() = Some(PurposeTag::EveningReminder);

    let outcome = engine.replan(ReplanScope::all()).await;

    assert_eq!(
        outcome,
        ReplanOutcome::Completed {
            scheduled: 1,
            failed: 1
        }
    );
    assert_eq!(host.count(PurposeTag::EveningReminder.as_str()), 0);
    assert_eq!(host.count(PurposeTag::PreClassAlarm.as_str()), 1);
}

#[tokio::test]
async fn concurrent_requests_coalesce_into_one_follow_up_pass() {
    let (host, _, engine) = ready_with_week().await;
    let release = Arc::new(Notify::new());
    *host.hold.lock().unwrap() = Some(release.clone());
    let before = host.cancel_calls.load(Ordering::SeqCst);

    let first = tokio::spawn({
        let engine = engine.clone();
        async move { engine.replan(ReplanScope::all()).await }
    });
    host.entered.notified().await;
    assert_eq!(engine.lifecycle(), Lifecycle::Replanning);

    assert_eq!(
        engine.replan(ReplanScope::only(PurposeTag::PreClassAlarm)).await,
        ReplanOutcome::Coalesced
    );
    assert_eq!(
        engine.replan(ReplanScope::only(PurposeTag::EveningReminder)).await,
        ReplanOutcome::Coalesced
    );

    *host.hold.lock().unwrap() = None;
    release.notify_one();
    let outcome = first.await.unwrap();

    assert!(matches!(outcome, ReplanOutcome::Completed { .. }));
    // One pass for the original request plus one merged follow-up, two tags each.
    assert_eq!(host.cancel_calls.load(Ordering::SeqCst) - before, 4);
    assert_eq!(host.count(PurposeTag::EveningReminder.as_str()), 1);
    assert_eq!(host.count(PurposeTag::PreClassAlarm.as_str()), 1);
    assert_eq!(engine.lifecycle(), Lifecycle::Ready);
}

#[tokio::test]
async fn dropped_replan_releases_the_gate() {
    let (host, _, engine) = ready_with_week().await;
    let release = Arc::new(Notify::new());
    *host.hold.lock().unwrap() = Some(release.clone());

    let interrupted = tokio::time::timeout(
        Duration::from_millis(50),
        engine.replan(ReplanScope::all()),
    )
    .await;
    assert!(interrupted.is_err());
    assert_eq!(engine.lifecycle(), Lifecycle::Ready);

    *host.hold.lock().unwrap() = None;
    release.notify_one();

    // The interrupted full pass is folded into the next request.
    assert_eq!(
        engine.replan(ReplanScope::only(PurposeTag::PreClassAlarm)).await,
        ReplanOutcome::Completed {
            scheduled: 2,
            failed: 0
        }
    );
    assert!(matches!(
        engine.background_tick().await,
        ReplanOutcome::Completed { .. }
    ));

    engine.toggle_alarms(false).await.unwrap();
    assert_eq!(host.count(PurposeTag::PreClassAlarm.as_str()), 0);
    assert_eq!(host.count(PurposeTag::EveningReminder.as_str()), 1);
    assert_eq!(engine.lifecycle(), Lifecycle::Ready);
}

#[tokio::test]
async fn status_reports_next_fire_times() {
    let (_, _, engine) = ready_with_week().await;
    let status = engine.status();

    assert_eq!(status.lifecycle, Lifecycle::Ready);
    assert_eq!(
        status.next_fires,
        vec![
            (PurposeTag::EveningReminder, monday_at(21, 0)),
            (PurposeTag::PreClassAlarm, monday_at(8, 0)),
        ]
    );
    assert_eq!(status.settings.last_scheduled_at, Some(monday_at(7, 0)));
}

#[tokio::test]
async fn run_ticks_until_shutdown() {
    let (host, _, engine) = ready_with_week().await;
    let before = host.cancel_calls.load(Ordering::SeqCst);

    let runner = tokio::spawn({
        let engine = engine.clone();
        async move { engine.run(Duration::from_millis(20)).await }
    });
    tokio::time::sleep(Duration::from_millis(90)).await;
    engine.shutdown();

    tokio::time::timeout(Duration::from_secs(1), runner)
        .await
        .expect("run loop should stop after shutdown")
        .unwrap();
    assert!(host.cancel_calls.load(Ordering::SeqCst) > before);
    assert_eq!(engine.lifecycle(), Lifecycle::ShutDown);
    assert_eq!(
        engine.replan(ReplanScope::all()).await,
        ReplanOutcome::Skipped
    );
}

#[tokio::test]
async fn foreign_entries_survive_everything_but_cancel_all() {
    let (host, _, engine) = ready_with_week().await;
    engine.toggle_notifications(false).await.unwrap();
    engine.toggle_alarms(false).await.unwrap();
    assert_eq!(host.count(FOREIGN_TAG), 1);

    host.cancel_all().await.unwrap();
    assert_eq!(host.count(FOREIGN_TAG), 0);
}
