use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::NaiveDateTime;
use remindme_core::config::NotificationConfig;
use remindme_core::WeeklySchedule;
use remindme_schedule::{HolidayCalendar, KeyValueStore};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::host::NotificationHost;
use crate::planner::{plan, PlannerConfig};
use crate::schedule::compute_next_fire;
use crate::settings::SettingsStore;
use crate::types::{
    BackgroundTask, ChannelSpec, NotificationSettings, PermissionStatus, PurposeTag, ReplanScope,
    BACKGROUND_TASK_NAME,
};

pub type NowProvider = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    Uninitialized,
    Initializing,
    Ready,
    /// A replanning pass is in flight.
    Replanning,
    /// Permission was denied; nothing is scheduled until it is granted.
    Inert,
    ShutDown,
}

impl std::fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Lifecycle::Uninitialized => "uninitialized",
            Lifecycle::Initializing => "initializing",
            Lifecycle::Ready => "ready",
            Lifecycle::Replanning => "replanning",
            Lifecycle::Inert => "inert",
            Lifecycle::ShutDown => "shut_down",
        };
        write!(f, "{s}")
    }
}

/// Result of a [`NotificationScheduler::replan`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplanOutcome {
    /// This caller ran the pass (and any follow-up pass it absorbed).
    /// Counts are for the last pass run.
    Completed { scheduled: usize, failed: usize },
    /// Another pass was in flight; this request was folded into its
    /// follow-up pass.
    Coalesced,
    /// The scheduler is not ready (uninitialized, inert or shut down).
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub lifecycle: Lifecycle,
    pub settings: NotificationSettings,
    /// Next local fire time per tag, as last planned.
    pub next_fires: Vec<(PurposeTag, NaiveDateTime)>,
}

/// Immutable inputs a pass plans from. Replaced wholesale on every update.
#[derive(Debug, Default)]
struct Snapshot {
    schedule: WeeklySchedule,
    holidays: HolidayCalendar,
}

struct State {
    lifecycle: Lifecycle,
    settings: NotificationSettings,
    snapshot: Arc<Snapshot>,
}

#[derive(Default)]
struct Gate {
    running: bool,
    pending: Option<ReplanScope>,
}

/// Keeps the host's reminder and alarm entries in step with the schedule,
/// the holiday calendar and the user's toggles.
///
/// All replanning goes through one critical section: a request that arrives
/// while a pass is running is merged into a single follow-up pass instead of
/// running concurrently.
pub struct NotificationScheduler {
    host: Arc<dyn NotificationHost>,
    settings_store: SettingsStore,
    planner: PlannerConfig,
    channel: ChannelSpec,
    background_interval: Duration,
    now_provider: NowProvider,
    state: Mutex<State>,
    gate: Mutex<Gate>,
    shutdown_tx: watch::Sender<bool>,
}

impl NotificationScheduler {
    pub fn new(
        host: Arc<dyn NotificationHost>,
        kv: Arc<dyn KeyValueStore>,
        config: &NotificationConfig,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            host,
            settings_store: SettingsStore::new(kv),
            planner: PlannerConfig::from(config),
            channel: ChannelSpec::class_alarm(config.channel_id.clone()),
            background_interval: config.background_interval(),
            now_provider: Arc::new(|| chrono::Local::now().naive_local()),
            state: Mutex::new(State {
                lifecycle: Lifecycle::Uninitialized,
                settings: NotificationSettings::default(),
                snapshot: Arc::new(Snapshot::default()),
            }),
            gate: Mutex::new(Gate::default()),
            shutdown_tx,
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    /// Load settings, register the channel, ask for permission and register
    /// the background task. Host failures are logged; a denied permission
    /// leaves the scheduler [`Lifecycle::Inert`].
    pub async fn initialize(&self) -> Lifecycle {
        {
            let mut state = lock(&self.state);
            if state.lifecycle != Lifecycle::Uninitialized {
                return state.lifecycle;
            }
            state.lifecycle = Lifecycle::Initializing;
            state.settings = match self.settings_store.load() {
                Ok(settings) => settings,
                Err(e) => {
                    warn!(error = %e, "failed to load notification settings, using defaults");
                    NotificationSettings::default()
                }
            };
        }

        if let Err(e) = self.host.register_channel(&self.channel).await {
            warn!(channel = %self.channel.id, error = %e, "channel registration failed");
        }

        if !self.permission_granted().await {
            self.set_lifecycle(Lifecycle::Inert);
            warn!("notification permission denied, scheduler is inert");
            return Lifecycle::Inert;
        }

        self.become_ready().await
    }

    /// Ask again after a denial. Returns the lifecycle afterwards.
    pub async fn refresh_permission(&self) -> Lifecycle {
        if self.lifecycle() != Lifecycle::Inert {
            return self.lifecycle();
        }
        if !self.permission_granted().await {
            debug!("notification permission still denied");
            return Lifecycle::Inert;
        }
        info!("notification permission granted");
        self.become_ready().await
    }

    /// Swap in a new schedule and holiday calendar and replan everything.
    pub async fn update_schedule(
        &self,
        schedule: WeeklySchedule,
        holidays: HolidayCalendar,
    ) -> ReplanOutcome {
        {
            let mut state = lock(&self.state);
            state.snapshot = Arc::new(Snapshot { schedule, holidays });
        }
        self.replan(ReplanScope::all()).await
    }

    /// Cancel and re-create the owned entries in `scope`.
    ///
    /// Dropping the returned future mid-pass releases the gate and re-queues
    /// the interrupted scope for the next request.
    pub async fn replan(&self, scope: ReplanScope) -> ReplanOutcome {
        let mut scope = {
            let mut gate = lock(&self.gate);
            if gate.running {
                gate.pending = Some(match gate.pending.take() {
                    Some(pending) => pending.merge(scope),
                    None => scope,
                });
                debug!("replan coalesced into follow-up pass");
                return ReplanOutcome::Coalesced;
            }
            gate.running = true;
            match gate.pending.take() {
                Some(interrupted) => interrupted.merge(scope),
                None => scope,
            }
        };

        let mut guard = PassGuard {
            scheduler: self,
            in_flight: Some(scope.clone()),
        };
        loop {
            let outcome = self.replan_pass(&scope).await;
            let mut gate = lock(&self.gate);
            match gate.pending.take() {
                Some(next) => {
                    guard.in_flight = Some(next.clone());
                    scope = next;
                }
                None => {
                    gate.running = false;
                    guard.in_flight = None;
                    return outcome;
                }
            }
        }
    }

    pub async fn toggle_notifications(&self, enabled: bool) -> Result<ReplanOutcome> {
        self.update_settings(|s| s.notifications_enabled = enabled)?;
        info!(enabled, "evening reminders toggled");
        Ok(self.replan(ReplanScope::only(PurposeTag::EveningReminder)).await)
    }

    pub async fn toggle_alarms(&self, enabled: bool) -> Result<ReplanOutcome> {
        self.update_settings(|s| s.alarms_enabled = enabled)?;
        info!(enabled, "pre-class alarms toggled");
        Ok(self.replan(ReplanScope::only(PurposeTag::PreClassAlarm)).await)
    }

    /// Periodic wake-up: replan against the current time so the reminder
    /// and alarm track the calendar day.
    pub async fn background_tick(&self) -> ReplanOutcome {
        debug!("background tick");
        self.replan(ReplanScope::all()).await
    }

    /// Drive [`Self::background_tick`] every `interval` until [`Self::shutdown`].
    pub async fn run(&self, interval: Duration) {
        let mut shutdown = self.shutdown_tx.subscribe();
        if *shutdown.borrow() {
            return;
        }
        info!(interval_secs = interval.as_secs(), "notification scheduler started");

        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let ReplanOutcome::Completed { failed, .. } = self.background_tick().await {
                        if failed > 0 {
                            error!(failed, "background replan left entries unscheduled");
                        }
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("notification scheduler shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// Stop the tick loop and refuse further passes. Entries already handed
    /// to the host stay scheduled.
    pub fn shutdown(&self) {
        self.set_lifecycle(Lifecycle::ShutDown);
        self.shutdown_tx.send_replace(true);
    }

    pub fn background_interval(&self) -> Duration {
        self.background_interval
    }

    pub fn lifecycle(&self) -> Lifecycle {
        lock(&self.state).lifecycle
    }

    pub fn status(&self) -> SchedulerStatus {
        let state = lock(&self.state);
        let now = (self.now_provider)();
        let next_fires = plan(
            &state.settings,
            &state.snapshot.schedule,
            &state.snapshot.holidays,
            now,
            &self.planner,
        )
        .into_iter()
        .filter_map(|r| compute_next_fire(&r.trigger, now).map(|at| (r.content.tag, at)))
        .collect();
        SchedulerStatus {
            lifecycle: state.lifecycle,
            settings: state.settings.clone(),
            next_fires,
        }
    }

    // --- private helpers ---------------------------------------------------

    async fn permission_granted(&self) -> bool {
        match self.host.request_permission().await {
            Ok(PermissionStatus::Granted) => true,
            Ok(PermissionStatus::Denied) => false,
            Err(e) => {
                warn!(error = %e, "permission request failed");
                false
            }
        }
    }

    async fn become_ready(&self) -> Lifecycle {
        let task = BackgroundTask {
            name: BACKGROUND_TASK_NAME.to_string(),
            interval: self.background_interval,
            start_on_boot: true,
        };
        if let Err(e) = self.host.register_background_task(&task).await {
            warn!(task = %task.name, error = %e, "background task registration failed");
        }

        {
            let mut state = lock(&self.state);
            if state.lifecycle == Lifecycle::ShutDown {
                return Lifecycle::ShutDown;
            }
            state.lifecycle = Lifecycle::Ready;
        }
        info!("notification scheduler ready");
        self.replan(ReplanScope::all()).await;
        self.lifecycle()
    }

    /// Persist first, then commit to memory, so a failed write leaves the
    /// running settings unchanged.
    fn update_settings(&self, mutate: impl FnOnce(&mut NotificationSettings)) -> Result<()> {
        let mut state = lock(&self.state);
        let mut next = state.settings.clone();
        mutate(&mut next);
        self.settings_store.save(&next)?;
        state.settings = next;
        Ok(())
    }

    fn set_lifecycle(&self, lifecycle: Lifecycle) {
        lock(&self.state).lifecycle = lifecycle;
    }

    async fn replan_pass(&self, scope: &ReplanScope) -> ReplanOutcome {
        let (settings, snapshot) = {
            let mut state = lock(&self.state);
            if state.lifecycle != Lifecycle::Ready {
                debug!(lifecycle = %state.lifecycle, "replan skipped");
                return ReplanOutcome::Skipped;
            }
            state.lifecycle = Lifecycle::Replanning;
            (state.settings.clone(), state.snapshot.clone())
        };
        let now = (self.now_provider)();

        let mut uncancelled = Vec::new();
        for tag in scope.tags() {
            if let Err(e) = self.host.cancel(tag).await {
                warn!(%tag, error = %e, "cancel failed, leaving tag as is");
                uncancelled.push(tag);
            }
        }

        let requests = plan(
            &settings,
            &snapshot.schedule,
            &snapshot.holidays,
            now,
            &self.planner,
        );

        let mut scheduled = 0;
        let mut failed = 0;
        for request in requests
            .iter()
            .filter(|r| scope.contains(r.content.tag) && !uncancelled.contains(&r.content.tag))
        {
            match self.host.schedule_at(&request.trigger, &request.content).await {
                Ok(handle) => {
                    info!(tag = %request.content.tag, %handle, trigger = ?request.trigger, "notification scheduled");
                    scheduled += 1;
                }
                Err(e) => {
                    warn!(tag = %request.content.tag, error = %e, "scheduling failed");
                    failed += 1;
                }
            }
        }

        let to_persist = {
            let mut state = lock(&self.state);
            if state.lifecycle == Lifecycle::Replanning {
                state.lifecycle = Lifecycle::Ready;
            }
            if scheduled > 0 {
                state.settings.last_scheduled_at = Some(now);
                Some(state.settings.clone())
            } else {
                None
            }
        };
        if let Some(settings) = to_persist {
            if let Err(e) = self.settings_store.save(&settings) {
                warn!(error = %e, "failed to persist last scheduled time");
            }
        }

        debug!(scheduled, failed, "replan pass complete");
        ReplanOutcome::Completed { scheduled, failed }
    }
}

/// Holds the replan gate for one caller. `in_flight` is cleared once the
/// caller releases the gate itself; if the caller's future is dropped first,
/// the gate is released here and the unfinished scope left pending.
struct PassGuard<'a> {
    scheduler: &'a NotificationScheduler,
    in_flight: Option<ReplanScope>,
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        let Some(scope) = self.in_flight.take() else {
            return;
        };
        {
            let mut gate = lock(&self.scheduler.gate);
            gate.running = false;
            gate.pending = Some(match gate.pending.take() {
                Some(pending) => pending.merge(scope),
                None => scope,
            });
        }
        let mut state = lock(&self.scheduler.state);
        if state.lifecycle == Lifecycle::Replanning {
            state.lifecycle = Lifecycle::Ready;
        }
        warn!("replan interrupted, scope left for the next pass");
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
