use std::sync::Arc;

use chrono::NaiveDateTime;
use remindme_core::config::RemindmeConfig;
use remindme_core::{GroupTag, Identity, WeeklySchedule};
use remindme_notify::{
    compute_next_fire, plan, NotificationHost, NotificationScheduler, PlannerConfig,
    SettingsStore,
};
use remindme_schedule::time::format_window;
use remindme_schedule::{
    today_view, week_view, DayView, HolidayCalendar, HttpScheduleSource, KeyValueStore,
    ScheduleStore, ScheduleSync,
};
use tracing::{error, info, warn};

use crate::console::ConsoleHost;

pub struct App {
    config: RemindmeConfig,
    kv: Arc<dyn KeyValueStore>,
    store: Arc<ScheduleStore>,
    sync: Arc<ScheduleSync>,
}

impl App {
    pub fn new(config: RemindmeConfig, kv: Arc<dyn KeyValueStore>) -> anyhow::Result<Self> {
        let store = Arc::new(ScheduleStore::new(kv.clone()));
        let source = Arc::new(HttpScheduleSource::new(&config.api)?);
        let sync = Arc::new(ScheduleSync::new(source, store.clone()));
        Ok(Self {
            config,
            kv,
            store,
            sync,
        })
    }

    pub async fn list_ids(&self) -> anyhow::Result<()> {
        for id in self.sync.available_ids().await? {
            println!("{id}");
        }
        Ok(())
    }

    pub async fn select(&self, id: &str, group: &str) -> anyhow::Result<()> {
        let identity = Identity::parse(id, GroupTag::new(group))?;
        let schedule = self.sync.select(&identity).await?;
        let holidays = self.sync.refresh_holidays().await?;
        if holidays.sync_failed {
            println!("Holiday list could not be refreshed; using cached copy.");
        }
        println!(
            "Selected {} ({} classes across {} days)",
            identity.display_label(),
            schedule.class_count(),
            schedule.days().filter(|(_, c)| !c.is_empty()).count()
        );
        Ok(())
    }

    pub async fn sync(&self) -> anyhow::Result<()> {
        let report = self.sync.refresh().await?;
        let holidays = self.sync.refresh_holidays().await?;

        match (&report.schedule, report.sync_failed, report.changed) {
            (None, _, _) => println!("No schedule selected. Run `remindme select <ID>` first."),
            (Some(_), true, _) => println!("Offline: showing the cached schedule."),
            (Some(_), false, true) => println!("Schedule updated."),
            (Some(_), false, false) => println!("Schedule is up to date."),
        }
        println!(
            "{} holidays{}",
            holidays.calendar.len(),
            if holidays.sync_failed { " (cached)" } else { "" }
        );
        Ok(())
    }

    pub fn today(&self) -> anyhow::Result<()> {
        let Some((identity, schedule)) = self.selection()? else {
            return Ok(());
        };
        let holidays = self.store.holidays()?;
        let now = local_now();

        println!("{}", identity.display_label());
        println!("{}", now.format("%A, %d %B %Y"));
        print_day(&today_view(&schedule, &holidays, now));
        Ok(())
    }

    pub fn week(&self) -> anyhow::Result<()> {
        let Some((identity, schedule)) = self.selection()? else {
            return Ok(());
        };
        let holidays = self.store.holidays()?;

        println!("{}", identity.display_label());
        for entry in week_view(&schedule, &holidays, local_now()) {
            println!();
            println!("{} {}", entry.day, entry.date.format("%d %b"));
            print_day(&entry.view);
        }
        Ok(())
    }

    pub fn status(&self) -> anyhow::Result<()> {
        match self.store.identity()? {
            Some(identity) => println!("Schedule:      {}", identity.display_label()),
            None => println!("Schedule:      none selected"),
        }

        let settings = SettingsStore::new(self.kv.clone()).load()?;
        println!("Reminders:     {}", on_off(settings.notifications_enabled));
        println!("Alarms:        {}", on_off(settings.alarms_enabled));
        match settings.last_scheduled_at {
            Some(at) => println!("Last planned:  {}", at.format("%Y-%m-%d %H:%M")),
            None => println!("Last planned:  never"),
        }

        let schedule = self.store.active_schedule()?.unwrap_or_default();
        let holidays = self.store.holidays()?;
        let now = local_now();
        let planner = PlannerConfig::from(&self.config.notifications);
        for request in plan(&settings, &schedule, &holidays, now, &planner) {
            if let Some(at) = compute_next_fire(&request.trigger, now) {
                println!(
                    "Next {:<17} {}  {}",
                    request.content.tag.as_str(),
                    at.format("%a %H:%M"),
                    request.content.body.lines().next().unwrap_or_default()
                );
            }
        }
        Ok(())
    }

    pub async fn toggle_notifications(&self, enabled: bool) -> anyhow::Result<()> {
        let (host, engine) = self.ready_scheduler().await?;
        engine.toggle_notifications(enabled).await?;
        println!("Evening reminders {}", on_off(enabled));
        engine.shutdown();
        host.cancel_all().await?;
        Ok(())
    }

    pub async fn toggle_alarms(&self, enabled: bool) -> anyhow::Result<()> {
        let (host, engine) = self.ready_scheduler().await?;
        engine.toggle_alarms(enabled).await?;
        println!("Pre-class alarms {}", on_off(enabled));
        engine.shutdown();
        host.cancel_all().await?;
        Ok(())
    }

    /// Initialize the scheduler, keep the schedule fresh and tick until
    /// Ctrl-C.
    pub async fn run(&self) -> anyhow::Result<()> {
        let (host, engine) = self.ready_scheduler().await?;
        let interval = engine.background_interval();

        let ticker = tokio::spawn({
            let engine = engine.clone();
            async move { engine.run(interval).await }
        });

        let refresher = tokio::spawn({
            let engine = engine.clone();
            let sync = self.sync.clone();
            async move {
                let mut last_holidays: Option<HolidayCalendar> = None;
                let mut ticker = tokio::time::interval(interval);
                loop {
                    ticker.tick().await;
                    let report = match sync.refresh().await {
                        Ok(report) => report,
                        Err(e) => {
                            error!(error = %e, "schedule refresh failed");
                            continue;
                        }
                    };
                    let holidays = match sync.refresh_holidays().await {
                        Ok(holidays) => holidays.calendar,
                        Err(e) => {
                            error!(error = %e, "holiday refresh failed");
                            continue;
                        }
                    };
                    if report.changed || last_holidays.as_ref() != Some(&holidays) {
                        let schedule = report.schedule.unwrap_or_default();
                        engine.update_schedule(schedule, holidays.clone()).await;
                    }
                    last_holidays = Some(holidays);
                }
            }
        });

        info!("running; press Ctrl-C to stop");
        tokio::signal::ctrl_c().await?;

        info!("shutting down");
        engine.shutdown();
        refresher.abort();
        if let Err(e) = ticker.await {
            warn!(error = %e, "scheduler loop ended abnormally");
        }
        info!(pending = host.pending(), "cancelling in-process timers");
        host.cancel_all().await?;
        Ok(())
    }

    // --- private helpers ---------------------------------------------------

    fn selection(&self) -> anyhow::Result<Option<(Identity, WeeklySchedule)>> {
        let identity = self.store.identity()?;
        let schedule = self.store.active_schedule()?;
        match (identity, schedule) {
            (Some(identity), Some(schedule)) => Ok(Some((identity, schedule))),
            _ => {
                println!("No schedule selected. Run `remindme select <ID>` first.");
                Ok(None)
            }
        }
    }

    async fn ready_scheduler(
        &self,
    ) -> anyhow::Result<(Arc<ConsoleHost>, Arc<NotificationScheduler>)> {
        let host = Arc::new(ConsoleHost::new());
        let engine = Arc::new(NotificationScheduler::new(
            host.clone(),
            self.kv.clone(),
            &self.config.notifications,
        ));

        let lifecycle = engine.initialize().await;
        info!(%lifecycle, "notification scheduler initialized");

        let schedule = self.store.active_schedule()?.unwrap_or_default();
        let holidays = self.store.holidays()?;
        engine.update_schedule(schedule, holidays).await;
        Ok((host, engine))
    }
}

fn print_day(view: &DayView) {
    match view {
        DayView::Holiday(holiday) => println!("  Holiday: {}", holiday.name),
        DayView::NoClasses => println!("  No classes"),
        DayView::Classes { classes, current } => {
            for (i, class) in classes.iter().enumerate() {
                let marker = if *current == Some(i) { ">" } else { " " };
                println!(
                    "{marker} {:<19} {} [{}]  {} - Room {}  {}",
                    format_window(class),
                    class.course_name,
                    class.class_type.as_str(),
                    class.building,
                    class.room,
                    class.instructor
                );
            }
        }
    }
}

fn local_now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}
