use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use remindme_notify::{
    compute_next_fire, BackgroundTask, ChannelSpec, HostError, HostHandle, NotificationContent,
    NotificationHost, PermissionStatus, PurposeTag, Trigger,
};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

/// Host for headless runs: every scheduled entry is an in-process tokio
/// timer that logs the notification when it fires. Nothing outlives the
/// process.
#[derive(Default)]
pub struct ConsoleHost {
    timers: Mutex<HashMap<String, (PurposeTag, JoinHandle<()>)>>,
}

impl ConsoleHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.timers().values().filter(|(_, t)| !t.is_finished()).count()
    }

    fn timers(&self) -> MutexGuard<'_, HashMap<String, (PurposeTag, JoinHandle<()>)>> {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl NotificationHost for ConsoleHost {
    async fn request_permission(&self) -> Result<PermissionStatus, HostError> {
        Ok(PermissionStatus::Granted)
    }

    async fn register_channel(&self, spec: &ChannelSpec) -> Result<(), HostError> {
        info!(channel = %spec.id, name = %spec.name, "notification channel registered");
        Ok(())
    }

    async fn register_background_task(&self, task: &BackgroundTask) -> Result<(), HostError> {
        info!(task = %task.name, interval_secs = task.interval.as_secs(), "background task registered");
        Ok(())
    }

    async fn schedule_at(
        &self,
        trigger: &Trigger,
        content: &NotificationContent,
    ) -> Result<HostHandle, HostError> {
        let now = chrono::Local::now().naive_local();
        if compute_next_fire(trigger, now).is_none() {
            return Err(HostError::new(format!("trigger {trigger:?} never fires")));
        }

        let id = Uuid::new_v4().to_string();
        let trigger = *trigger;
        let content = content.clone();
        let timer_id = id.clone();
        let timer = tokio::spawn(async move {
            loop {
                let now = chrono::Local::now().naive_local();
                let Some(next) = compute_next_fire(&trigger, now) else {
                    break;
                };
                let wait = (next - now).to_std().unwrap_or_default();
                debug!(handle = %timer_id, %next, "timer armed");
                tokio::time::sleep(wait).await;
                info!(
                    tag = %content.tag,
                    channel = %content.channel_id,
                    title = %content.title,
                    body = %content.body,
                    "notification fired"
                );
                if matches!(trigger, Trigger::At { .. }) {
                    break;
                }
            }
        });

        self.timers().insert(id.clone(), (content.tag, timer));
        Ok(HostHandle(id))
    }

    async fn cancel(&self, tag: PurposeTag) -> Result<(), HostError> {
        let mut timers = self.timers();
        timers.retain(|id, (owner, timer)| {
            if *owner != tag {
                return true;
            }
            timer.abort();
            debug!(handle = %id, %tag, "timer cancelled");
            false
        });
        Ok(())
    }

    async fn cancel_all(&self) -> Result<(), HostError> {
        let mut timers = self.timers();
        for (_, (_, timer)) in timers.drain() {
            timer.abort();
        }
        Ok(())
    }
}
