use async_trait::async_trait;

use crate::error::HostError;
use crate::types::{
    BackgroundTask, ChannelSpec, HostHandle, NotificationContent, PermissionStatus, PurposeTag,
    Trigger,
};

/// The platform notification API the engine drives.
///
/// Implementations must keep entries scheduled by other parts of the app
/// untouched: `cancel` removes only entries whose content carries `tag`.
#[async_trait]
pub trait NotificationHost: Send + Sync {
    async fn request_permission(&self) -> Result<PermissionStatus, HostError>;

    async fn register_channel(&self, spec: &ChannelSpec) -> Result<(), HostError>;

    async fn register_background_task(&self, task: &BackgroundTask) -> Result<(), HostError>;

    async fn schedule_at(
        &self,
        trigger: &Trigger,
        content: &NotificationContent,
    ) -> Result<HostHandle, HostError>;

    async fn cancel(&self, tag: PurposeTag) -> Result<(), HostError>;

    /// Drop every pending entry this host holds.
    async fn cancel_all(&self) -> Result<(), HostError>;
}
