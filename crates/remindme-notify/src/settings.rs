use std::sync::Arc;

use remindme_schedule::kv::{load_json, store_json, KeyValueStore};
use tracing::debug;

use crate::error::Result;
use crate::types::NotificationSettings;

pub const SETTINGS_KEY: &str = "notification_settings";

/// Typed access to [`NotificationSettings`] over the shared key/value store.
pub struct SettingsStore {
    kv: Arc<dyn KeyValueStore>,
}

impl SettingsStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Stored settings, or defaults on first run or when the stored record
    /// is unreadable.
    pub fn load(&self) -> Result<NotificationSettings> {
        let settings: Option<NotificationSettings> = load_json(self.kv.as_ref(), SETTINGS_KEY)?;
        if settings.is_none() {
            debug!("no stored notification settings, using defaults");
        }
        Ok(settings.unwrap_or_default())
    }

    pub fn save(&self, settings: &NotificationSettings) -> Result<()> {
        store_json(self.kv.as_ref(), SETTINGS_KEY, settings)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remindme_schedule::InMemoryKeyValueStore;

    #[test]
    fn defaults_on_first_run_and_after_corruption() {
        let kv = Arc::new(InMemoryKeyValueStore::new());
        let store = SettingsStore::new(kv.clone());
        assert_eq!(store.load().unwrap(), NotificationSettings::default());

        kv.set(SETTINGS_KEY, "{\"alarms_enabled\": \"sometimes\"}").unwrap();
        assert_eq!(store.load().unwrap(), NotificationSettings::default());
    }

    #[test]
    fn saved_settings_are_loaded_back() {
        let store = SettingsStore::new(Arc::new(InMemoryKeyValueStore::new()));
        let settings = NotificationSettings {
            notifications_enabled: false,
            ..Default::default()
        };
        store.save(&settings).unwrap();
        assert_eq!(store.load().unwrap(), settings);
    }
}
