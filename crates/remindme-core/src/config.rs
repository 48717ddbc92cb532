use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::ClockTime;

pub const DEFAULT_API_BASE_URL: &str = "https://api.remindme.globaltfn.tech";
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_CHANNEL_ID: &str = "class-alarm";
pub const DEFAULT_EVENING_TIME: ClockTime = ClockTime::saturating(21, 0);
pub const DEFAULT_ALARM_LEAD_MINUTES: u32 = 60;
/// Hosts refuse background wake-ups more often than every 15 minutes.
pub const MIN_BACKGROUND_INTERVAL_SECS: u64 = 15 * 60;

/// Top-level config (remindme.toml + REMINDME_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemindmeConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
}

/// Remote schedule/holiday service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout; the engine enforces none of its own.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: DEFAULT_API_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Time of day the "class tomorrow" reminder fires.
    #[serde(default = "default_evening_time")]
    pub evening_time: ClockTime,
    /// How long before today's first class the alarm rings.
    #[serde(default = "default_alarm_lead_minutes")]
    pub alarm_lead_minutes: u32,
    #[serde(default = "default_background_interval_secs")]
    pub background_interval_secs: u64,
    /// Android-style channel the notifications are posted to.
    #[serde(default = "default_channel_id")]
    pub channel_id: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            evening_time: DEFAULT_EVENING_TIME,
            alarm_lead_minutes: DEFAULT_ALARM_LEAD_MINUTES,
            background_interval_secs: MIN_BACKGROUND_INTERVAL_SECS,
            channel_id: default_channel_id(),
        }
    }
}

impl NotificationConfig {
    pub fn alarm_lead(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.alarm_lead_minutes as i64)
    }

    /// Background wake-up period, never shorter than the host minimum.
    pub fn background_interval(&self) -> Duration {
        Duration::from_secs(self.background_interval_secs.max(MIN_BACKGROUND_INTERVAL_SECS))
    }
}

fn default_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}
fn default_timeout_secs() -> u64 {
    DEFAULT_API_TIMEOUT_SECS
}
fn default_evening_time() -> ClockTime {
    DEFAULT_EVENING_TIME
}
fn default_alarm_lead_minutes() -> u32 {
    DEFAULT_ALARM_LEAD_MINUTES
}
fn default_background_interval_secs() -> u64 {
    MIN_BACKGROUND_INTERVAL_SECS
}
fn default_channel_id() -> String {
    DEFAULT_CHANNEL_ID.to_string()
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.remindme/remindme.db", home)
}

impl RemindmeConfig {
    /// Load config from a TOML file with REMINDME_* env var overrides.
    ///
    /// Nested keys use a double underscore:
    /// `REMINDME_NOTIFICATIONS__ALARM_LEAD_MINUTES=30`.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);
        debug!(%path, "loading configuration");

        Self::from_figment(
            Figment::from(Serialized::defaults(RemindmeConfig::default()))
                .merge(Toml::file(&path))
                .merge(Env::prefixed("REMINDME_").split("__")),
        )
    }

    pub fn from_figment(figment: Figment) -> crate::error::Result<Self> {
        figment
            .extract()
            .map_err(|e| crate::error::CoreError::Config(e.to_string()))
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.remindme/remindme.toml", home)
}
