use std::time::Duration;

use async_trait::async_trait;
use remindme_core::config::ApiConfig;
use remindme_core::{Holiday, WeeklySchedule};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

const USER_AGENT: &str = concat!("remindme/", env!("CARGO_PKG_VERSION"));

/// Response body of `GET /api/schedule/find/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchedSchedule {
    #[serde(rename = "ID")]
    pub id: String,
    pub schedule: WeeklySchedule,
}

#[derive(Debug, Deserialize)]
struct IdList {
    ids: Vec<String>,
}

/// Where schedules and holidays come from.
///
/// Any failure (unreachable host, non-success status, undecodable body) is a
/// transport failure. Implementations do not retry.
#[async_trait]
pub trait ScheduleSource: Send + Sync {
    async fn fetch_schedule(&self, schedule_id: &str) -> Result<FetchedSchedule>;

    async fn fetch_holidays(&self) -> Result<Vec<Holiday>>;

    /// Every schedule id the service publishes (`UNIV-PROGRAM-SEMESTER-SECTION`).
    async fn list_schedule_ids(&self) -> Result<Vec<String>>;
}

/// [`ScheduleSource`] over the public REST API.
pub struct HttpScheduleSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpScheduleSource {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "GET");
        let body = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(body)
    }
}

#[async_trait]
impl ScheduleSource for HttpScheduleSource {
    async fn fetch_schedule(&self, schedule_id: &str) -> Result<FetchedSchedule> {
        self.get_json(&format!("/api/schedule/find/{schedule_id}"))
            .await
    }

    async fn fetch_holidays(&self) -> Result<Vec<Holiday>> {
        self.get_json("/api/holiday/all").await
    }

    async fn list_schedule_ids(&self) -> Result<Vec<String>> {
        let list: IdList = self.get_json("/api/schedule/ids").await?;
        Ok(list.ids)
    }
}
