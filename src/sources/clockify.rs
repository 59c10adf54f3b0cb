// SPDX-License-Identifier: MIT
//! Clockify client: today's tracked time entries.
//!
//! The v1 API is keyed by workspace and user id, both resolved from the
//! `/user` endpoint on first use and cached for the rest of the run.

use chrono::DateTime;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{error, info, warn};

use crate::config::ClockifyConfig;

use super::{today_utc_range, SourceError};

const BASE_URL: &str = "https://api.clockify.me/api/v1";

/// A time entry as it appears in the aggregated report data.
#[derive(Debug, Clone, Serialize)]
pub struct TimeEntry {
    /// Entry description ("No description" when blank).
    pub name: String,
    pub project_name: String,
    pub task: Option<String>,
    /// Whole minutes between start and end; 0 for running entries.
    pub minutes: i64,
    pub start: String,
    pub end: Option<String>,
    pub is_running: bool,
    pub tags: Vec<String>,
}

// ─── API response types ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ClockifyUser {
    pub id: String,
    #[serde(rename = "defaultWorkspace")]
    pub default_workspace: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NamedRef {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
struct TimeInterval {
    #[serde(default)]
    start: String,
    end: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawEntry {
    #[serde(default)]
    description: String,
    project: Option<NamedRef>,
    task: Option<NamedRef>,
    #[serde(default)]
    tags: Vec<NamedRef>,
    #[serde(rename = "timeInterval", default)]
    time_interval: TimeInterval,
}

impl RawEntry {
    fn into_entry(self) -> TimeEntry {
        let is_running = self.time_interval.end.is_none();
        let minutes = match &self.time_interval.end {
            Some(end) => duration_minutes(&self.time_interval.start, end),
            None => 0,
        };
        TimeEntry {
            name: if self.description.is_empty() {
                "No description".to_string()
            } else {
                self.description
            },
            project_name: self
                .project
                .map(|p| p.name)
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| "No project".to_string()),
            task: self.task.map(|t| t.name),
            minutes,
            start: self.time_interval.start,
            end: self.time_interval.end,
            is_running,
            tags: self.tags.into_iter().map(|t| t.name).collect(),
        }
    }
}

/// Whole minutes between two RFC 3339 timestamps; 0 when either is invalid.
fn duration_minutes(start: &str, end: &str) -> i64 {
    match (
        DateTime::parse_from_rfc3339(start),
        DateTime::parse_from_rfc3339(end),
    ) {
        (Ok(s), Ok(e)) => (e - s).num_minutes().max(0),
        _ => 0,
    }
}

// ─── ClockifyClient ───────────────────────────────────────────────────────────

pub struct ClockifyClient {
    http: reqwest::Client,
    /// Workspace and user id, resolved once from `/user`.
    ids: OnceCell<(String, String)>,
}

impl ClockifyClient {
    pub fn new(cfg: &ClockifyConfig) -> Result<Self, SourceError> {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(&cfg.api_key)
            .map_err(|e| SourceError::Response(format!("invalid CLOCKIFY_API_KEY: {e}")))?;
        key.set_sensitive(true);
        headers.insert("X-Api-Key", key);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .timeout(super::REQUEST_TIMEOUT)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            ids: OnceCell::new(),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<T, SourceError> {
        let url = format!("{BASE_URL}/{endpoint}");
        let resp = self
            .http
            .get(&url)
            .query(params)
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }

    /// The current user's profile.
    pub async fn user_data(&self) -> Result<ClockifyUser, SourceError> {
        self.get_json("user", &[]).await
    }

    /// Cached (workspace id, user id) pair.
    async fn workspace_and_user(&self) -> Result<&(String, String), SourceError> {
        self.ids
            .get_or_try_init(|| async {
                let user = self.user_data().await?;
                let workspace = user.default_workspace.ok_or_else(|| {
                    SourceError::Response("user has no default workspace".to_string())
                })?;
                Ok((workspace, user.id))
            })
            .await
    }

    /// Raw time entries for today's UTC range, hydrated with project and
    /// task details.
    pub async fn time_entries(&self) -> Result<Vec<RawEntry>, SourceError> {
        let (workspace_id, user_id) = self.workspace_and_user().await?.clone();
        let (start, end) = today_utc_range();

        let params = [
            ("start", start),
            ("end", end),
            ("hydrated", "true".to_string()),
        ];
        let endpoint = format!("workspaces/{workspace_id}/user/{user_id}/time-entries");
        let entries: Vec<RawEntry> = self.get_json(&endpoint, &params).await?;
        info!(count = entries.len(), "retrieved time entries");
        Ok(entries)
    }

    /// Today's entries, parsed into [`TimeEntry`] records.
    pub async fn today_entries(&self) -> Result<Vec<TimeEntry>, SourceError> {
        let raw = self.time_entries().await?;
        Ok(raw.into_iter().map(RawEntry::into_entry).collect())
    }

    /// All projects in the user's default workspace.
    pub async fn projects(&self) -> Result<Vec<NamedRef>, SourceError> {
        let (workspace_id, _) = self.workspace_and_user().await?.clone();
        self.get_json(
            &format!("workspaces/{workspace_id}/projects"),
            &[("page-size", "100".to_string())],
        )
        .await
    }
}

/// Fetch today's time entries, degrading to an empty list on any failure.
pub async fn fetch_time_entries(cfg: Option<&ClockifyConfig>) -> Vec<TimeEntry> {
    let Some(cfg) = cfg else {
        warn!("clockify not configured — skipping time entries");
        return vec![];
    };
    let client = match ClockifyClient::new(cfg) {
        Ok(c) => c,
        Err(e) => {
            error!("failed to build clockify client: {e}");
            return vec![];
        }
    };
    match client.today_entries().await {
        Ok(entries) => {
            if entries.is_empty() {
                info!("no time entries found for today");
            }
            entries
        }
        Err(e) => {
            error!("error fetching time entries: {e}");
            vec![]
        }
    }
}
