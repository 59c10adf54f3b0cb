// SPDX-License-Identifier: MIT
//! Jira client: the user's task activity for today's report.
//!
//! Uses the REST v3 API (basic auth with email + API token) for JQL searches
//! and the Agile 1.0 API for boards. Issue payloads are navigated as JSON
//! values because the two custom date fields are site-specific and their
//! keys only exist at runtime.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::config::JiraConfig;

use super::{http_client, SourceError};

/// ADF descriptions are capped at this many characters after extraction.
const ADF_TEXT_CAP: usize = 500;
/// Descriptions are truncated further when they enter the aggregated data.
const DESCRIPTION_CAP: usize = 200;

// ─── Aggregated types ─────────────────────────────────────────────────────────

/// A Jira issue as it appears in the aggregated report data.
#[derive(Debug, Clone, Serialize)]
pub struct JiraTask {
    pub key: String,
    pub summary: String,
    pub status: String,
    pub status_category: String,
    pub issue_type: String,
    pub project_key: String,
    pub project: String,
    pub assignee: Option<String>,
    pub priority: Option<String>,
    pub description: Option<String>,
    pub created: String,
    pub updated: String,
    pub resolution_date: Option<String>,
    pub closed_date: Option<String>,
    pub start_date: Option<String>,
    pub labels: Vec<String>,
    pub components: Vec<String>,
    pub url: String,
}

/// A board the user can see, with no per-board issue drill-down.
#[derive(Debug, Clone, Serialize)]
pub struct BoardInfo {
    pub id: i64,
    pub name: String,
    pub board_type: String,
    pub project_key: Option<String>,
}

/// Issue counts on one board, bucketed by status category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BoardSummary {
    pub todo: u32,
    pub in_progress: u32,
    pub done: u32,
}

/// Everything the report needs from Jira for one day.
#[derive(Debug, Clone, Default, Serialize)]
pub struct JiraActivity {
    pub tasks_in_progress: Vec<JiraTask>,
    pub tasks_closed_today: Vec<JiraTask>,
    pub all_my_tasks: Vec<JiraTask>,
    pub boards: Vec<BoardInfo>,
}

// ─── JiraClient ───────────────────────────────────────────────────────────────

pub struct JiraClient {
    http: reqwest::Client,
    base_url: String,
    api_url: String,
    agile_api_url: String,
    email: String,
    api_token: String,
    closed_date_field: String,
    start_date_field: String,
}

impl JiraClient {
    pub fn new(cfg: &JiraConfig) -> Result<Self, SourceError> {
        Ok(Self {
            http: http_client()?,
            base_url: cfg.base_url.clone(),
            api_url: format!("{}/rest/api/3", cfg.base_url),
            agile_api_url: format!("{}/rest/agile/1.0", cfg.base_url),
            email: cfg.email.clone(),
            api_token: cfg.api_token.clone(),
            closed_date_field: cfg.closed_date_field.clone(),
            start_date_field: cfg.start_date_field.clone(),
        })
    }

    async fn get(&self, url: &str, params: &[(&str, String)]) -> Result<Value, SourceError> {
        let resp = self
            .http
            .get(url)
            .basic_auth(&self.email, Some(&self.api_token))
            .header("Accept", "application/json")
            .query(params)
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }

    /// The currently authenticated user (`/myself`).
    pub async fn current_user(&self) -> Result<Value, SourceError> {
        self.get(&format!("{}/myself", self.api_url), &[]).await
    }

    async fn account_id(&self) -> Result<String, SourceError> {
        let user = self.current_user().await?;
        user.get("accountId")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| SourceError::Response("myself response missing accountId".to_string()))
    }

    /// Run a JQL search against the `/search/jql` endpoint with the default
    /// field list (including the two custom date fields).
    pub async fn search_issues(&self, jql: &str) -> Result<Value, SourceError> {
        let fields = [
            "summary",
            "status",
            "issuetype",
            "project",
            "assignee",
            "priority",
            "description",
            "created",
            "updated",
            "labels",
            "components",
            "resolutiondate",
            self.closed_date_field.as_str(),
            self.start_date_field.as_str(),
        ]
        .join(",");

        let params = [
            ("jql", jql.to_string()),
            ("maxResults", "100".to_string()),
            ("startAt", "0".to_string()),
            ("fields", fields),
        ];
        self.get(&format!("{}/search/jql", self.api_url), &params)
            .await
    }

    fn issues_from(&self, result: &Value) -> Vec<JiraTask> {
        result
            .get("issues")
            .and_then(Value::as_array)
            .map(|issues| issues.iter().map(|i| self.parse_issue(i)).collect())
            .unwrap_or_default()
    }

    /// All open tasks assigned to the current user, most recently updated first.
    pub async fn my_open_tasks(&self) -> Result<Vec<JiraTask>, SourceError> {
        let account_id = self.account_id().await?;
        let jql =
            format!("assignee = '{account_id}' AND status != Done ORDER BY updated DESC");
        debug!(%jql, "searching jira");
        let result = self.search_issues(&jql).await?;
        let tasks = self.issues_from(&result);
        info!(count = tasks.len(), "found open tasks assigned to user");
        Ok(tasks)
    }

    /// Tasks currently in the "In Progress" status category.
    pub async fn tasks_in_progress(&self) -> Result<Vec<JiraTask>, SourceError> {
        let account_id = self.account_id().await?;
        let jql = format!(
            "assignee = '{account_id}' AND statusCategory = 'In Progress' ORDER BY updated DESC"
        );
        let result = self.search_issues(&jql).await?;
        let tasks = self.issues_from(&result);
        info!(count = tasks.len(), "found tasks in progress");
        Ok(tasks)
    }

    /// Tasks closed today, judged by resolution date or the custom closed-date
    /// field. Falls back to resolution date alone when the site rejects the
    /// custom-field JQL.
    pub async fn tasks_closed_today(&self) -> Result<Vec<JiraTask>, SourceError> {
        let account_id = self.account_id().await?;
        let today = chrono::Utc::now().format("%Y-%m-%d").to_string();

        let jql = format!(
            "assignee = '{account_id}' AND (resolutiondate >= '{today}' OR {} >= '{today}') ORDER BY updated DESC",
            self.closed_date_field
        );
        let result = match self.search_issues(&jql).await {
            Ok(r) => r,
            Err(e) => {
                debug!("custom closed-date JQL rejected ({e}), retrying with resolutiondate only");
                let fallback = format!(
                    "assignee = '{account_id}' AND resolutiondate >= '{today}' ORDER BY updated DESC"
                );
                self.search_issues(&fallback).await?
            }
        };

        let tasks = self.issues_from(&result);
        info!(count = tasks.len(), "found tasks closed today");
        Ok(tasks)
    }

    /// All boards visible to the user. A 404 means the site has no Agile API
    /// (Jira Work Management only) and yields an empty list.
    pub async fn boards(&self) -> Result<Vec<BoardInfo>, SourceError> {
        let url = format!("{}/board", self.agile_api_url);
        let resp = self
            .http
            .get(&url)
            .basic_auth(&self.email, Some(&self.api_token))
            .header("Accept", "application/json")
            .query(&[("maxResults", "50")])
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            warn!("agile API not available, skipping boards");
            return Ok(vec![]);
        }
        let result: Value = resp.error_for_status()?.json().await?;

        let boards: Vec<BoardInfo> = result
            .get("values")
            .and_then(Value::as_array)
            .map(|values| {
                values
                    .iter()
                    .map(|b| BoardInfo {
                        id: b.get("id").and_then(Value::as_i64).unwrap_or_default(),
                        name: str_field(b, "name"),
                        board_type: str_field(b, "type"),
                        project_key: b
                            .pointer("/location/projectKey")
                            .and_then(Value::as_str)
                            .map(str::to_string),
                    })
                    .collect()
            })
            .unwrap_or_default();

        info!(count = boards.len(), "found boards");
        Ok(boards)
    }

    /// Count a board's issues by status category.
    pub async fn board_issue_summary(&self, board_id: i64) -> Result<BoardSummary, SourceError> {
        let url = format!("{}/board/{board_id}/issue", self.agile_api_url);
        let params = [
            ("maxResults", "100".to_string()),
            ("fields", "status".to_string()),
        ];
        let result = self.get(&url, &params).await?;
        Ok(summarize_board_statuses(&result))
    }

    /// Map one raw issue into a [`JiraTask`].
    pub fn parse_issue(&self, issue: &Value) -> JiraTask {
        let fields = issue.get("fields").cloned().unwrap_or(Value::Null);

        let status = fields
            .pointer("/status/name")
            .and_then(Value::as_str)
            .unwrap_or("Unknown")
            .to_string();
        let status_category = fields
            .pointer("/status/statusCategory/name")
            .and_then(Value::as_str)
            .unwrap_or("Unknown")
            .to_string();

        let key = issue
            .get("key")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let url = if key.is_empty() {
            String::new()
        } else {
            format!("{}/browse/{key}", self.base_url)
        };

        let description = fields.get("description").and_then(|desc| match desc {
            Value::String(s) => Some(s.clone()),
            Value::Object(_) => Some(extract_adf_text(desc)),
            _ => None,
        });

        JiraTask {
            key,
            summary: str_field(&fields, "summary"),
            status,
            status_category,
            issue_type: fields
                .pointer("/issuetype/name")
                .and_then(Value::as_str)
                .unwrap_or("Task")
                .to_string(),
            project_key: fields
                .pointer("/project/key")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            project: fields
                .pointer("/project/name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            assignee: fields
                .pointer("/assignee/displayName")
                .and_then(Value::as_str)
                .map(str::to_string),
            priority: fields
                .pointer("/priority/name")
                .and_then(Value::as_str)
                .map(str::to_string),
            description: description.map(|d| truncate_chars(&d, DESCRIPTION_CAP)),
            created: str_field(&fields, "created"),
            updated: str_field(&fields, "updated"),
            resolution_date: fields
                .get("resolutiondate")
                .and_then(Value::as_str)
                .map(str::to_string),
            closed_date: fields
                .get(&self.closed_date_field)
                .and_then(Value::as_str)
                .map(str::to_string),
            start_date: fields
                .get(&self.start_date_field)
                .and_then(Value::as_str)
                .map(str::to_string),
            labels: fields
                .get("labels")
                .and_then(Value::as_array)
                .map(|l| {
                    l.iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            components: fields
                .get("components")
                .and_then(Value::as_array)
                .map(|c| c.iter().map(|comp| str_field(comp, "name")).collect())
                .unwrap_or_default(),
            url,
        }
    }
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn str_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn truncate_chars(s: &str, cap: usize) -> String {
    if s.chars().count() > cap {
        s.chars().take(cap).collect()
    } else {
        s.to_string()
    }
}

/// Walk an Atlassian Document Format tree and join every text node.
pub fn extract_adf_text(adf: &Value) -> String {
    let mut parts: Vec<String> = Vec::new();
    collect_text(adf, &mut parts);
    truncate_chars(&parts.join(" "), ADF_TEXT_CAP)
}

fn collect_text(node: &Value, parts: &mut Vec<String>) {
    match node {
        Value::Object(map) => {
            if map.get("type").and_then(Value::as_str) == Some("text") {
                if let Some(text) = map.get("text").and_then(Value::as_str) {
                    parts.push(text.to_string());
                }
            }
            if let Some(content) = map.get("content") {
                collect_text(content, parts);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_text(item, parts);
            }
        }
        _ => {}
    }
}

/// Count issues in a board payload by status category key
/// (new / indeterminate / done).
pub fn summarize_board_statuses(result: &Value) -> BoardSummary {
    let mut summary = BoardSummary::default();
    let Some(issues) = result.get("issues").and_then(Value::as_array) else {
        return summary;
    };
    for issue in issues {
        match issue
            .pointer("/fields/status/statusCategory/key")
            .and_then(Value::as_str)
        {
            Some("new") => summary.todo += 1,
            Some("indeterminate") => summary.in_progress += 1,
            Some("done") => summary.done += 1,
            _ => {}
        }
    }
    summary
}

/// Fetch all Jira activity for today, degrading each part to empty data on
/// failure so a broken board API cannot take the task lists down with it.
pub async fn fetch_activity(cfg: Option<&JiraConfig>) -> JiraActivity {
    let Some(cfg) = cfg else {
        warn!("jira not configured — skipping tasks");
        return JiraActivity::default();
    };
    let client = match JiraClient::new(cfg) {
        Ok(c) => c,
        Err(e) => {
            error!("failed to build jira client: {e}");
            return JiraActivity::default();
        }
    };

    let (in_progress, closed_today, open_tasks, boards) = tokio::join!(
        client.tasks_in_progress(),
        client.tasks_closed_today(),
        client.my_open_tasks(),
        client.boards(),
    );

    JiraActivity {
        tasks_in_progress: in_progress.unwrap_or_else(|e| {
            error!("error fetching in-progress tasks: {e}");
            vec![]
        }),
        tasks_closed_today: closed_today.unwrap_or_else(|e| {
            error!("error fetching closed tasks: {e}");
            vec![]
        }),
        all_my_tasks: open_tasks.unwrap_or_else(|e| {
            error!("error fetching open tasks: {e}");
            vec![]
        }),
        boards: boards.unwrap_or_else(|e| {
            error!("error fetching boards: {e}");
            vec![]
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JiraConfig;
    use serde_json::json;

    fn client() -> JiraClient {
        JiraClient::new(&JiraConfig {
            base_url: "https://acme.atlassian.net".to_string(),
            email: "dev@acme.test".to_string(),
            api_token: "token".to_string(),
            closed_date_field: "customfield_10100".to_string(),
            start_date_field: "customfield_10101".to_string(),
        })
        .expect("client builds without network access")
    }

    #[test]
    fn parses_full_issue() {
        let issue = json!({
            "key": "PAY-42",
            "fields": {
                "summary": "Refund endpoint returns 500",
                "status": {
                    "name": "In Progress",
                    "statusCategory": { "name": "In Progress", "key": "indeterminate" }
                },
                "issuetype": { "name": "Bug" },
                "project": { "key": "PAY", "name": "Payments" },
                "assignee": { "displayName": "Dev One" },
                "priority": { "name": "High" },
                "description": "Stack trace attached",
                "created": "2026-08-27T10:00:00.000+0000",
                "updated": "2026-08-28T08:30:00.000+0000",
                "resolutiondate": null,
                "customfield_10100": null,
                "customfield_10101": "2026-08-27",
                "labels": ["backend", "urgent"],
                "components": [{ "name": "api" }]
            }
        });

        let task = client().parse_issue(&issue);
        assert_eq!(task.key, "PAY-42");
        assert_eq!(task.status, "In Progress");
        assert_eq!(task.status_category, "In Progress");
        assert_eq!(task.issue_type, "Bug");
        assert_eq!(task.project, "Payments");
        assert_eq!(task.project_key, "PAY");
        assert_eq!(task.assignee.as_deref(), Some("Dev One"));
        assert_eq!(task.priority.as_deref(), Some("High"));
        assert_eq!(task.description.as_deref(), Some("Stack trace attached"));
        assert_eq!(task.start_date.as_deref(), Some("2026-08-27"));
        assert_eq!(task.labels, vec!["backend", "urgent"]);
        assert_eq!(task.components, vec!["api"]);
        assert_eq!(task.url, "https://acme.atlassian.net/browse/PAY-42");
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let task = client().parse_issue(&json!({ "key": "X-1", "fields": {} }));
        assert_eq!(task.status, "Unknown");
        assert_eq!(task.issue_type, "Task");
        assert!(task.assignee.is_none());
        assert!(task.description.is_none());
        assert!(task.labels.is_empty());
    }

    #[test]
    fn issue_without_key_has_no_url() {
        let task = client().parse_issue(&json!({ "fields": {} }));
        assert_eq!(task.url, "");
    }

    #[test]
    fn adf_description_is_flattened() {
        let issue = json!({
            "key": "X-2",
            "fields": {
                "description": {
                    "type": "doc",
                    "content": [
                        { "type": "paragraph", "content": [
                            { "type": "text", "text": "First" },
                            { "type": "text", "text": "second" }
                        ]},
                        { "type": "paragraph", "content": [
                            { "type": "text", "text": "third" }
                        ]}
                    ]
                }
            }
        });
        let task = client().parse_issue(&issue);
        assert_eq!(task.description.as_deref(), Some("First second third"));
    }

    #[test]
    fn long_description_is_truncated() {
        let long = "x".repeat(400);
        let task = client().parse_issue(&json!({ "key": "X-3", "fields": { "description": long } }));
        assert_eq!(task.description.map(|d| d.chars().count()), Some(200));
    }

    #[test]
    fn adf_extraction_caps_length() {
        let adf = json!({
            "type": "doc",
            "content": [{ "type": "text", "text": "y".repeat(900) }]
        });
        assert_eq!(extract_adf_text(&adf).chars().count(), 500);
    }

    #[test]
    fn board_summary_buckets_by_status_category() {
        let payload = json!({
            "issues": [
                { "fields": { "status": { "statusCategory": { "key": "new" } } } },
                { "fields": { "status": { "statusCategory": { "key": "new" } } } },
                { "fields": { "status": { "statusCategory": { "key": "indeterminate" } } } },
                { "fields": { "status": { "statusCategory": { "key": "done" } } } },
                { "fields": { "status": { "statusCategory": { "key": "weird" } } } }
            ]
        });
        assert_eq!(
            summarize_board_statuses(&payload),
            BoardSummary { todo: 2, in_progress: 1, done: 1 }
        );
    }

    #[test]
    fn board_summary_of_empty_payload_is_zero() {
        assert_eq!(summarize_board_statuses(&json!({})), BoardSummary::default());
    }
}
