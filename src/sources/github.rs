//! GitHub client: project-board tasks and today's commits, via GraphQL v4.
//!
//! Optional source — only active when a token and owner login are
//! configured. Tasks come from a ProjectV2 board; commits are read from the
//! default branch of every repository the owner has.

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::config::GitHubConfig;

use super::{today_utc_range, SourceError};

const GRAPHQL_URL: &str = "https://api.github.com/graphql";

const PROJECT_ID_QUERY: &str = r#"
query($owner: String!, $projectNumber: Int!) {
  user(login: $owner) {
    projectV2(number: $projectNumber) { id }
  }
}
"#;

const PROJECT_ITEMS_QUERY: &str = r#"
query($projectId: ID!) {
  node(id: $projectId) {
    ... on ProjectV2 {
      items(first: 100) {
        nodes {
          content {
            ... on Issue { title url state number body }
            ... on DraftIssue { title body }
          }
          fieldValues(first: 100) {
            nodes {
              ... on ProjectV2ItemFieldSingleSelectValue {
                field { ... on ProjectV2FieldCommon { name } }
                name
              }
            }
          }
        }
      }
    }
  }
}
"#;

const REPOSITORIES_QUERY: &str = r#"
query($username: String!, $first: Int!) {
  user(login: $username) {
    repositories(first: $first, ownerAffiliations: OWNER) {
      nodes { name }
    }
  }
}
"#;

const COMMIT_HISTORY_QUERY: &str = r#"
query($owner: String!, $repo: String!, $since: GitTimestamp!, $until: GitTimestamp!) {
  repository(owner: $owner, name: $repo) {
    defaultBranchRef {
      target {
        ... on Commit {
          history(since: $since, until: $until) {
            edges {
              node {
                message
                committedDate
                url
                author { name email user { login } }
              }
            }
          }
        }
      }
    }
  }
}
"#;

// ─── Aggregated types ─────────────────────────────────────────────────────────

/// A project-board item (issue or draft).
#[derive(Debug, Clone, Default, Serialize)]
pub struct GitHubTask {
    pub title: Option<String>,
    pub url: Option<String>,
    pub state: Option<String>,
    pub number: Option<i64>,
    pub description: Option<String>,
    /// Single-select "Status" column value, when the board has one.
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GitHubCommit {
    pub repo: String,
    pub message: String,
    pub date: String,
    pub url: String,
    pub author: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GitHubActivity {
    pub tasks: Vec<GitHubTask>,
    pub commits: Vec<GitHubCommit>,
}

// ─── GitHubClient ─────────────────────────────────────────────────────────────

pub struct GitHubClient {
    http: reqwest::Client,
    token: String,
}

impl GitHubClient {
    pub fn new(cfg: &GitHubConfig) -> Result<Self, SourceError> {
        // GitHub rejects requests without a User-Agent.
        let http = reqwest::Client::builder()
            .timeout(super::REQUEST_TIMEOUT)
            .user_agent(concat!("daily-report/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            token: cfg.token.clone(),
        })
    }

    async fn graphql(&self, query: &str, variables: Value) -> Result<Value, SourceError> {
        let resp = self
            .http
            .post(GRAPHQL_URL)
            .bearer_auth(&self.token)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?
            .error_for_status()?;
        let body: Value = resp.json().await?;
        if let Some(errors) = body.get("errors") {
            return Err(SourceError::Response(format!("graphql errors: {errors}")));
        }
        Ok(body)
    }

    /// Resolve the node id of a user's ProjectV2 board.
    pub async fn project_id(&self, owner: &str, project_number: i64) -> Result<String, SourceError> {
        let body = self
            .graphql(
                PROJECT_ID_QUERY,
                json!({ "owner": owner, "projectNumber": project_number }),
            )
            .await?;
        body.pointer("/data/user/projectV2/id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                SourceError::Response(format!(
                    "project {project_number} not found for user {owner}"
                ))
            })
    }

    /// All items on a project board.
    pub async fn project_tasks(
        &self,
        owner: &str,
        project_number: i64,
    ) -> Result<Vec<GitHubTask>, SourceError> {
        let project_id = self.project_id(owner, project_number).await?;
        let body = self
            .graphql(PROJECT_ITEMS_QUERY, json!({ "projectId": project_id }))
            .await?;
        let tasks = parse_project_items(&body);
        info!(count = tasks.len(), "found github project tasks");
        Ok(tasks)
    }

    /// Names of the first 100 repositories the user owns.
    pub async fn user_repositories(&self, username: &str) -> Result<Vec<String>, SourceError> {
        let body = self
            .graphql(
                REPOSITORIES_QUERY,
                json!({ "username": username, "first": 100 }),
            )
            .await?;
        let repos: Vec<String> = body
            .pointer("/data/user/repositories/nodes")
            .and_then(Value::as_array)
            .map(|nodes| {
                nodes
                    .iter()
                    .filter_map(|n| n.get("name").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        info!(count = repos.len(), %username, "found repositories");
        Ok(repos)
    }

    /// Today's commits on the default branch of every owned repository.
    pub async fn today_commits(&self, owner: &str) -> Result<Vec<GitHubCommit>, SourceError> {
        let (since, until) = today_utc_range();
        let repos = self.user_repositories(owner).await?;
        let mut all_commits = Vec::new();

        for repo in &repos {
            let body = match self
                .graphql(
                    COMMIT_HISTORY_QUERY,
                    json!({ "owner": owner, "repo": repo, "since": since, "until": until }),
                )
                .await
            {
                Ok(b) => b,
                Err(e) => {
                    warn!(%repo, "failed to fetch commit history: {e}");
                    continue;
                }
            };
            all_commits.extend(parse_commit_history(repo, &body));
        }

        info!(total = all_commits.len(), "github commits collected for today");
        Ok(all_commits)
    }
}

// ─── Response parsing ─────────────────────────────────────────────────────────

pub fn parse_project_items(body: &Value) -> Vec<GitHubTask> {
    let Some(items) = body
        .pointer("/data/node/items/nodes")
        .and_then(Value::as_array)
    else {
        return vec![];
    };

    items
        .iter()
        .map(|item| {
            let content = item.get("content").unwrap_or(&Value::Null);
            let get = |key: &str| {
                content
                    .get(key)
                    .and_then(Value::as_str)
                    .map(str::to_string)
            };
            let status = item
                .pointer("/fieldValues/nodes")
                .and_then(Value::as_array)
                .and_then(|nodes| {
                    nodes.iter().find_map(|n| {
                        (n.pointer("/field/name").and_then(Value::as_str) == Some("Status"))
                            .then(|| n.get("name").and_then(Value::as_str))
                            .flatten()
                            .map(str::to_string)
                    })
                });
            GitHubTask {
                title: get("title"),
                url: get("url"),
                state: get("state"),
                number: content.get("number").and_then(Value::as_i64),
                description: get("body"),
                status,
            }
        })
        .collect()
}

pub fn parse_commit_history(repo: &str, body: &Value) -> Vec<GitHubCommit> {
    let Some(edges) = body
        .pointer("/data/repository/defaultBranchRef/target/history/edges")
        .and_then(Value::as_array)
    else {
        return vec![];
    };

    edges
        .iter()
        .filter_map(|edge| edge.get("node"))
        .map(|node| {
            let text = |ptr: &str| {
                node.pointer(ptr)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            };
            GitHubCommit {
                repo: repo.to_string(),
                message: text("/message"),
                date: text("/committedDate"),
                url: text("/url"),
                author: text("/author/name"),
            }
        })
        .collect()
}

/// Fetch GitHub activity, degrading to empty data on any failure.
///
/// Tasks require a configured project board; commits only need the owner
/// login. Each half fails independently.
pub async fn fetch_activity(cfg: Option<&GitHubConfig>) -> GitHubActivity {
    let Some(cfg) = cfg else {
        return GitHubActivity::default();
    };
    let Some(owner) = cfg.owner.as_deref() else {
        warn!("GH_OWNER not set — skipping github activity");
        return GitHubActivity::default();
    };
    let client = match GitHubClient::new(cfg) {
        Ok(c) => c,
        Err(e) => {
            error!("failed to build github client: {e}");
            return GitHubActivity::default();
        }
    };

    let tasks = match cfg.project_number {
        Some(number) => client.project_tasks(owner, number).await.unwrap_or_else(|e| {
            error!("error fetching github project tasks: {e}");
            vec![]
        }),
        None => vec![],
    };
    let commits = client.today_commits(owner).await.unwrap_or_else(|e| {
        error!("error fetching github commits: {e}");
        vec![]
    });

    GitHubActivity { tasks, commits }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_items_carry_status_and_content() {
        let body = json!({
            "data": { "node": { "items": { "nodes": [
                {
                    "content": {
                        "title": "Ship reports v2",
                        "url": "https://github.com/acme/reports/issues/12",
                        "state": "OPEN",
                        "number": 12,
                        "body": "Details here"
                    },
                    "fieldValues": { "nodes": [
                        { "field": { "name": "Priority" }, "name": "P1" },
                        { "field": { "name": "Status" }, "name": "In Progress" }
                    ]}
                },
                {
                    "content": { "title": "Draft idea", "body": "rough notes" },
                    "fieldValues": { "nodes": [] }
                }
            ]}}}
        });

        let tasks = parse_project_items(&body);
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].title.as_deref(), Some("Ship reports v2"));
        assert_eq!(tasks[0].status.as_deref(), Some("In Progress"));
        assert_eq!(tasks[0].number, Some(12));
        assert_eq!(tasks[1].title.as_deref(), Some("Draft idea"));
        assert!(tasks[1].url.is_none());
        assert!(tasks[1].status.is_none());
    }

    #[test]
    fn commit_history_flattens_edges() {
        let body = json!({
            "data": { "repository": { "defaultBranchRef": { "target": { "history": { "edges": [
                { "node": {
                    "message": "chore: bump deps",
                    "committedDate": "2026-08-28T07:00:00Z",
                    "url": "https://github.com/acme/reports/commit/deadbeef",
                    "author": { "name": "Dev", "email": "dev@acme.test", "user": { "login": "dev" } }
                }}
            ]}}}}}
        });

        let commits = parse_commit_history("reports", &body);
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].repo, "reports");
        assert_eq!(commits[0].message, "chore: bump deps");
        assert_eq!(commits[0].author, "Dev");
    }

    #[test]
    fn missing_default_branch_yields_no_commits() {
        let body = json!({ "data": { "repository": { "defaultBranchRef": null } } });
        assert!(parse_commit_history("empty", &body).is_empty());
    }
}
