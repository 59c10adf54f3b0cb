// SPDX-License-Identifier: MIT
//! GitLab client: today's commits across every project the user can push to.
//!
//! Uses the REST v4 API with PRIVATE-TOKEN auth. Projects are listed with
//! Developer access or above, commits are pulled per project for today's UTC
//! range and filtered to the authenticated user's email when it can be
//! resolved.

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::Deserialize;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::GitLabConfig;

use super::{today_utc_range, SourceError};

const PROJECTS_PER_PAGE: usize = 100;
/// GitLab access level: Developer.
const MIN_ACCESS_LEVEL: u32 = 30;

/// A single commit as it appears in the aggregated report data.
#[derive(Debug, Clone, Serialize)]
pub struct Commit {
    pub project: String,
    pub project_path: String,
    /// First line of the commit message only.
    pub message: String,
    pub short_id: String,
    pub date: String,
    pub url: String,
    pub author_name: String,
    pub author_email: String,
}

// ─── API response types ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct GitLabUser {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GitLabProject {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub path_with_namespace: String,
}

#[derive(Debug, Deserialize)]
pub struct RawCommit {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub short_id: String,
    #[serde(default)]
    pub committed_date: String,
    #[serde(default)]
    pub web_url: String,
    #[serde(default)]
    pub author_name: String,
    #[serde(default)]
    pub author_email: String,
}

impl RawCommit {
    fn into_commit(self, project: &GitLabProject) -> Commit {
        Commit {
            project: project.name.clone(),
            project_path: project.path_with_namespace.clone(),
            // Merge commits and long bodies only clutter the prompt.
            message: self.message.lines().next().unwrap_or_default().to_string(),
            short_id: self.short_id,
            date: self.committed_date,
            url: self.web_url,
            author_name: self.author_name,
            author_email: self.author_email,
        }
    }
}

// ─── GitLabClient ─────────────────────────────────────────────────────────────

pub struct GitLabClient {
    http: reqwest::Client,
    api_url: String,
}

impl GitLabClient {
    pub fn new(cfg: &GitLabConfig) -> Result<Self, SourceError> {
        let mut headers = HeaderMap::new();
        let mut token = HeaderValue::from_str(&cfg.token)
            .map_err(|e| SourceError::Response(format!("invalid GITLAB_TOKEN: {e}")))?;
        token.set_sensitive(true);
        headers.insert("PRIVATE-TOKEN", token);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .timeout(super::REQUEST_TIMEOUT)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            api_url: format!("{}/api/v4", cfg.base_url),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<T, SourceError> {
        let url = format!("{}/{endpoint}", self.api_url);
        let resp = self
            .http
            .get(&url)
            .query(params)
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }

    /// The currently authenticated user.
    pub async fn current_user(&self) -> Result<GitLabUser, SourceError> {
        self.get_json("user", &[]).await
    }

    /// All projects where the user has at least Developer access, paginated
    /// until a short or empty page.
    pub async fn user_projects(&self) -> Result<Vec<GitLabProject>, SourceError> {
        let mut projects = Vec::new();
        let mut page = 1u32;

        loop {
            let params = [
                ("membership", "true".to_string()),
                ("min_access_level", MIN_ACCESS_LEVEL.to_string()),
                ("per_page", PROJECTS_PER_PAGE.to_string()),
                ("page", page.to_string()),
                ("simple", "true".to_string()),
            ];
            let batch: Vec<GitLabProject> = self.get_json("projects", &params).await?;
            let batch_len = batch.len();
            projects.extend(batch);
            if batch_len < PROJECTS_PER_PAGE {
                break;
            }
            page += 1;
        }

        info!(count = projects.len(), "found accessible gitlab projects");
        Ok(projects)
    }

    /// Commits for one project within a date range, optionally filtered by
    /// author email. A 404 (project gone or access revoked) yields an empty
    /// list rather than an error.
    pub async fn project_commits(
        &self,
        project_id: u64,
        since: &str,
        until: &str,
        author_email: Option<&str>,
    ) -> Result<Vec<RawCommit>, SourceError> {
        let params = [
            ("per_page", "100".to_string()),
            ("with_stats", "false".to_string()),
            ("since", since.to_string()),
            ("until", until.to_string()),
        ];
        let url = format!("{}/projects/{project_id}/repository/commits", self.api_url);
        let resp = self.http.get(&url).query(&params).send().await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            debug!(project_id, "project not found or no access");
            return Ok(vec![]);
        }
        let commits: Vec<RawCommit> = resp.error_for_status()?.json().await?;

        Ok(match author_email {
            Some(email) => commits
                .into_iter()
                .filter(|c| c.author_email.eq_ignore_ascii_case(email))
                .collect(),
            None => commits,
        })
    }

    /// All of today's commits across accessible projects, filtered to the
    /// current user when their email is resolvable.
    pub async fn today_commits(&self) -> Result<Vec<Commit>, SourceError> {
        let (since, until) = today_utc_range();
        info!(%since, %until, "fetching gitlab commits");

        let author_email = match self.current_user().await {
            Ok(user) => {
                if let Some(email) = &user.email {
                    info!(%email, "filtering commits by author");
                }
                user.email
            }
            Err(e) => {
                warn!("could not resolve current user, proceeding without author filter: {e}");
                None
            }
        };

        let projects = self.user_projects().await?;
        let mut all_commits = Vec::new();

        for project in &projects {
            let commits = match self
                .project_commits(project.id, &since, &until, author_email.as_deref())
                .await
            {
                Ok(c) => c,
                Err(e) => {
                    warn!(project_id = project.id, "failed to fetch commits: {e}");
                    continue;
                }
            };
            if !commits.is_empty() {
                info!(count = commits.len(), project = %project.name, "found commits");
            }
            all_commits.extend(commits.into_iter().map(|c| c.into_commit(project)));
        }

        info!(total = all_commits.len(), "gitlab commits collected for today");
        Ok(all_commits)
    }
}

/// Fetch today's GitLab commits, degrading to an empty list on any failure.
pub async fn fetch_commits(cfg: Option<&GitLabConfig>) -> Vec<Commit> {
    let Some(cfg) = cfg else {
        warn!("gitlab not configured — skipping commits");
        return vec![];
    };
    let client = match GitLabClient::new(cfg) {
        Ok(c) => c,
        Err(e) => {
            error!("failed to build gitlab client: {e}");
            return vec![];
        }
    };
    match client.today_commits().await {
        Ok(commits) => commits,
        Err(e) => {
            error!("error fetching gitlab commits: {e}");
            vec![]
        }
    }
}
