//! The report pipeline: collect activity, gate, generate, deliver.
//!
//! One invocation is one pass. Sources that fail or are unconfigured
//! contribute empty data; only a missing OpenAI key or a failed generation
//! aborts the run.

pub mod generator;
pub mod prompt;

use std::path::Path;

use anyhow::{Context as _, Result};
use chrono::Local;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::mailer::EmailSender;
use crate::sources::clockify::{self, TimeEntry};
use crate::sources::github::{self, GitHubActivity};
use crate::sources::gitlab::{self, Commit};
use crate::sources::jira::{self, JiraActivity};

use self::generator::ReportGenerator;

/// Everything collected from the sources for one day.
#[derive(Debug, Clone, Default)]
pub struct ActivityData {
    pub commits: Vec<Commit>,
    pub jira: JiraActivity,
    pub time_entries: Vec<TimeEntry>,
    pub github: GitHubActivity,
}

/// Fetch all sources in one concurrent pass. Failures were already logged
/// and degraded to empty data inside the fetch helpers.
pub async fn collect_activity(cfg: &AppConfig) -> ActivityData {
    info!("collecting data from all sources");

    let (commits, jira, time_entries, github) = tokio::join!(
        gitlab::fetch_commits(cfg.gitlab.as_ref()),
        jira::fetch_activity(cfg.jira.as_ref()),
        clockify::fetch_time_entries(cfg.clockify.as_ref()),
        github::fetch_activity(cfg.github.as_ref()),
    );

    let data = ActivityData {
        commits,
        jira,
        time_entries,
        github,
    };

    info!(
        commits = data.commits.len(),
        tasks_in_progress = data.jira.tasks_in_progress.len(),
        tasks_closed = data.jira.tasks_closed_today.len(),
        time_entries = data.time_entries.len(),
        "data collected"
    );
    data
}

/// Decide whether there is enough activity to report.
///
/// With `require_clockify_entries` set, an empty time log skips the report
/// even when commits or tasks exist. Otherwise any source having data
/// qualifies.
pub fn should_generate(require_clockify_entries: bool, data: &ActivityData) -> bool {
    let has_time_entries = !data.time_entries.is_empty();
    if require_clockify_entries && !has_time_entries {
        info!("skipped — no time entries found for today");
        return false;
    }

    let has_commits = !data.commits.is_empty() || !data.github.commits.is_empty();
    let has_task_activity =
        !data.jira.tasks_in_progress.is_empty() || !data.jira.tasks_closed_today.is_empty();

    has_commits || has_task_activity || has_time_entries
}

/// Run the whole pipeline once.
///
/// Returns the generated report, or `None` when the activity gate decided
/// to skip. With `dry_run` the report is printed instead of emailed.
pub async fn run(cfg: &AppConfig, dry_run: bool) -> Result<Option<String>> {
    info!(
        started = %Local::now().format("%Y-%m-%d %H:%M"),
        "starting daily report generation"
    );

    let data = collect_activity(cfg).await;

    if !should_generate(cfg.require_clockify_entries, &data) {
        return Ok(None);
    }

    let templates = prompt::load_templates(Path::new("."));
    let date = Local::now().format("%Y-%m-%d").to_string();
    let user_prompt = prompt::build_user_prompt(&data, &templates.prompt, &date);

    let generator = ReportGenerator::new(cfg.openai.clone())?;
    let report = generator
        .generate(&user_prompt, &templates.system_role)
        .await
        .context("failed to generate report")?;

    if dry_run {
        println!("{report}");
        return Ok(Some(report));
    }

    dispatch(cfg, &report).await;
    Ok(Some(report))
}

/// Email the report to the configured recipients. Delivery problems are
/// logged, never fatal — the report was already generated.
async fn dispatch(cfg: &AppConfig, report: &str) {
    if cfg.recipients.is_empty() {
        warn!("no recipient emails configured (RECIPIENT_EMAILS is empty) — skipping send");
        return;
    }
    let Some(smtp) = &cfg.smtp else {
        warn!("SMTP not configured — skipping send");
        return;
    };

    info!(recipients = cfg.recipients.len(), "sending report via email");
    let sender = match EmailSender::new(smtp) {
        Ok(s) => s,
        Err(e) => {
            error!("failed to set up SMTP transport: {e:#}");
            return;
        }
    };
    match sender
        .send_report(&cfg.recipients, report, Local::now().date_naive())
        .await
    {
        Ok(()) => info!(recipients = cfg.recipients.len(), "report sent"),
        Err(e) => error!("failed to send email: {e:#}"),
    }
}
