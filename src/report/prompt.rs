// SPDX-License-Identifier: MIT
//! Deterministic prompt assembly from the aggregated activity data.
//!
//! Section headings and empty-state lines are in Ukrainian because the
//! generated report is. The assembled markdown is what the model sees, so
//! formatting here is part of the output contract and covered by tests.

use std::path::Path;

use tracing::warn;

use crate::sources::clockify::TimeEntry;
use crate::sources::github::GitHubActivity;
use crate::sources::gitlab::Commit;
use crate::sources::jira::JiraActivity;

use super::ActivityData;

/// Open tasks beyond this count are collapsed into an overflow line.
const OPEN_TASKS_SHOWN: usize = 10;

/// Optional on-disk templates: `prompt.md` (appended to the data sections,
/// `{date}` substituted) and `system_role.md` (the model instructions).
#[derive(Debug, Clone, Default)]
pub struct Templates {
    pub prompt: String,
    pub system_role: String,
}

/// Load templates from `dir`, tolerating missing files.
pub fn load_templates(dir: &Path) -> Templates {
    Templates {
        prompt: read_template(&dir.join("prompt.md")),
        system_role: read_template(&dir.join("system_role.md")),
    }
}

fn read_template(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(content) => strip_filepath_comment(&content).trim().to_string(),
        Err(_) => {
            warn!(path = %path.display(), "template file not found");
            String::new()
        }
    }
}

/// Drop a leading `<!-- filepath: ... -->` editor comment line.
fn strip_filepath_comment(content: &str) -> &str {
    if content.starts_with("<!-- filepath:") {
        match content.split_once('\n') {
            Some((_, rest)) => rest,
            None => "",
        }
    } else {
        content
    }
}

// ─── Section formatting ───────────────────────────────────────────────────────

/// GitLab commits grouped by project, first line of each message.
pub fn format_gitlab_section(commits: &[Commit]) -> String {
    if commits.is_empty() {
        return "## GitLab Commits:\nНемає комітів за сьогодні.\n".to_string();
    }

    let mut text = String::from("## GitLab Commits:\n\n");

    // Group by project, preserving first-seen order.
    let mut projects: Vec<(&str, Vec<&Commit>)> = Vec::new();
    for commit in commits {
        match projects.iter_mut().find(|(name, _)| *name == commit.project) {
            Some((_, list)) => list.push(commit),
            None => projects.push((&commit.project, vec![commit])),
        }
    }

    for (project, project_commits) in projects {
        text.push_str(&format!("### {project}:\n"));
        for commit in project_commits {
            let date = commit.date.get(..10).unwrap_or("");
            text.push_str(&format!("- {} ({date})\n", commit.message));
        }
        text.push('\n');
    }

    text
}

/// Jira tasks: in progress, closed today, then a capped list of open tasks.
pub fn format_jira_section(jira: &JiraActivity) -> String {
    let mut text = String::from("## Jira Tasks:\n\n");

    if !jira.tasks_in_progress.is_empty() {
        text.push_str("### В роботі:\n");
        for task in &jira.tasks_in_progress {
            text.push_str(&format!(
                "- [{}] {} (Проект: {})\n",
                task.key, task.summary, task.project
            ));
        }
        text.push('\n');
    }

    if !jira.tasks_closed_today.is_empty() {
        text.push_str("### Закриті сьогодні:\n");
        for task in &jira.tasks_closed_today {
            text.push_str(&format!(
                "- [{}] {} (Проект: {})\n",
                task.key, task.summary, task.project
            ));
        }
        text.push('\n');
    }

    if !jira.all_my_tasks.is_empty() {
        text.push_str(&format!(
            "### Всього активних задач: {}\n",
            jira.all_my_tasks.len()
        ));
        for task in jira.all_my_tasks.iter().take(OPEN_TASKS_SHOWN) {
            text.push_str(&format!("- [{}] {} - {}\n", task.key, task.summary, task.status));
        }
        if jira.all_my_tasks.len() > OPEN_TASKS_SHOWN {
            text.push_str(&format!(
                "... та ще {} задач\n",
                jira.all_my_tasks.len() - OPEN_TASKS_SHOWN
            ));
        }
        text.push('\n');
    }

    if jira.tasks_in_progress.is_empty()
        && jira.tasks_closed_today.is_empty()
        && jira.all_my_tasks.is_empty()
    {
        text.push_str("Немає задач у Jira.\n");
    }

    text
}

fn format_minutes(minutes: i64) -> String {
    let hours = minutes / 60;
    let mins = minutes % 60;
    if hours > 0 {
        format!("{hours}h {mins}m")
    } else {
        format!("{mins}m")
    }
}

/// Clockify entries with per-entry durations and a daily total.
pub fn format_clockify_section(entries: &[TimeEntry]) -> String {
    if entries.is_empty() {
        return "## Clockify Time Tracking:\nНемає записів часу за сьогодні.\n".to_string();
    }

    let mut text = String::from("## Clockify Time Tracking:\n\n");
    let mut total_minutes = 0i64;

    for entry in entries {
        total_minutes += entry.minutes;
        text.push_str(&format!(
            "- {} ({}) - {}\n",
            entry.name,
            entry.project_name,
            format_minutes(entry.minutes)
        ));
    }

    text.push_str(&format!(
        "\n**Загальний час: {}h {}m**\n",
        total_minutes / 60,
        total_minutes % 60
    ));
    text
}

/// GitHub board tasks and commits. Empty when the source produced nothing,
/// so an unconfigured GitHub integration leaves no trace in the prompt.
pub fn format_github_section(activity: &GitHubActivity) -> String {
    if activity.tasks.is_empty() && activity.commits.is_empty() {
        return String::new();
    }

    let mut text = String::from("## GitHub Activity:\n\n");

    if !activity.commits.is_empty() {
        let mut repos: Vec<(&str, Vec<&crate::sources::github::GitHubCommit>)> = Vec::new();
        for commit in &activity.commits {
            match repos.iter_mut().find(|(name, _)| *name == commit.repo) {
                Some((_, list)) => list.push(commit),
                None => repos.push((&commit.repo, vec![commit])),
            }
        }
        for (repo, commits) in repos {
            text.push_str(&format!("### {repo}:\n"));
            for commit in commits {
                let message = commit.message.lines().next().unwrap_or_default();
                let date = commit.date.get(..10).unwrap_or("");
                text.push_str(&format!("- {message} ({date})\n"));
            }
            text.push('\n');
        }
    }

    if !activity.tasks.is_empty() {
        text.push_str("### Задачі на дошці:\n");
        for task in &activity.tasks {
            let title = task.title.as_deref().unwrap_or("(без назви)");
            let status = task
                .status
                .as_deref()
                .or(task.state.as_deref())
                .unwrap_or("—");
            text.push_str(&format!("- {title} - {status}\n"));
        }
        text.push('\n');
    }

    text
}

/// Assemble the full user prompt: data sections, then the prompt template
/// with `{date}` substituted. Empty sections are dropped.
pub fn build_user_prompt(data: &ActivityData, template: &str, date: &str) -> String {
    let sections = [
        format_gitlab_section(&data.commits),
        format_jira_section(&data.jira),
        format_clockify_section(&data.time_entries),
        format_github_section(&data.github),
        template.replace("{date}", date),
    ];

    sections
        .iter()
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.trim_end())
        .collect::<Vec<_>>()
        .join("\n\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::github::GitHubCommit;
    use crate::sources::jira::JiraTask;

    fn commit(project: &str, message: &str) -> Commit {
        Commit {
            project: project.to_string(),
            project_path: format!("acme/{project}"),
            message: message.to_string(),
            short_id: "abc1234".to_string(),
            date: "2026-08-28T09:00:00Z".to_string(),
            url: String::new(),
            author_name: "Dev".to_string(),
            author_email: "dev@acme.test".to_string(),
        }
    }

    fn task(key: &str, summary: &str, status: &str) -> JiraTask {
        JiraTask {
            key: key.to_string(),
            summary: summary.to_string(),
            status: status.to_string(),
            status_category: String::new(),
            issue_type: "Task".to_string(),
            project_key: "PAY".to_string(),
            project: "Payments".to_string(),
            assignee: None,
            priority: None,
            description: None,
            created: String::new(),
            updated: String::new(),
            resolution_date: None,
            closed_date: None,
            start_date: None,
            labels: vec![],
            components: vec![],
            url: String::new(),
        }
    }

    fn entry(name: &str, minutes: i64) -> TimeEntry {
        TimeEntry {
            name: name.to_string(),
            project_name: "Billing".to_string(),
            task: None,
            minutes,
            start: String::new(),
            end: None,
            is_running: false,
            tags: vec![],
        }
    }

    #[test]
    fn gitlab_commits_grouped_by_project_in_order() {
        let commits = vec![
            commit("billing", "fix rounding"),
            commit("frontend", "add widget"),
            commit("billing", "bump version"),
        ];
        let text = format_gitlab_section(&commits);
        let billing_pos = text.find("### billing:").unwrap();
        let frontend_pos = text.find("### frontend:").unwrap();
        assert!(billing_pos < frontend_pos);
        assert!(text.contains("- fix rounding (2026-08-28)"));
        assert!(text.contains("- bump version (2026-08-28)"));
    }

    #[test]
    fn empty_gitlab_section_has_placeholder() {
        assert!(format_gitlab_section(&[]).contains("Немає комітів за сьогодні."));
    }

    #[test]
    fn jira_section_lists_progress_and_closed() {
        let jira = JiraActivity {
            tasks_in_progress: vec![task("PAY-1", "Refund bug", "In Progress")],
            tasks_closed_today: vec![task("PAY-2", "Invoice export", "Done")],
            all_my_tasks: vec![task("PAY-1", "Refund bug", "In Progress")],
            boards: vec![],
        };
        let text = format_jira_section(&jira);
        assert!(text.contains("### В роботі:"));
        assert!(text.contains("- [PAY-1] Refund bug (Проект: Payments)"));
        assert!(text.contains("### Закриті сьогодні:"));
        assert!(text.contains("- [PAY-2] Invoice export (Проект: Payments)"));
        assert!(text.contains("### Всього активних задач: 1"));
    }

    #[test]
    fn jira_open_tasks_overflow_is_collapsed() {
        let jira = JiraActivity {
            all_my_tasks: (0..13).map(|i| task(&format!("PAY-{i}"), "t", "To Do")).collect(),
            ..Default::default()
        };
        let text = format_jira_section(&jira);
        assert!(text.contains("### Всього активних задач: 13"));
        assert!(text.contains("... та ще 3 задач"));
        // Only the first 10 are listed.
        assert!(text.contains("- [PAY-9]"));
        assert!(!text.contains("- [PAY-10]"));
    }

    #[test]
    fn empty_jira_section_has_placeholder() {
        assert!(format_jira_section(&JiraActivity::default()).contains("Немає задач у Jira."));
    }

    #[test]
    fn clockify_section_totals_minutes() {
        let entries = vec![entry("Code review", 105), entry("Standup", 15)];
        let text = format_clockify_section(&entries);
        assert!(text.contains("- Code review (Billing) - 1h 45m"));
        assert!(text.contains("- Standup (Billing) - 15m"));
        assert!(text.contains("**Загальний час: 2h 0m**"));
    }

    #[test]
    fn empty_clockify_section_has_placeholder() {
        assert!(format_clockify_section(&[]).contains("Немає записів часу за сьогодні."));
    }

    #[test]
    fn github_section_empty_when_no_activity() {
        assert!(format_github_section(&GitHubActivity::default()).is_empty());
    }

    #[test]
    fn github_section_groups_commits_by_repo() {
        let activity = GitHubActivity {
            tasks: vec![],
            commits: vec![GitHubCommit {
                repo: "reports".to_string(),
                message: "chore: bump deps\n\nbody".to_string(),
                date: "2026-08-28T07:00:00Z".to_string(),
                url: String::new(),
                author: "Dev".to_string(),
            }],
        };
        let text = format_github_section(&activity);
        assert!(text.contains("### reports:"));
        assert!(text.contains("- chore: bump deps (2026-08-28)"));
    }

    #[test]
    fn user_prompt_contains_all_sections_and_date() {
        let data = ActivityData {
            commits: vec![commit("billing", "fix rounding")],
            jira: JiraActivity::default(),
            time_entries: vec![entry("Standup", 15)],
            github: GitHubActivity::default(),
        };
        let prompt = build_user_prompt(&data, "Склади звіт за {date}.", "2026-08-28");
        assert!(prompt.contains("## GitLab Commits:"));
        assert!(prompt.contains("## Jira Tasks:"));
        assert!(prompt.contains("## Clockify Time Tracking:"));
        assert!(prompt.contains("Склади звіт за 2026-08-28."));
        assert!(!prompt.contains("## GitHub Activity:"));
        assert!(!prompt.ends_with('\n'));
    }

    #[test]
    fn filepath_comment_is_stripped_from_templates() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("prompt.md"),
            "<!-- filepath: /home/dev/prompt.md -->\nСклади звіт за {date}.\n",
        )
        .unwrap();
        let templates = load_templates(dir.path());
        assert_eq!(templates.prompt, "Склади звіт за {date}.");
        assert_eq!(templates.system_role, "");
    }
}
