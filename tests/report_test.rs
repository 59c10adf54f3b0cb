//! End-to-end assembly tests: canned source payloads through parsing and
//! prompt assembly, asserting the fields that must reach the model and the
//! email.

use daily_report::config::JiraConfig;
use daily_report::mailer::report_subject;
use daily_report::report::generator::extract_response_text;
use daily_report::report::prompt::build_user_prompt;
use daily_report::report::{should_generate, ActivityData};
use daily_report::sources::clockify::TimeEntry;
use daily_report::sources::github::{parse_commit_history, GitHubActivity};
use daily_report::sources::gitlab::Commit;
use daily_report::sources::jira::{JiraActivity, JiraClient};
use serde_json::json;

fn jira_client() -> JiraClient {
    JiraClient::new(&JiraConfig {
        base_url: "https://acme.atlassian.net".to_string(),
        email: "dev@acme.test".to_string(),
        api_token: "token".to_string(),
        closed_date_field: "customfield_10100".to_string(),
        start_date_field: "customfield_10101".to_string(),
    })
    .expect("building the client needs no network")
}

fn canned_activity() -> ActivityData {
    let client = jira_client();
    let issue = json!({
        "key": "PAY-42",
        "fields": {
            "summary": "Refund endpoint returns 500",
            "status": {
                "name": "In Progress",
                "statusCategory": { "name": "In Progress", "key": "indeterminate" }
            },
            "issuetype": { "name": "Bug" },
            "project": { "key": "PAY", "name": "Payments" }
        }
    });
    let task = client.parse_issue(&issue);

    let github_body = json!({
        "data": { "repository": { "defaultBranchRef": { "target": { "history": { "edges": [
            { "node": {
                "message": "docs: update runbook",
                "committedDate": "2026-08-28T11:00:00Z",
                "url": "https://github.com/acme/runbooks/commit/cafe",
                "author": { "name": "Dev", "email": "dev@acme.test", "user": { "login": "dev" } }
            }}
        ]}}}}}
    });

    ActivityData {
        commits: vec![Commit {
            project: "billing".to_string(),
            project_path: "acme/billing".to_string(),
            message: "fix: rounding error in refunds".to_string(),
            short_id: "abc1234".to_string(),
            date: "2026-08-28T09:15:00Z".to_string(),
            url: "https://gitlab.com/acme/billing/-/commit/abc1234".to_string(),
            author_name: "Dev".to_string(),
            author_email: "dev@acme.test".to_string(),
        }],
        jira: JiraActivity {
            tasks_in_progress: vec![task.clone()],
            tasks_closed_today: vec![],
            all_my_tasks: vec![task],
            boards: vec![],
        },
        time_entries: vec![TimeEntry {
            name: "Debugging refunds".to_string(),
            project_name: "Billing".to_string(),
            task: Some("PAY-42".to_string()),
            minutes: 90,
            start: "2026-08-28T09:00:00Z".to_string(),
            end: Some("2026-08-28T10:30:00Z".to_string()),
            is_running: false,
            tags: vec![],
        }],
        github: GitHubActivity {
            tasks: vec![],
            commits: parse_commit_history("runbooks", &github_body),
        },
    }
}

#[test]
fn prompt_contains_every_source_field() {
    let data = canned_activity();
    let prompt = build_user_prompt(&data, "Склади звіт за {date}.", "2026-08-28");

    // GitLab
    assert!(prompt.contains("## GitLab Commits:"));
    assert!(prompt.contains("### billing:"));
    assert!(prompt.contains("- fix: rounding error in refunds (2026-08-28)"));

    // Jira — parsed from the canned API payload.
    assert!(prompt.contains("### В роботі:"));
    assert!(prompt.contains("- [PAY-42] Refund endpoint returns 500 (Проект: Payments)"));
    assert!(prompt.contains("### Всього активних задач: 1"));

    // Clockify
    assert!(prompt.contains("- Debugging refunds (Billing) - 1h 30m"));
    assert!(prompt.contains("**Загальний час: 1h 30m**"));

    // GitHub — parsed from the canned GraphQL payload.
    assert!(prompt.contains("### runbooks:"));
    assert!(prompt.contains("- docs: update runbook (2026-08-28)"));

    // Template with date substituted comes last.
    assert!(prompt.ends_with("Склади звіт за 2026-08-28."));
}

#[test]
fn activity_gate_honors_clockify_requirement() {
    let mut data = canned_activity();
    assert!(should_generate(true, &data));

    data.time_entries.clear();
    assert!(!should_generate(true, &data), "required clockify blocks the run");
    assert!(should_generate(false, &data), "commits alone qualify otherwise");

    let empty = ActivityData::default();
    assert!(!should_generate(false, &empty), "no activity at all skips");
}

#[test]
fn email_subject_matches_report_date() {
    let date = chrono::NaiveDate::from_ymd_opt(2026, 8, 28).unwrap();
    assert_eq!(report_subject(date), "Щоденний звіт - 2026-08-28");
}

#[test]
fn model_response_shapes_all_extract() {
    let report = "Сьогодні виправлено помилку округлення у рефандах.";
    for payload in [
        json!({ "output_text": report }),
        json!({ "output": [{ "content": [{ "type": "output_text", "text": report }] }] }),
        json!({ "choices": [{ "message": { "content": report } }] }),
    ] {
        assert_eq!(extract_response_text(&payload).as_deref(), Some(report));
    }
}
