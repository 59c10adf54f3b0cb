//! Daily activity report generator.
//!
//! Aggregates a user's daily activity (GitLab commits, Jira tasks, Clockify
//! time entries, optional GitHub activity), asks an LLM to write a
//! human-readable status report, and emails it to a recipient list. One
//! invocation is one sequential pass; scheduling is external (cron / CI).

pub mod config;
pub mod mailer;
pub mod report;
pub mod sources;
