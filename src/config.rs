//! Environment-driven configuration for every integration.
//!
//! All credentials and endpoints come from environment variables (a `.env`
//! file is loaded at startup). Each integration has its own config struct
//! with a fallible `from_env()`; a missing optional integration degrades to
//! `None` at the [`AppConfig`] level instead of aborting the run.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable is not set")]
    MissingVar(&'static str),
}

/// Read a required environment variable. Empty values count as missing.
fn require(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::MissingVar(name))
}

/// Read an optional environment variable. Empty values count as unset.
fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Parse a boolean env value the way the shell scripts write them:
/// `true` / `TRUE` / `True` are true, everything else is false.
pub fn parse_bool(value: &str) -> bool {
    value.eq_ignore_ascii_case("true")
}

/// Split a comma-separated recipient list, trimming whitespace and
/// dropping empty entries.
pub fn parse_recipients(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// ─── GitLabConfig ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct GitLabConfig {
    pub token: String,
    /// Instance base URL without trailing slash (default: https://gitlab.com).
    pub base_url: String,
}

impl GitLabConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            token: require("GITLAB_TOKEN")?,
            base_url: optional("GITLAB_URL")
                .unwrap_or_else(|| "https://gitlab.com".to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }
}

// ─── JiraConfig ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct JiraConfig {
    /// Site base URL without trailing slash, e.g. https://acme.atlassian.net.
    pub base_url: String,
    pub email: String,
    pub api_token: String,
    /// Custom field id holding the date a task was closed.
    pub closed_date_field: String,
    /// Custom field id holding the date work on a task started.
    pub start_date_field: String,
}

impl JiraConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: require("JIRA_URL")?.trim_end_matches('/').to_string(),
            email: require("JIRA_EMAIL")?,
            api_token: require("JIRA_API_TOKEN")?,
            closed_date_field: optional("JIRA_CLOSED_DATE_FIELD")
                .unwrap_or_else(|| "customfield_10100".to_string()),
            start_date_field: optional("JIRA_START_DATE_FIELD")
                .unwrap_or_else(|| "customfield_10101".to_string()),
        })
    }
}

// ─── ClockifyConfig ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ClockifyConfig {
    pub api_key: String,
}

impl ClockifyConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: require("CLOCKIFY_API_KEY")?,
        })
    }
}

// ─── GitHubConfig ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct GitHubConfig {
    pub token: String,
    /// Login of the user whose repositories and project board are read.
    pub owner: Option<String>,
    /// ProjectV2 board number to pull tasks from.
    pub project_number: Option<i64>,
}

impl GitHubConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            token: require("GH_TOKEN")?,
            owner: optional("GH_OWNER"),
            project_number: optional("GH_PROJECT_NUMBER").and_then(|v| v.parse().ok()),
        })
    }
}

// ─── OpenAiConfig ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    /// Stored-prompt id in the OpenAI dashboard. When set, the request uses
    /// `prompt: { id }` instead of local instructions.
    pub prompt_id: Option<String>,
    pub base_url: String,
}

impl OpenAiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: require("OPENAI_API_KEY")?,
            model: optional("OPENAI_MODEL").unwrap_or_else(|| "gpt-5.2-mini".to_string()),
            prompt_id: optional("OPENAI_PROMPT_ID"),
            base_url: optional("OPENAI_BASE_URL")
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }
}

// ─── SmtpConfig ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub server: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    /// From address (default: the SMTP user).
    pub sender: String,
    /// true = implicit TLS (port 465), false = STARTTLS (port 587).
    pub use_ssl: bool,
}

impl SmtpConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let user = require("SMTP_USER")?;
        Ok(Self {
            server: optional("SMTP_SERVER").unwrap_or_else(|| "smtp.gmail.com".to_string()),
            port: optional("SMTP_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(465),
            password: require("SMTP_PASSWORD")?,
            sender: optional("SENDER_EMAIL").unwrap_or_else(|| user.clone()),
            use_ssl: optional("SMTP_USE_SSL").map(|v| parse_bool(&v)).unwrap_or(true),
            user,
        })
    }
}

// ─── AppConfig ────────────────────────────────────────────────────────────────

/// Fully resolved application configuration.
///
/// `openai` is the only hard requirement — without it there is nothing to
/// generate. Every other integration is optional: when its variables are
/// missing the corresponding field is `None` and the pipeline logs and skips
/// that source.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gitlab: Option<GitLabConfig>,
    pub jira: Option<JiraConfig>,
    pub clockify: Option<ClockifyConfig>,
    pub github: Option<GitHubConfig>,
    pub openai: OpenAiConfig,
    pub smtp: Option<SmtpConfig>,
    /// Parsed RECIPIENT_EMAILS list. Empty = report generated but not sent.
    pub recipients: Vec<String>,
    /// REQUIRE_CLOCKIFY_ENTRIES (default: true) — skip the whole report when
    /// no time was tracked today, even if commits or tasks exist.
    pub require_clockify_entries: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            gitlab: GitLabConfig::from_env().ok(),
            jira: JiraConfig::from_env().ok(),
            clockify: ClockifyConfig::from_env().ok(),
            github: GitHubConfig::from_env().ok(),
            openai: OpenAiConfig::from_env()?,
            smtp: SmtpConfig::from_env().ok(),
            recipients: optional("RECIPIENT_EMAILS")
                .map(|v| parse_recipients(&v))
                .unwrap_or_default(),
            require_clockify_entries: optional("REQUIRE_CLOCKIFY_ENTRIES")
                .map(|v| parse_bool(&v))
                .unwrap_or(true),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipients_are_trimmed_and_empties_dropped() {
        let list = parse_recipients(" a@example.com , ,b@example.com,, c@example.com ");
        assert_eq!(list, vec!["a@example.com", "b@example.com", "c@example.com"]);
    }

    #[test]
    fn empty_recipient_string_yields_empty_list() {
        assert!(parse_recipients("").is_empty());
        assert!(parse_recipients(" , ,").is_empty());
    }

    #[test]
    fn bool_parsing_is_case_insensitive() {
        assert!(parse_bool("true"));
        assert!(parse_bool("TRUE"));
        assert!(parse_bool("True"));
        assert!(!parse_bool("false"));
        assert!(!parse_bool("1"));
        assert!(!parse_bool(""));
    }
}
