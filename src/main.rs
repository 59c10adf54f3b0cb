use anyhow::Result;
use clap::{Parser, Subcommand};
use daily_report::config::AppConfig;
use daily_report::report;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "daily-report",
    about = "Daily activity report generator — aggregates commits, tasks, and time entries, then emails an AI-written summary",
    version
)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL")]
    log: Option<String>,

    /// Generate and print the report without sending email
    #[arg(long, global = true)]
    dry_run: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Generate and send today's report (default when no subcommand given).
    ///
    /// Examples:
    ///   daily-report run
    ///   daily-report run --dry-run
    ///   daily-report
    Run,
    /// Check which integrations are configured.
    ///
    /// Lists every integration with the environment variables it needs and
    /// whether they are set. Exit code 0 when the required variables are
    /// present, 1 otherwise.
    ///
    /// Examples:
    ///   daily-report doctor
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before clap resolves env-backed args.
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let filter = args
        .log
        .clone()
        .map(EnvFilter::new)
        .unwrap_or_else(|| EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match args.command.unwrap_or(Command::Run) {
        Command::Run => run(args.dry_run).await,
        Command::Doctor => {
            if !doctor() {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

async fn run(dry_run: bool) -> Result<()> {
    warn_missing_optional();

    let cfg = AppConfig::from_env().map_err(|e| {
        anyhow::anyhow!("missing required environment variables: {e}")
    })?;

    match report::run(&cfg, dry_run).await? {
        Some(_) => info!("daily report run finished"),
        None => info!("daily report skipped"),
    }
    Ok(())
}

/// Mirror of the startup validation: required vars abort, optional vars
/// only warn so a partially configured setup still produces a report.
fn warn_missing_optional() {
    let optional = ["GITLAB_TOKEN", "JIRA_URL", "CLOCKIFY_API_KEY"];
    let missing: Vec<&str> = optional
        .iter()
        .copied()
        .filter(|var| std::env::var(var).ok().filter(|v| !v.is_empty()).is_none())
        .collect();
    if !missing.is_empty() {
        warn!("missing optional environment variables: {}", missing.join(", "));
    }
}

fn is_set(var: &str) -> bool {
    std::env::var(var).ok().filter(|v| !v.is_empty()).is_some()
}

/// Print the configuration status of every integration.
/// Returns false when a hard-required variable is missing.
fn doctor() -> bool {
    let groups: &[(&str, &[&str], bool)] = &[
        ("openai", &["OPENAI_API_KEY"], true),
        ("gitlab", &["GITLAB_TOKEN"], false),
        ("jira", &["JIRA_URL", "JIRA_EMAIL", "JIRA_API_TOKEN"], false),
        ("clockify", &["CLOCKIFY_API_KEY"], false),
        ("github", &["GH_TOKEN", "GH_OWNER"], false),
        ("smtp", &["SMTP_USER", "SMTP_PASSWORD"], false),
        ("recipients", &["RECIPIENT_EMAILS"], false),
    ];

    let mut ok = true;
    println!("daily-report configuration:");
    for (name, vars, required) in groups {
        let missing: Vec<&str> = vars.iter().copied().filter(|v| !is_set(v)).collect();
        if missing.is_empty() {
            println!("  ✓ {name}");
        } else if *required {
            println!("  ✗ {name} — missing {} (required)", missing.join(", "));
            ok = false;
        } else {
            println!("  - {name} — missing {} (will be skipped)", missing.join(", "));
        }
    }
    ok
}
