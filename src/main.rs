use anyhow::Result;
use chrono::Local;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use daily_briefing::calendar::GoogleCalendarClient;
use daily_briefing::config;
use daily_briefing::db;
use daily_briefing::docs::DocsClient;
use daily_briefing::drive::DriveClient;
use daily_briefing::gemini::GeminiClient;
use daily_briefing::job::{self, JobSettings, RunOutcome, Services};
use daily_briefing::mail::GmailClient;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Generate, publish and email today's AI briefing, then exit"
)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Do not run the archive sweep, even on the archive day
    #[arg(long)]
    skip_archive: bool,

    /// Start a new run even if today's briefing already completed
    #[arg(long)]
    force: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;

    let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| {
        format!("sqlite://{}/briefing.db", cfg.app.resolved_data_dir())
    });
    let pool = db::init_pool(&database_url).await?;
    db::run_migrations(&pool).await?;

    let llm = GeminiClient::from_config(&cfg)?;
    let docs = DocsClient::from_config(&cfg)?;
    let mail = GmailClient::from_config(&cfg)?;
    let calendar = GoogleCalendarClient::from_config(&cfg)?;
    let drive = DriveClient::from_config(&cfg)?;
    let services = Services {
        llm: &llm,
        docs: &docs,
        mail: &mail,
        calendar: &calendar,
        drive: &drive,
    };

    let mut settings = JobSettings::from_config(&cfg)?;
    settings.skip_archive = args.skip_archive;
    settings.force = args.force;

    match job::run_briefing(&pool, services, &settings, Local::now()).await? {
        RunOutcome::Completed(summary) => {
            info!(
                run_id = %summary.run_id,
                resumed = summary.resumed,
                document = %summary.document.url,
                archived = summary.archive.as_ref().map(|a| a.moved.len()).unwrap_or(0),
                "daily briefing delivered"
            );
        }
        RunOutcome::AlreadyCompleted { run_id } => {
            info!(%run_id, "today's briefing was already delivered; use --force to send another");
        }
    }
    Ok(())
}
