use anyhow::Result;
use chrono::{Duration, Local};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use daily_briefing::archive::{self, ArchivePolicy};
use daily_briefing::config;
use daily_briefing::drive::DriveClient;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Move recent briefing documents into a dated archive folder, regardless of weekday"
)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Look-back window in days (defaults to archive.window_days)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    window_days: Option<u32>,

    /// List matching documents without creating a folder or moving anything
    #[arg(long)]
    dry_run: bool,
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

    let mut policy = ArchivePolicy::from_config(&cfg.archive)?;
    if let Some(days) = args.window_days {
        policy = policy.with_window(Duration::days(i64::from(days)));
    }

    let drive = DriveClient::from_config(&cfg)?;
    let now = Local::now().fixed_offset();
    let report = archive::sweep(&drive, &policy, &now, args.dry_run).await?;

    for id in &report.moved {
        println!("{id}");
    }
    info!(
        folder = %report.folder_name,
        folder_id = report.folder_id.as_deref().unwrap_or("-"),
        moved = report.moved.len(),
        skipped = report.skipped,
        dry_run = args.dry_run,
        "archive sweep complete"
    );
    Ok(())
}
