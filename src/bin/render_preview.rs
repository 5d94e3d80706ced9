use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use std::path::{Path, PathBuf};

use daily_briefing::docs::{self, document_url};
use daily_briefing::mail;
use daily_briefing::model::{BriefingContent, DocumentHandle};
use daily_briefing::prompt::display_date;

#[derive(Debug, Parser)]
#[command(
    about = "Render a briefing JSON file into the email HTML and a document outline, without calling any service"
)]
struct Args {
    /// BriefingContent JSON, as returned by the model
    #[arg(long)]
    input: PathBuf,

    /// Directory receiving email.html and document.txt
    #[arg(long, default_value = "preview")]
    out_dir: PathBuf,

    /// Date shown in titles (defaults to today)
    #[arg(long)]
    date: Option<String>,

    /// Document title prefix
    #[arg(long, default_value = "AI Strategic Briefing -")]
    title_prefix: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let raw = std::fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let content: BriefingContent =
        serde_json::from_str(&raw).context("input is not a valid briefing")?;
    content.validate()?;

    let date = args
        .date
        .unwrap_or_else(|| display_date(&Local::now().fixed_offset()));
    let (html, outline) = render(&content, &date, &args.title_prefix);
    write_outputs(&args.out_dir, &html, &outline)?;
    println!("{}", args.out_dir.join("email.html").display());
    println!("{}", args.out_dir.join("document.txt").display());
    Ok(())
}

fn render(content: &BriefingContent, date: &str, prefix: &str) -> (String, String) {
    let placeholder = DocumentHandle {
        id: "preview".into(),
        name: docs::document_title(prefix, date),
        url: document_url("preview"),
    };
    let html = mail::render_email_html(content, date, &placeholder);
    let outline = docs::render_document(content, date).outline();
    (html, outline)
}

fn write_outputs(dir: &Path, html: &str, outline: &str) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    std::fs::write(dir.join("email.html"), html)?;
    std::fs::write(dir.join("document.txt"), outline)?;
    Ok(())
}
