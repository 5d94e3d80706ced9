//! Weekly consolidation of generated briefing documents.
use anyhow::{anyhow, Result};
use chrono::{DateTime, Datelike, Duration, FixedOffset, Weekday};
use tracing::{info, instrument};

use crate::config::Archive;
use crate::drive::FileStore;
use crate::model::DriveFile;
use crate::prompt::display_date;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivePolicy {
    pub title_prefix: String,
    pub folder_prefix: String,
    pub window: Duration,
    pub weekday: Weekday,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveReport {
    pub folder_name: String,
    /// `None` on a dry run.
    pub folder_id: Option<String>,
    pub moved: Vec<String>,
    pub skipped: usize,
}

impl ArchivePolicy {
    pub fn from_config(cfg: &Archive) -> Result<Self> {
        let weekday = cfg
            .archive_weekday()
            .ok_or_else(|| anyhow!("archive.weekday {:?} is not a day of the week", cfg.weekday))?;
        Ok(Self {
            title_prefix: cfg.title_prefix.clone(),
            folder_prefix: cfg.folder_prefix.clone(),
            window: cfg.window(),
            weekday,
        })
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    pub fn is_archive_day(&self, now: &DateTime<FixedOffset>) -> bool {
        now.weekday() == self.weekday
    }

    pub fn folder_name(&self, now: &DateTime<FixedOffset>) -> String {
        format!("{} {}", self.folder_prefix.trim_end(), display_date(now))
    }
}

/// Files younger than `window`, measured from `now` (strict).
pub fn select_recent<'a>(
    files: &'a [DriveFile],
    now: &DateTime<FixedOffset>,
    window: Duration,
) -> Vec<&'a DriveFile> {
    files
        .iter()
        .filter(|f| now.signed_duration_since(f.created_time) < window)
        .collect()
}

/// Create the dated folder and move every recent matching document into it.
#[instrument(skip_all, fields(window_days = policy.window.num_days(), dry_run = dry_run))]
pub async fn sweep(
    store: &dyn FileStore,
    policy: &ArchivePolicy,
    now: &DateTime<FixedOffset>,
    dry_run: bool,
) -> Result<ArchiveReport> {
    let folder_name = policy.folder_name(now);
    let matches = store.search_by_name(&policy.title_prefix).await?;
    let recent = select_recent(&matches, now, policy.window);
    let skipped = matches.len() - recent.len();

    if dry_run {
        for f in &recent {
            info!(file = %f.name, created = %f.created_time, "would archive");
        }
        return Ok(ArchiveReport {
            folder_name,
            folder_id: None,
            moved: recent.iter().map(|f| f.id.clone()).collect(),
            skipped,
        });
    }

    let folder_id = store.create_folder(&folder_name).await?;
    let mut moved = Vec::with_capacity(recent.len());
    for f in recent {
        store.move_file(f, &folder_id).await?;
        moved.push(f.id.clone());
    }
    info!(folder = %folder_name, moved = moved.len(), skipped, "archive sweep finished");
    Ok(ArchiveReport {
        folder_name,
        folder_id: Some(folder_id),
        moved,
        skipped,
    })
}
