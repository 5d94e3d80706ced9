//! The briefing pipeline: generate, publish, mail, log, archive.
//!
//! Each external mutation is bracketed by ledger entries (`PENDING` before,
//! `DONE` with the external reference after). Re-running on the same date
//! resumes an unfinished run and skips the steps already done.
use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;
use tracing::{error, info, instrument, warn};

use crate::archive::{self, ArchivePolicy, ArchiveReport};
use crate::calendar::{self, CalendarService};
use crate::config::Config;
use crate::db::{self, Pool};
use crate::docs::{self, DocumentStore};
use crate::drive::FileStore;
use crate::gemini::LanguageModel;
use crate::generator::generate_briefing;
use crate::mail::{self, MailSender};
use crate::model::{BriefingContent, DocumentHandle, RunState, RunStep, StepState};
use crate::prompt::{build_prompt, display_date};

/// External collaborators used by one run.
#[derive(Clone, Copy)]
pub struct Services<'a> {
    pub llm: &'a dyn LanguageModel,
    pub docs: &'a dyn DocumentStore,
    pub mail: &'a dyn MailSender,
    pub calendar: &'a dyn CalendarService,
    pub drive: &'a dyn FileStore,
}

#[derive(Debug, Clone)]
pub struct JobSettings {
    pub models: Vec<String>,
    pub recipients: Vec<String>,
    pub title_prefix: String,
    pub archive: ArchivePolicy,
    /// Never sweep, even on the archive day.
    pub skip_archive: bool,
    /// Start a fresh run even if today's run already completed.
    pub force: bool,
}

impl JobSettings {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        Ok(Self {
            models: cfg.gemini.models.clone(),
            recipients: cfg.email.recipients.clone(),
            title_prefix: cfg.archive.title_prefix.clone(),
            archive: ArchivePolicy::from_config(&cfg.archive)?,
            skip_archive: false,
            force: false,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: String,
    pub resumed: bool,
    pub document: DocumentHandle,
    pub message_id: String,
    pub event_id: String,
    /// Present only when a sweep ran in this invocation.
    pub archive: Option<ArchiveReport>,
}

#[derive(Debug, Clone)]
pub enum RunOutcome {
    Completed(RunSummary),
    AlreadyCompleted { run_id: String },
}

/// Ledger view of the current run.
struct RunLedger<'a> {
    pool: &'a Pool,
    run_id: String,
    done: HashMap<RunStep, Option<String>>,
}

impl<'a> RunLedger<'a> {
    fn done_ref(&self, step: RunStep) -> Option<&str> {
        self.done.get(&step).and_then(|r| r.as_deref())
    }

    fn is_done(&self, step: RunStep) -> bool {
        self.done.contains_key(&step)
    }

    async fn pending(&self, step: RunStep) -> Result<()> {
        db::record_step(self.pool, &self.run_id, step, StepState::Pending, None, Utc::now()).await
    }

    async fn done(&mut self, step: RunStep, external_ref: &str) -> Result<()> {
        db::record_step(
            self.pool,
            &self.run_id,
            step,
            StepState::Done,
            Some(external_ref),
            Utc::now(),
        )
        .await?;
        self.done.insert(step, Some(external_ref.to_string()));
        Ok(())
    }
}

/// Run the briefing once for the day of `now`, in `now`'s time zone.
#[instrument(skip_all, fields(date = %now.date_naive()))]
pub async fn run_briefing<Tz: TimeZone>(
    pool: &Pool,
    services: Services<'_>,
    settings: &JobSettings,
    now: DateTime<Tz>,
) -> Result<RunOutcome> {
    let run_date = now.date_naive().to_string();
    let existing = db::latest_run_for_date(pool, &run_date).await?;

    let mut resumed_content = None;
    let (run_id, done, resumed) = match existing {
        Some(run) if run.state == RunState::Completed && !settings.force => {
            info!(run_id = %run.id, "briefing already completed for today");
            return Ok(RunOutcome::AlreadyCompleted { run_id: run.id });
        }
        Some(run) if run.state != RunState::Completed && !settings.force => {
            db::reopen_run(pool, &run.id).await?;
            let mut done = HashMap::new();
            for step in db::run_steps(pool, &run.id).await? {
                match step.state {
                    StepState::Done => {
                        done.insert(step.step, step.external_ref);
                    }
                    StepState::Pending => {
                        warn!(step = step.step.as_str(), "step was interrupted; retrying it");
                    }
                }
            }
            info!(run_id = %run.id, done = done.len(), "resuming unfinished run");
            resumed_content = run.content;
            (run.id, done, true)
        }
        _ => {
            let id = db::open_run(pool, &run_date, now.with_timezone(&Utc)).await?;
            info!(run_id = %id, "starting briefing run");
            (id, HashMap::new(), false)
        }
    };

    let mut ledger = RunLedger {
        pool,
        run_id,
        done,
    };
    match execute_steps(&mut ledger, services, settings, &now, resumed_content).await {
        Ok((document, message_id, event_id, archive)) => {
            db::finish_run(pool, &ledger.run_id, RunState::Completed, None, Utc::now()).await?;
            info!(run_id = %ledger.run_id, document = %document.url, "briefing run completed");
            Ok(RunOutcome::Completed(RunSummary {
                run_id: ledger.run_id,
                resumed,
                document,
                message_id,
                event_id,
                archive,
            }))
        }
        Err(err) => {
            error!(run_id = %ledger.run_id, "briefing run failed: {:#}", err);
            let message = format!("{err:#}");
            if let Err(ledger_err) =
                db::finish_run(pool, &ledger.run_id, RunState::Failed, Some(&message), Utc::now())
                    .await
            {
                warn!(?ledger_err, "could not mark run as failed");
            }
            Err(err)
        }
    }
}

type StepResults = (DocumentHandle, String, String, Option<ArchiveReport>);

async fn execute_steps<Tz: TimeZone>(
    ledger: &mut RunLedger<'_>,
    services: Services<'_>,
    settings: &JobSettings,
    now: &DateTime<Tz>,
    resumed_content: Option<BriefingContent>,
) -> Result<StepResults> {
    let local = now.fixed_offset();
    let date = display_date(&local);

    let content = match resumed_content {
        Some(content) if ledger.is_done(RunStep::Generate) => content,
        _ => {
            ledger.pending(RunStep::Generate).await?;
            let prompt = build_prompt(&date);
            let content = generate_briefing(services.llm, &settings.models, &prompt).await?;
            db::save_content(ledger.pool, &ledger.run_id, &content).await?;
            ledger.done(RunStep::Generate, "content").await?;
            content
        }
    };

    let document = match ledger.done_ref(RunStep::Document).map(str::to_owned) {
        Some(stored) => serde_json::from_str::<DocumentHandle>(&stored)
            .context("corrupt document reference in ledger")?,
        None => {
            ledger.pending(RunStep::Document).await?;
            let title = docs::document_title(&settings.title_prefix, &date);
            let layout = docs::render_document(&content, &date);
            let handle = services.docs.publish(&title, &layout).await?;
            ledger
                .done(RunStep::Document, &serde_json::to_string(&handle)?)
                .await?;
            handle
        }
    };

    let message_id = match ledger.done_ref(RunStep::Email).map(str::to_owned) {
        Some(id) => id,
        None => {
            ledger.pending(RunStep::Email).await?;
            let html = mail::render_email_html(&content, &date, &document);
            let id = services
                .mail
                .send_html(&settings.recipients, &mail::subject(&date), &html)
                .await?;
            ledger.done(RunStep::Email, &id).await?;
            id
        }
    };

    let event_id = match ledger.done_ref(RunStep::Calendar).map(str::to_owned) {
        Some(id) => id,
        None => {
            ledger.pending(RunStep::Calendar).await?;
            let event = calendar::report_event(now, &document.url)?;
            let id = services.calendar.create_event(&event).await?;
            ledger.done(RunStep::Calendar, &id).await?;
            id
        }
    };

    let mut report = None;
    if settings.skip_archive {
        info!("archive sweep skipped by request");
    } else if !settings.archive.is_archive_day(&local) {
        info!(weekday = ?settings.archive.weekday, "not an archive day");
    } else if ledger.is_done(RunStep::Archive) {
        info!("archive sweep already done for this run");
    } else {
        ledger.pending(RunStep::Archive).await?;
        let swept = archive::sweep(services.drive, &settings.archive, &local, false).await?;
        ledger
            .done(RunStep::Archive, swept.folder_id.as_deref().unwrap_or_default())
            .await?;
        report = Some(swept);
    }

    Ok((document, message_id, event_id, report))
}
