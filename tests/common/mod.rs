#![allow(dead_code)]

use anyhow::{anyhow, Result};
use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

use daily_briefing::calendar::{CalendarEvent, CalendarService};
use daily_briefing::docs::{document_url, DocumentLayout, DocumentStore};
use daily_briefing::drive::FileStore;
use daily_briefing::error::AttemptError;
use daily_briefing::gemini::LanguageModel;
use daily_briefing::mail::MailSender;
use daily_briefing::model::{DocumentHandle, DriveFile};

pub async fn setup_pool() -> sqlx::SqlitePool {
    let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}

pub fn tz() -> FixedOffset {
    FixedOffset::east_opt(0).unwrap()
}

/// 2026-10-17 is a Saturday.
pub fn saturday() -> DateTime<FixedOffset> {
    tz().with_ymd_and_hms(2026, 10, 17, 6, 15, 0).unwrap()
}

pub fn friday() -> DateTime<FixedOffset> {
    tz().with_ymd_and_hms(2026, 10, 16, 6, 15, 0).unwrap()
}

pub fn sample_content() -> Value {
    json!({
        "intro": "X",
        "research": [{"title": "A", "specs": "S", "metrics": "M", "link": "L"}],
        "tools": [{"name": "T", "edge": "E", "link": "U"}],
        "strategy": "Z",
        "video": {"title": "V", "url": "W"}
    })
}

/// Wrap content the way the provider does: JSON text inside the first part.
pub fn envelope(content: &Value) -> String {
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": content.to_string() }] },
            "finishReason": "STOP"
        }]
    })
    .to_string()
}

#[derive(Clone, Default)]
pub struct RecordingModel {
    responses: Arc<Mutex<VecDeque<Result<String, AttemptError>>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl RecordingModel {
    pub fn with_responses(responses: Vec<Result<String, AttemptError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::from(responses))),
            ..Default::default()
        }
    }

    pub fn succeeding() -> Self {
        Self::with_responses(vec![Ok(envelope(&sample_content()))])
    }

    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl LanguageModel for RecordingModel {
    async fn generate(&self, model: &str, _prompt: &str) -> Result<String, AttemptError> {
        self.calls.lock().await.push(model.to_string());
        self.responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(AttemptError::Transport("no scripted response".into())))
    }
}

#[derive(Clone, Default)]
pub struct RecordingDocs {
    pub published: Arc<Mutex<Vec<(String, DocumentLayout)>>>,
}

#[async_trait::async_trait]
impl DocumentStore for RecordingDocs {
    async fn publish(&self, title: &str, layout: &DocumentLayout) -> Result<DocumentHandle> {
        let mut guard = self.published.lock().await;
        guard.push((title.to_string(), layout.clone()));
        let id = format!("doc-{}", guard.len());
        Ok(DocumentHandle {
            url: document_url(&id),
            id,
            name: title.to_string(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct SentMail {
    pub recipients: Vec<String>,
    pub subject: String,
    pub html: String,
}

#[derive(Clone, Default)]
pub struct RecordingMail {
    pub sent: Arc<Mutex<Vec<SentMail>>>,
    pub fail_next: Arc<Mutex<bool>>,
}

impl RecordingMail {
    pub fn failing_once() -> Self {
        Self {
            fail_next: Arc::new(Mutex::new(true)),
            ..Default::default()
        }
    }
}

#[async_trait::async_trait]
impl MailSender for RecordingMail {
    async fn send_html(&self, recipients: &[String], subject: &str, html: &str) -> Result<String> {
        let mut fail = self.fail_next.lock().await;
        if *fail {
            *fail = false;
            return Err(anyhow!("smtp relay unavailable"));
        }
        let mut sent = self.sent.lock().await;
        sent.push(SentMail {
            recipients: recipients.to_vec(),
            subject: subject.to_string(),
            html: html.to_string(),
        });
        Ok(format!("msg-{}", sent.len()))
    }
}

#[derive(Clone, Default)]
pub struct RecordingCalendar {
    pub events: Arc<Mutex<Vec<CalendarEvent>>>,
}

#[async_trait::async_trait]
impl CalendarService for RecordingCalendar {
    async fn create_event(&self, event: &CalendarEvent) -> Result<String> {
        let mut events = self.events.lock().await;
        events.push(event.clone());
        Ok(format!("evt-{}", events.len()))
    }
}

#[derive(Clone, Default)]
pub struct RecordingDrive {
    pub files: Arc<Mutex<Vec<DriveFile>>>,
    pub folders: Arc<Mutex<Vec<String>>>,
    pub moves: Arc<Mutex<Vec<(String, String)>>>,
    pub searches: Arc<Mutex<Vec<String>>>,
}

impl RecordingDrive {
    pub fn with_files(files: Vec<DriveFile>) -> Self {
        Self {
            files: Arc::new(Mutex::new(files)),
            ..Default::default()
        }
    }
}

pub fn drive_file(id: &str, created: DateTime<Utc>) -> DriveFile {
    DriveFile {
        id: id.into(),
        name: format!("AI Strategic Briefing - {id}"),
        created_time: created,
        parents: vec!["root".into()],
    }
}

#[async_trait::async_trait]
impl FileStore for RecordingDrive {
    async fn create_folder(&self, name: &str) -> Result<String> {
        let mut folders = self.folders.lock().await;
        folders.push(name.to_string());
        Ok(format!("folder-{}", folders.len()))
    }

    async fn search_by_name(&self, needle: &str) -> Result<Vec<DriveFile>> {
        self.searches.lock().await.push(needle.to_string());
        Ok(self
            .files
            .lock()
            .await
            .iter()
            .filter(|f| f.name.contains(needle))
            .cloned()
            .collect())
    }

    async fn move_file(&self, file: &DriveFile, folder_id: &str) -> Result<()> {
        self.moves
            .lock()
            .await
            .push((file.id.clone(), folder_id.to_string()));
        Ok(())
    }
}
