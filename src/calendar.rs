use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveTime, TimeZone};
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use crate::config::Config;
use crate::google::GoogleApi;

pub const REPORT_EVENT_TITLE: &str = "📄 AI Report Sent";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    pub summary: String,
    pub description: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

/// The daily log entry: 09:00-09:30 local on the run date, whatever time the
/// job actually ran. Each endpoint gets the offset `now`'s zone has at that
/// wall-clock time, so a run before a DST switch still lands on 09:00.
pub fn report_event<Tz: TimeZone>(
    now: &DateTime<Tz>,
    document_url: &str,
) -> Result<CalendarEvent> {
    let at = |h, m| -> Result<DateTime<FixedOffset>> {
        let time = NaiveTime::from_hms_opt(h, m, 0).context("invalid time of day")?;
        let local = now
            .date_naive()
            .and_time(time)
            .and_local_timezone(now.timezone())
            .earliest()
            .with_context(|| format!("{time} does not exist on {}", now.date_naive()))?;
        Ok(local.fixed_offset())
    };
    Ok(CalendarEvent {
        summary: REPORT_EVENT_TITLE.into(),
        description: document_url.into(),
        start: at(9, 0)?,
        end: at(9, 30)?,
    })
}

#[async_trait]
pub trait CalendarService: Send + Sync {
    /// Create a timed event; returns the event id.
    async fn create_event(&self, event: &CalendarEvent) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct GoogleCalendarClient {
    api: GoogleApi,
    calendar_id: String,
}

#[derive(Deserialize)]
struct EventResponse {
    id: String,
}

impl GoogleCalendarClient {
    pub fn new(api: GoogleApi, calendar_id: String) -> Self {
        Self { api, calendar_id }
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let api = GoogleApi::new(
            &cfg.google.endpoints.calendar,
            cfg.google.access_token.clone(),
            cfg.http_timeout(),
        )?;
        Ok(Self::new(api, cfg.google.calendar_id.clone()))
    }
}

#[async_trait]
impl CalendarService for GoogleCalendarClient {
    #[instrument(skip_all, fields(calendar = %self.calendar_id))]
    async fn create_event(&self, event: &CalendarEvent) -> Result<String> {
        let mut url = self.api.endpoint("calendar/v3/calendars")?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("calendar base URL cannot have a path"))?
            .pop_if_empty()
            .push(&self.calendar_id)
            .push("events");

        let body = json!({
            "summary": event.summary,
            "description": event.description,
            "start": { "dateTime": event.start.to_rfc3339() },
            "end": { "dateTime": event.end.to_rfc3339() },
        });
        let created: EventResponse = self
            .api
            .execute(Method::POST, url, Some(&body))
            .await
            .context("failed to create calendar event")?;
        info!(event_id = %created.id, start = %event.start, "calendar event created");
        Ok(created.id)
    }
}
