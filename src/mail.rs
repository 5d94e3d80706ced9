//! HTML email rendering and delivery through the Gmail API.
use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use std::fmt::Write as _;
use tracing::{info, instrument};

use crate::config::Config;
use crate::google::GoogleApi;
use crate::model::{BriefingContent, DocumentHandle};

pub fn subject(date: &str) -> String {
    format!("🚀 AI Strategic Briefing: {date}")
}

/// Render the briefing email. Content and links are embedded verbatim.
pub fn render_email_html(content: &BriefingContent, date: &str, doc: &DocumentHandle) -> String {
    let mut html = String::new();
    html.push_str(r#"<div style="font-family: Arial, sans-serif; max-width: 800px; margin: auto;">"#);
    let _ = write!(
        html,
        r#"<h1 style="color: #202124; text-align: center;">🚀 AI Intelligence: {date}</h1>"#
    );
    let _ = write!(
        html,
        r#"<p style="font-style: italic; color: #5f6368;">{}</p><hr>"#,
        content.intro
    );

    html.push_str(r#"<h2 style="color: #1a73e8;">I. TECHNICAL RESEARCH SPECS</h2>"#);
    for r in &content.research {
        let _ = write!(
            html,
            r#"<div style="margin-bottom: 20px;"><h3 style="margin-bottom: 5px;">{}</h3><p><b>Novelty:</b> {}</p><p style="background-color: #e8f0fe; padding: 10px; border-radius: 5px;"><b>Metrics:</b> {}</p><a href="{}" style="color: #1155cc;">Read Source Paper</a></div>"#,
            r.title, r.specs, r.metrics, r.link
        );
    }

    html.push_str(r#"<h2 style="color: #1a73e8;">II. EXECUTIVE STRATEGY</h2>"#);
    let _ = write!(
        html,
        r#"<p style="line-height: 1.6;">{}</p>"#,
        content.strategy.replace('\n', "<br>")
    );

    html.push_str(r#"<h2 style="color: #1a73e8;">III. ENGINEER TOOLS</h2><ul>"#);
    for t in &content.tools {
        let _ = write!(
            html,
            r#"<li><b>{}</b>: {} (<a href="{}">Repo</a>)</li>"#,
            t.name, t.edge, t.link
        );
    }
    html.push_str("</ul><br>");

    let _ = write!(
        html,
        r#"<div style="text-align: center; margin-top: 30px; font-size: 12px; color: #999;"><p>Original Document: <a href="{}">{}</a></p><p>Video of the Day: <a href="{}">{}</a></p></div>"#,
        doc.url, doc.name, content.video.url, content.video.title
    );
    html.push_str("</div>");
    html
}

/// RFC 2047 encoded-word for header values that are not plain ASCII.
fn encode_header(value: &str) -> String {
    if value.is_ascii() {
        value.to_string()
    } else {
        format!("=?UTF-8?B?{}?=", STANDARD.encode(value))
    }
}

const MAX_ENCODED_LINE: usize = 76;

/// Base64 body folded into CRLF-separated lines of at most 76 characters.
fn base64_body(data: &[u8]) -> String {
    let encoded = STANDARD.encode(data);
    encoded
        .as_bytes()
        .chunks(MAX_ENCODED_LINE)
        .map(|line| std::str::from_utf8(line).unwrap_or_default())
        .collect::<Vec<_>>()
        .join("\r\n")
}

/// Build an RFC 2822 HTML message addressed to every recipient at once.
pub fn build_mime_message(recipients: &[String], subject: &str, html: &str) -> String {
    let to = recipients
        .iter()
        .map(|r| r.trim())
        .collect::<Vec<_>>()
        .join(",");
    format!(
        "To: {to}\r\nSubject: {}\r\nMIME-Version: 1.0\r\nContent-Type: text/html; charset=UTF-8\r\nContent-Transfer-Encoding: base64\r\n\r\n{}",
        encode_header(subject),
        base64_body(html.as_bytes())
    )
}

/// Outbound mail transport.
#[async_trait]
pub trait MailSender: Send + Sync {
    /// Send one HTML message to all `recipients`; returns the provider message id.
    async fn send_html(&self, recipients: &[String], subject: &str, html: &str) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct GmailClient {
    api: GoogleApi,
}

#[derive(Deserialize)]
struct SendResponse {
    id: String,
}

impl GmailClient {
    pub fn new(api: GoogleApi) -> Self {
        Self { api }
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Ok(Self::new(GoogleApi::new(
            &cfg.google.endpoints.gmail,
            cfg.google.access_token.clone(),
            cfg.http_timeout(),
        )?))
    }
}

#[async_trait]
impl MailSender for GmailClient {
    #[instrument(skip_all, fields(recipients = recipients.len()))]
    async fn send_html(&self, recipients: &[String], subject: &str, html: &str) -> Result<String> {
        let raw = URL_SAFE_NO_PAD.encode(build_mime_message(recipients, subject, html));
        let sent: SendResponse = self
            .api
            .execute(
                Method::POST,
                self.api.endpoint("gmail/v1/users/me/messages/send")?,
                Some(&json!({ "raw": raw })),
            )
            .await
            .context("failed to send briefing email")?;
        info!(message_id = %sent.id, "briefing email sent");
        Ok(sent.id)
    }
}
