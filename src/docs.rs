//! Briefing document layout and the Google Docs client that materializes it.
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt::Write as _;
use tracing::{info, instrument};

use crate::config::Config;
use crate::google::GoogleApi;
use crate::model::{BriefingContent, DocumentHandle};

pub const LINK_COLOR: &str = "#1155cc";

/// One paragraph-level element of the briefing document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading {
        level: u8,
        text: String,
        centered: bool,
    },
    Paragraph {
        text: String,
        bold: bool,
        italic: bool,
    },
    Link {
        label: String,
        url: String,
    },
    PageBreak,
}

impl Block {
    fn plain(text: impl Into<String>) -> Self {
        Block::Paragraph {
            text: text.into(),
            bold: false,
            italic: false,
        }
    }

    fn heading(level: u8, text: impl Into<String>) -> Self {
        Block::Heading {
            level,
            text: text.into(),
            centered: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentLayout {
    pub blocks: Vec<Block>,
}

pub fn document_title(prefix: &str, date: &str) -> String {
    format!("{} {}", prefix.trim_end(), date)
}

/// Lay out the briefing: research, one page break, strategy, tools.
pub fn render_document(content: &BriefingContent, date: &str) -> DocumentLayout {
    let mut blocks = vec![
        Block::Heading {
            level: 1,
            text: format!("AI INTELLIGENCE: {date}"),
            centered: true,
        },
        Block::Paragraph {
            text: content.intro.clone(),
            bold: false,
            italic: true,
        },
        Block::heading(2, "I. TECHNICAL RESEARCH SPECS"),
    ];

    for r in &content.research {
        blocks.push(Block::heading(3, r.title.clone()));
        blocks.push(Block::plain(format!("Technical Novelty: {}", r.specs)));
        blocks.push(Block::Paragraph {
            text: format!("Key Metrics: {}", r.metrics),
            bold: true,
            italic: false,
        });
        blocks.push(Block::Link {
            label: "Source Paper".into(),
            url: r.link.clone(),
        });
    }

    blocks.push(Block::PageBreak);
    blocks.push(Block::heading(2, "II. EXECUTIVE STRATEGY & ROI"));
    blocks.push(Block::plain(content.strategy.clone()));

    blocks.push(Block::heading(2, "III. ENGINEER TOOLS"));
    for t in &content.tools {
        blocks.push(Block::plain(format!("{}: {}", t.name, t.edge)));
        blocks.push(Block::Link {
            label: "Repo Link".into(),
            url: t.link.clone(),
        });
    }

    DocumentLayout { blocks }
}

fn utf16_len(s: &str) -> i64 {
    s.encode_utf16().count() as i64
}

fn hex_channel(hex: &str, i: usize) -> f64 {
    let v = u8::from_str_radix(&hex[i..i + 2], 16).unwrap_or(0);
    f64::from(v) / 255.0
}

fn rgb_color(hex: &str) -> Value {
    let hex = hex.trim_start_matches('#');
    json!({
        "color": {
            "rgbColor": {
                "red": hex_channel(hex, 0),
                "green": hex_channel(hex, 2),
                "blue": hex_channel(hex, 4),
            }
        }
    })
}

impl DocumentLayout {
    /// Requests for one `documents.batchUpdate` call against an empty document.
    ///
    /// Content is appended at the end of the body and styled afterwards; the
    /// style ranges are tracked in UTF-16 code units starting at index 1.
    pub fn to_batch_requests(&self) -> Vec<Value> {
        let mut inserts = Vec::new();
        let mut styles = Vec::new();
        let mut index: i64 = 1;

        for block in &self.blocks {
            let text = match block {
                Block::PageBreak => {
                    inserts.push(json!({ "insertPageBreak": { "endOfSegmentLocation": {} } }));
                    // page break plus the newline Docs inserts after it
                    index += 2;
                    continue;
                }
                Block::Heading { text, .. } | Block::Paragraph { text, .. } => text.as_str(),
                Block::Link { label, .. } => label.as_str(),
            };

            let len = utf16_len(text);
            inserts.push(json!({
                "insertText": { "text": format!("{text}\n"), "endOfSegmentLocation": {} }
            }));
            let text_range = json!({ "startIndex": index, "endIndex": index + len });
            let para_range = json!({ "startIndex": index, "endIndex": index + len + 1 });

            match block {
                Block::Heading {
                    level, centered, ..
                } => {
                    let mut style = json!({ "namedStyleType": format!("HEADING_{level}") });
                    let mut fields = "namedStyleType";
                    if *centered {
                        style["alignment"] = json!("CENTER");
                        fields = "namedStyleType,alignment";
                    }
                    styles.push(json!({
                        "updateParagraphStyle": {
                            "range": para_range,
                            "paragraphStyle": style,
                            "fields": fields,
                        }
                    }));
                }
                Block::Paragraph { bold, italic, .. } if len > 0 && (*bold || *italic) => {
                    let mut fields = Vec::new();
                    let mut style = json!({});
                    if *bold {
                        style["bold"] = json!(true);
                        fields.push("bold");
                    }
                    if *italic {
                        style["italic"] = json!(true);
                        fields.push("italic");
                    }
                    styles.push(json!({
                        "updateTextStyle": {
                            "range": text_range,
                            "textStyle": style,
                            "fields": fields.join(","),
                        }
                    }));
                }
                Block::Link { url, .. } if len > 0 => {
                    let mut style = json!({ "link": { "url": url } });
                    style["foregroundColor"] = rgb_color(LINK_COLOR);
                    styles.push(json!({
                        "updateTextStyle": {
                            "range": text_range,
                            "textStyle": style,
                            "fields": "link,foregroundColor",
                        }
                    }));
                }
                _ => {}
            }
            index += len + 1;
        }

        inserts.extend(styles);
        inserts
    }

    /// Plain-text outline, one line per block.
    pub fn outline(&self) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            let _ = match block {
                Block::Heading { level, text, .. } => {
                    writeln!(out, "{} {}", "#".repeat(usize::from(*level)), text)
                }
                Block::Paragraph { text, bold, italic } => match (bold, italic) {
                    (true, _) => writeln!(out, "**{text}**"),
                    (false, true) => writeln!(out, "_{text}_"),
                    _ => writeln!(out, "{text}"),
                },
                Block::Link { label, url } => writeln!(out, "[{label}]({url})"),
                Block::PageBreak => writeln!(out, "---- page break ----"),
            };
        }
        out
    }
}

/// Destination for rendered briefing documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create a new document titled `title`, write `layout` into it and
    /// return its durable handle.
    async fn publish(&self, title: &str, layout: &DocumentLayout) -> Result<DocumentHandle>;
}

#[derive(Debug, Clone)]
pub struct DocsClient {
    api: GoogleApi,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateDocumentResponse {
    document_id: String,
    title: String,
}

pub fn document_url(id: &str) -> String {
    format!("https://docs.google.com/document/d/{id}/edit")
}

impl DocsClient {
    pub fn new(api: GoogleApi) -> Self {
        Self { api }
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Ok(Self::new(GoogleApi::new(
            &cfg.google.endpoints.docs,
            cfg.google.access_token.clone(),
            cfg.http_timeout(),
        )?))
    }
}

#[async_trait]
impl DocumentStore for DocsClient {
    #[instrument(skip_all, fields(title = %title))]
    async fn publish(&self, title: &str, layout: &DocumentLayout) -> Result<DocumentHandle> {
        let created: CreateDocumentResponse = self
            .api
            .execute(
                Method::POST,
                self.api.endpoint("v1/documents")?,
                Some(&json!({ "title": title })),
            )
            .await
            .context("failed to create document")?;

        let requests = layout.to_batch_requests();
        let url = self
            .api
            .endpoint(&format!("v1/documents/{}:batchUpdate", created.document_id))?;
        let _: Value = self
            .api
            .execute(Method::POST, url, Some(&json!({ "requests": requests })))
            .await
            .with_context(|| format!("failed to write document {}", created.document_id))?;

        info!(document_id = %created.document_id, "document published");
        Ok(DocumentHandle {
            url: document_url(&created.document_id),
            id: created.document_id,
            name: created.title,
        })
    }
}
