use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;

/// Structured digest returned by the language model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BriefingContent {
    pub intro: String,
    pub research: Vec<ResearchItem>,
    pub tools: Vec<ToolItem>,
    pub strategy: String,
    pub video: Video,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResearchItem {
    pub title: String,
    /// Technical novelty of the paper.
    pub specs: String,
    pub metrics: String,
    pub link: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolItem {
    pub name: String,
    /// What sets the tool apart from the standard alternatives.
    pub edge: String,
    pub link: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Video {
    pub title: String,
    pub url: String,
}

impl BriefingContent {
    /// Reject content that parsed but cannot be rendered meaningfully.
    pub fn validate(&self) -> Result<(), GenerationError> {
        fn blank(s: &str) -> bool {
            s.trim().is_empty()
        }

        if blank(&self.intro) {
            return Err(GenerationError::InvalidContent("intro is empty".into()));
        }
        if blank(&self.strategy) {
            return Err(GenerationError::InvalidContent("strategy is empty".into()));
        }
        for (i, r) in self.research.iter().enumerate() {
            if blank(&r.title) || blank(&r.link) {
                return Err(GenerationError::InvalidContent(format!(
                    "research[{i}] needs a title and a link"
                )));
            }
        }
        for (i, t) in self.tools.iter().enumerate() {
            if blank(&t.name) || blank(&t.link) {
                return Err(GenerationError::InvalidContent(format!(
                    "tools[{i}] needs a name and a link"
                )));
            }
        }
        if blank(&self.video.url) {
            return Err(GenerationError::InvalidContent("video.url is empty".into()));
        }
        Ok(())
    }
}

/// Handle to a document created in the document store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentHandle {
    pub id: String,
    pub name: String,
    pub url: String,
}

/// File entry returned by a file-store search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    pub created_time: DateTime<Utc>,
    pub parents: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RunState {
    Open,
    Completed,
    Failed,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Open => "OPEN",
            RunState::Completed => "COMPLETED",
            RunState::Failed => "FAILED",
        }
    }

    pub fn parse_state(s: &str) -> Option<Self> {
        match s {
            "OPEN" => Some(RunState::Open),
            "COMPLETED" => Some(RunState::Completed),
            "FAILED" => Some(RunState::Failed),
            _ => None,
        }
    }
}

/// One external mutation in the briefing pipeline, in execution order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RunStep {
    Generate,
    Document,
    Email,
    Calendar,
    Archive,
}

impl RunStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStep::Generate => "generate",
            RunStep::Document => "document",
            RunStep::Email => "email",
            RunStep::Calendar => "calendar",
            RunStep::Archive => "archive",
        }
    }

    pub fn parse_step(s: &str) -> Option<Self> {
        match s {
            "generate" => Some(RunStep::Generate),
            "document" => Some(RunStep::Document),
            "email" => Some(RunStep::Email),
            "calendar" => Some(RunStep::Calendar),
            "archive" => Some(RunStep::Archive),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StepState {
    Pending,
    Done,
}

impl StepState {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepState::Pending => "PENDING",
            StepState::Done => "DONE",
        }
    }

    pub fn parse_state(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(StepState::Pending),
            "DONE" => Some(StepState::Done),
            _ => None,
        }
    }
}
