//! Ledger rows returned by repositories.

use chrono::{DateTime, Utc};

use crate::model::{BriefingContent, RunState, RunStep, StepState};

#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: String,
    pub run_date: String,
    pub state: RunState,
    /// Snapshot of the generated content, present once generation succeeded.
    pub content: Option<BriefingContent>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub step: RunStep,
    pub state: StepState,
    pub external_ref: Option<String>,
}
