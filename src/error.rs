//! Error kinds for the content-generation stage.
//!
//! Downstream service faults (documents, mail, calendar, drive) use
//! `anyhow` with context and are fatal for the run; only the model
//! fallback loop inspects errors and recovers.
use thiserror::Error;

/// Failure of a single model attempt. The generator logs it and moves on.
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("status {status}: {body}")]
    Status { status: u16, body: String },
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("all models failed ({}); check API key or quota", summarize(.attempts))]
    GenerationExhausted { attempts: Vec<(String, AttemptError)> },
    #[error("model {model} returned a malformed response: {reason}")]
    MalformedResponse { model: String, reason: String },
    #[error("briefing content failed validation: {0}")]
    InvalidContent(String),
}

fn summarize(attempts: &[(String, AttemptError)]) -> String {
    if attempts.is_empty() {
        return "no models configured".into();
    }
    attempts
        .iter()
        .map(|(model, err)| format!("{model}: {err}"))
        .collect::<Vec<_>>()
        .join("; ")
}
