//! Daily AI briefing: generate a structured digest with a language model,
//! publish it as a document, email it, and archive the week's documents.

pub mod archive;
pub mod calendar;
pub mod config;
pub mod db;
pub mod docs;
pub mod drive;
pub mod error;
pub mod gemini;
pub mod generator;
pub mod google;
pub mod job;
pub mod mail;
pub mod model;
pub mod prompt;
