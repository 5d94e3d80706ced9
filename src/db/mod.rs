//! Run ledger: records each briefing run and the external mutations it made.
//!
//! - `model`: rows returned by the repository.
//! - `repo`: SQL-only functions over the `runs` and `run_steps` tables.
//!
//! A failed run can be inspected, or resumed by the job without repeating
//! the steps already marked `DONE`.

pub mod model;
pub mod repo;

pub use model::{RunRecord, StepRecord};
pub use repo::*;
