use super::model::{RunRecord, StepRecord};
use crate::model::{BriefingContent, RunState, RunStep, StepState};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::instrument;
use uuid::Uuid;

pub type Pool = SqlitePool;

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    let pool = SqlitePool::connect(&normalized)
        .await
        .with_context(|| format!("failed to open ledger at {normalized}"))?;
    sqlx::query("PRAGMA journal_mode=WAL;")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous=FULL;")
        .execute(&pool)
        .await?;
    Ok(pool)
}

/// For file-backed SQLite URLs, expand a leading `~/`, ensure the parent
/// directory exists and ask SQLite to create the file. In-memory URLs pass
/// through untouched.
pub fn prepare_sqlite_url(url: &str) -> String {
    if !url.starts_with("sqlite:") || url.starts_with("sqlite::memory") {
        return url.to_string();
    }

    let rest = &url["sqlite:".len()..];
    let path_with_query = rest.strip_prefix("//").unwrap_or(rest);
    let (path_part, query_part) = match path_with_query.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path_with_query, None),
    };
    if path_part.is_empty() {
        return url.to_string();
    }

    let expanded_path = match (path_part.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(rest), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), rest),
        _ => path_part.to_string(),
    };

    if let Some(parent) = std::path::Path::new(&expanded_path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    let query = match query_part {
        Some(q) if q.contains("mode=") => q.to_string(),
        Some(q) => format!("{q}&mode=rwc"),
        None => "mode=rwc".to_string(),
    };
    format!("sqlite://{expanded_path}?{query}")
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

fn run_from_row(row: &SqliteRow) -> Result<RunRecord> {
    let state: String = row.get("state");
    let content: Option<String> = row.get("content_json");
    let content = content
        .map(|c| serde_json::from_str::<BriefingContent>(&c))
        .transpose()
        .context("corrupt content snapshot in ledger")?;
    Ok(RunRecord {
        id: row.get("id"),
        run_date: row.get("run_date"),
        state: RunState::parse_state(&state).ok_or_else(|| anyhow!("unknown run state {state}"))?,
        content,
        error: row.get("error"),
        started_at: row.get("started_at"),
        finished_at: row.get("finished_at"),
    })
}

#[instrument(skip_all)]
pub async fn open_run(pool: &Pool, run_date: &str, now: DateTime<Utc>) -> Result<String> {
    let id = Uuid::new_v4().to_string();
    sqlx::query("INSERT INTO runs (id, run_date, state, started_at) VALUES (?, ?, ?, ?)")
        .bind(&id)
        .bind(run_date)
        .bind(RunState::Open.as_str())
        .bind(now)
        .execute(pool)
        .await?;
    Ok(id)
}

/// Most recently started run for `run_date`, if any.
#[instrument(skip_all)]
pub async fn latest_run_for_date(pool: &Pool, run_date: &str) -> Result<Option<RunRecord>> {
    let row = sqlx::query(
        "SELECT id, run_date, state, content_json, error, started_at, finished_at \
         FROM runs WHERE run_date = ? ORDER BY started_at DESC, rowid DESC LIMIT 1",
    )
    .bind(run_date)
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(run_from_row).transpose()
}

#[instrument(skip_all)]
pub async fn get_run(pool: &Pool, run_id: &str) -> Result<Option<RunRecord>> {
    let row = sqlx::query(
        "SELECT id, run_date, state, content_json, error, started_at, finished_at \
         FROM runs WHERE id = ?",
    )
    .bind(run_id)
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(run_from_row).transpose()
}

/// Put a failed run back into `OPEN` so it can be resumed.
#[instrument(skip_all)]
pub async fn reopen_run(pool: &Pool, run_id: &str) -> Result<()> {
    sqlx::query("UPDATE runs SET state = ?, error = NULL, finished_at = NULL WHERE id = ?")
        .bind(RunState::Open.as_str())
        .bind(run_id)
        .execute(pool)
        .await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn save_content(pool: &Pool, run_id: &str, content: &BriefingContent) -> Result<()> {
    let json = serde_json::to_string(content)?;
    sqlx::query("UPDATE runs SET content_json = ? WHERE id = ?")
        .bind(json)
        .bind(run_id)
        .execute(pool)
        .await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn finish_run(
    pool: &Pool,
    run_id: &str,
    state: RunState,
    error: Option<&str>,
    now: DateTime<Utc>,
) -> Result<()> {
    sqlx::query("UPDATE runs SET state = ?, error = ?, finished_at = ? WHERE id = ?")
        .bind(state.as_str())
        .bind(error)
        .bind(now)
        .bind(run_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Record (or advance) a step. `DONE` overwrites an earlier `PENDING`.
#[instrument(skip_all, fields(step = step.as_str(), state = state.as_str()))]
pub async fn record_step(
    pool: &Pool,
    run_id: &str,
    step: RunStep,
    state: StepState,
    external_ref: Option<&str>,
    now: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO run_steps (run_id, step, state, external_ref, recorded_at) VALUES (?, ?, ?, ?, ?) \
         ON CONFLICT(run_id, step) DO UPDATE SET state = excluded.state, \
         external_ref = COALESCE(excluded.external_ref, run_steps.external_ref), \
         recorded_at = excluded.recorded_at",
    )
    .bind(run_id)
    .bind(step.as_str())
    .bind(state.as_str())
    .bind(external_ref)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn run_steps(pool: &Pool, run_id: &str) -> Result<Vec<StepRecord>> {
    let rows = sqlx::query("SELECT step, state, external_ref FROM run_steps WHERE run_id = ?")
        .bind(run_id)
        .fetch_all(pool)
        .await?;
    let mut steps = Vec::with_capacity(rows.len());
    for row in rows {
        let step: String = row.get("step");
        let state: String = row.get("state");
        steps.push(StepRecord {
            step: RunStep::parse_step(&step).ok_or_else(|| anyhow!("unknown step {step}"))?,
            state: StepState::parse_state(&state)
                .ok_or_else(|| anyhow!("unknown step state {state}"))?,
            external_ref: row.get("external_ref"),
        });
    }
    // Pipeline order, not insertion order.
    steps.sort_by_key(|s| s.step as u8);
    Ok(steps)
}
