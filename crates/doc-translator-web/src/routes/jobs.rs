//! Job routes - status, progress stream and cancellation.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
};
use doc_translator_core::{Lang, OutputFormat, TranslationOutcome};
use futures::stream::Stream;
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::info;

use crate::helpers::{OptionExt, ResultExt, RouteResult};
use crate::state::{AppState, JobStatus, JobUpdate};

#[derive(Serialize)]
struct JobView<'a> {
    job_id: String,
    filename: &'a str,
    target_language: &'a Lang,
    total_pages: usize,
    #[serde(flatten)]
    update: JobUpdate,
    outcome: Option<&'a TranslationOutcome>,
    downloads: Vec<String>,
}

/// Current status, progress and (once completed) the outcome of a job.
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> RouteResult<Json<serde_json::Value>> {
    let job_ref = state.get_job(&job_id).await.or_not_found("Job not found")?;
    let id = job_ref.id();

    let view = job_ref
        .with_job(|job| {
            let downloads = if job.outcome.is_some() {
                OutputFormat::ALL
                    .iter()
                    .map(|f| format!("/api/jobs/{id}/download/{}", f.extension()))
                    .collect()
            } else {
                Vec::new()
            };
            serde_json::to_value(JobView {
                job_id: id.to_string(),
                filename: &job.filename,
                target_language: &job.target,
                total_pages: job.total_pages,
                update: job.channel.snapshot(),
                outcome: job.outcome.as_deref(),
                downloads,
            })
        })
        .await
        .or_not_found("Job not found")?
        .or_internal_error()?;

    Ok(Json(view))
}

const fn event_name(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Running => "progress",
        JobStatus::Completed => "complete",
        JobStatus::Failed => "error",
        JobStatus::Cancelled => "cancelled",
    }
}

/// SSE stream of job updates.
///
/// Sends the current state immediately, then one event per change, and ends
/// after the terminal event.
#[allow(tail_expr_drop_order)] // Drop order change in async_stream macro is harmless here
pub async fn job_events(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> RouteResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let mut rx = state
        .get_job(&job_id)
        .await
        .or_not_found("Job not found")?
        .with_job(|job| job.channel.subscribe())
        .await
        .or_not_found("Job not found")?;

    let stream = async_stream::stream! {
        loop {
            let update = rx.borrow_and_update().clone();
            let finished = update.status.is_finished();

            if let Ok(event) = Event::default()
                .event(event_name(update.status))
                .json_data(&update)
            {
                yield Ok(event);
            }

            // A closed channel means the job was removed
            if finished || rx.changed().await.is_err() {
                break;
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Cancel a running job, or discard a finished one.
///
/// Returns 202 Accepted while the run winds down, 204 No Content when a
/// finished job was removed.
pub async fn cancel_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> RouteResult<StatusCode> {
    let job_ref = state.get_job(&job_id).await.or_not_found("Job not found")?;
    let id = job_ref.id();
    let (status, cancel) = job_ref
        .with_job(|job| (job.channel.status(), job.cancel.clone()))
        .await
        .or_not_found("Job not found")?;

    if status.is_finished() {
        state.remove_job(id).await;
        info!("Removed job {}", id);
        return Ok(StatusCode::NO_CONTENT);
    }

    cancel.cancel();
    info!("Cancelling job {}", id);
    Ok(StatusCode::ACCEPTED)
}
