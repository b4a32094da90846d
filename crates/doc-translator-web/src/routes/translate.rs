//! Upload route - accepts a document and starts a background translation job.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use axum_extra::extract::Multipart;
use doc_translator_core::{
    Error, Lang, MediaType, PageSource, ProgressEvent, RunOptions, SourceDocument, SourceFile,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::helpers::{CoreResultExt, ResultExt, RouteResult};
use crate::state::{AppState, Job, JobChannel};

/// Body of the 202 response.
#[derive(Debug, Serialize)]
pub struct JobCreated {
    pub job_id: String,
    pub filename: String,
    pub media_type: MediaType,
    pub total_pages: usize,
    pub target_language: Lang,
    pub high_fidelity: bool,
    pub events_url: String,
}

#[derive(Default)]
struct TranslateRequest {
    file: Option<SourceFile>,
    target: Option<String>,
    high_fidelity: Option<bool>,
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "on" | "yes"
    )
}

async fn read_request(mut multipart: Multipart) -> RouteResult<TranslateRequest> {
    let mut request = TranslateRequest::default();

    while let Some(field) = multipart.next_field().await.or_bad_request()? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("document").to_string();
                let mime_type = field.content_type().map(str::to_string);
                let data = field.bytes().await.or_bad_request()?;
                request.file = Some(SourceFile::new(filename, data.to_vec(), mime_type));
            }
            "targetLanguage" => {
                let text = field.text().await.or_bad_request()?;
                request.target = Some(text.trim().to_string()).filter(|t| !t.is_empty());
            }
            "highFidelity" => {
                let text = field.text().await.or_bad_request()?;
                request.high_fidelity = Some(parse_flag(&text));
            }
            _ => {}
        }
    }

    Ok(request)
}

/// Start a translation job.
///
/// Validation and document parsing happen before the response, so bad
/// uploads are rejected synchronously. Returns 202 Accepted with the job id;
/// the run continues in a background task.
pub async fn start_translation(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> RouteResult<(StatusCode, Json<JobCreated>)> {
    let request = read_request(multipart).await?;
    let file = request.file.ok_or(Error::MissingFile).or_status()?;

    let config = state.translator.config();
    let target = request
        .target
        .map_or_else(|| config.target_lang.clone(), Lang::new);
    let high_fidelity = request.high_fidelity.unwrap_or(config.high_fidelity);

    // Parse in a blocking task to avoid blocking the async runtime
    let translator = Arc::clone(&state.translator);
    let document = tokio::task::spawn_blocking(move || translator.load(file))
        .await
        .map_err(|e| {
            error!("Document loading task panicked: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Document loading failed".to_string(),
            )
        })?
        .or_status()?;

    let filename = document.filename().to_string();
    let media_type = document.media_type();
    let total_pages = document.total_pages();

    let job = Job::new(
        filename.clone(),
        document.title(),
        document.metadata(),
        target.clone(),
        total_pages,
    );
    let cancel = job.cancel.clone();
    let channel = job.channel.clone();
    let id = state.create_job(job).await;

    info!(
        "Created job {} for {} ({}, {} pages) into {}",
        id, filename, media_type, total_pages, target
    );

    tokio::spawn(run_job(
        Arc::clone(&state),
        id,
        document,
        target.clone(),
        high_fidelity,
        RunOptions {
            progress: Some(progress_callback(channel.clone())),
            cancel: Some(cancel),
        },
        channel,
    ));

    Ok((
        StatusCode::ACCEPTED,
        Json(JobCreated {
            job_id: id.to_string(),
            filename,
            media_type,
            total_pages,
            target_language: target,
            high_fidelity,
            events_url: format!("/api/jobs/{id}/events"),
        }),
    ))
}

fn progress_callback(channel: JobChannel) -> doc_translator_core::ProgressCallback {
    Arc::new(move |event: &ProgressEvent| channel.record_progress(event))
}

async fn run_job(
    state: Arc<AppState>,
    id: Uuid,
    document: SourceDocument,
    target: Lang,
    high_fidelity: bool,
    options: RunOptions,
    channel: JobChannel,
) {
    let result = state
        .translator
        .translate_source(&document, &target, high_fidelity, options)
        .await;

    match result {
        Ok(outcome) => {
            info!(
                "Job {} finished: {}/{} chunks translated, {} words",
                id, outcome.successful_chunks, outcome.chunks_processed, outcome.word_count
            );
            let outcome = Arc::new(outcome);
            let stored = match state.job(id).await {
                Some(job) => job.with_job_mut(|j| j.outcome = Some(outcome)).await.is_some(),
                None => false,
            };
            if stored {
                channel.complete();
            } else {
                warn!("Job {} was removed before it finished", id);
            }
        }
        Err(e) => {
            warn!("Job {} failed: {}", id, e);
            channel.fail(&e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true"));
        assert!(parse_flag(" ON "));
        assert!(parse_flag("1"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(""));
    }
}
