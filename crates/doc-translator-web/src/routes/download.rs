//! Download route - renders a finished translation in the requested format.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::Response,
};
use doc_translator_core::{OutputFormat, RenderContext, output_filename, render};
use std::sync::Arc;

use crate::helpers::{CoreResultExt, OptionExt, ResultExt, RouteResult};
use crate::state::AppState;

/// `Content-Disposition` with an ASCII fallback and the UTF-8 name.
fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| if c.is_ascii_graphic() && c != '"' && c != '\\' { c } else { '_' })
        .collect();
    format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
        urlencoding::encode(filename)
    )
}

/// Download a completed translation as TXT, HTML, PDF or DOCX.
pub async fn download(
    State(state): State<Arc<AppState>>,
    Path((job_id, format)): Path<(String, String)>,
) -> RouteResult<Response> {
    let format: OutputFormat = format.parse().or_bad_request()?;
    let job_ref = state.get_job(&job_id).await.or_not_found("Job not found")?;

    let (outcome, filename, title, metadata, target) = job_ref
        .with_job(|job| {
            (
                job.outcome.clone(),
                job.filename.clone(),
                job.title.clone(),
                job.metadata.clone(),
                job.target.clone(),
            )
        })
        .await
        .or_not_found("Job not found")?;

    let outcome = outcome.ok_or_else(|| {
        (
            StatusCode::CONFLICT,
            "Translation has not completed".to_string(),
        )
    })?;

    // PDF and DOCX writers are CPU bound
    let bytes = tokio::task::spawn_blocking(move || {
        let ctx = RenderContext {
            title: &title,
            metadata: &metadata,
            target: &target,
        };
        render(format, &outcome, &ctx)
    })
    .await
    .or_internal_error()?
    .or_status()?;

    let download_name = output_filename(&filename, format);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, format.mime())
        .header(header::CONTENT_DISPOSITION, content_disposition(&download_name))
        .body(Body::from(bytes))
        .or_internal_error()
}
