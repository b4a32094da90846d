//! HTTP route handlers for the document translator API.
//!
//! All routes speak JSON, except the SSE progress stream and file downloads.

mod download;
mod jobs;
mod translate;

pub use download::download;
pub use jobs::{cancel_job, get_job, job_events};
pub use translate::start_translation;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    routing::{get, post},
};
use doc_translator_core::{LanguageOption, target_languages};
use serde_json::json;
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

/// Uploads may carry a 200 MiB document plus multipart framing.
pub const UPLOAD_BODY_LIMIT: usize = 210 * 1024 * 1024;

pub async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let translator = state.translator.translator();
    let info = translator.info();
    Json(json!({
        "status": "ok",
        "translator": info.name,
        "model": info.model,
        "available": translator.is_available(),
    }))
}

pub async fn languages() -> Json<Vec<LanguageOption>> {
    Json(target_languages())
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/languages", get(languages))
        .route("/api/translate", post(start_translation))
        .route("/api/jobs/{job_id}", get(get_job).delete(cancel_job))
        .route("/api/jobs/{job_id}/events", get(job_events))
        .route("/api/jobs/{job_id}/download/{format}", get(download))
        // Middleware
        .layer(CompressionLayer::new())
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use doc_translator_core::translator::{TextStream, TranslatorInfo};
    use doc_translator_core::{
        AppConfig, CacheConfig, DocumentTranslator, MediaType, PipelineConfig, Translator,
    };
    use futures::StreamExt;
    use tower::ServiceExt;

    const BOUNDARY: &str = "X-DOC-TRANSLATOR-BOUNDARY";

    struct EchoTranslator;

    #[async_trait]
    impl Translator for EchoTranslator {
        fn info(&self) -> TranslatorInfo {
            TranslatorInfo {
                name: "Echo",
                model: "echo-1".to_string(),
                requires_api_key: false,
            }
        }

        async fn translate(
            &self,
            payload: &[u8],
            media_type: MediaType,
            _instructions: &str,
        ) -> doc_translator_core::Result<TextStream> {
            let text = format!("{} bytes of {media_type}", payload.len());
            Ok(futures::stream::iter(vec![Ok(text)]).boxed())
        }
    }

    fn config() -> AppConfig {
        AppConfig {
            pipeline: PipelineConfig::without_delays(),
            cache: CacheConfig::disabled(),
            ..Default::default()
        }
    }

    fn echo_app() -> Router {
        let translator = DocumentTranslator::with_translator(Arc::new(EchoTranslator), config()).unwrap();
        router(Arc::new(AppState::with_translator(translator)))
    }

    /// Gemini backend without an API key: every run fails upstream.
    fn keyless_app() -> Router {
        router(Arc::new(AppState::new(config()).unwrap()))
    }

    fn upload(filename: &str, mime: &str, data: &[u8], target: Option<&str>) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: {mime}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
        if let Some(target) = target {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"targetLanguage\"\r\n\r\n{target}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/api/translate")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        serde_json::from_slice(&body_bytes(response).await).unwrap()
    }

    /// Start a job and wait for its SSE stream to end.
    async fn run_to_end(app: &Router, request: Request<Body>) -> (String, String) {
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let created = json_body(response).await;
        let job_id = created["job_id"].as_str().unwrap().to_string();

        let events = app
            .clone()
            .oneshot(get(&format!("/api/jobs/{job_id}/events")))
            .await
            .unwrap();
        assert_eq!(events.status(), StatusCode::OK);
        let stream = String::from_utf8(body_bytes(events).await).unwrap();
        (job_id, stream)
    }

    #[tokio::test]
    async fn test_health() {
        let response = echo_app().oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["model"], "echo-1");
    }

    #[tokio::test]
    async fn test_languages() {
        let response = echo_app().oneshot(get("/api/languages")).await.unwrap();
        let json = json_body(response).await;
        assert!(json.as_array().unwrap().iter().any(|l| l["code"] == "fr"));
    }

    #[tokio::test]
    async fn test_translate_image_end_to_end() {
        let app = echo_app();
        let (job_id, stream) = run_to_end(&app, upload("scan.png", "image/png", b"fake-png", Some("fr"))).await;
        assert!(stream.contains("event: complete"));

        let job = json_body(app.clone().oneshot(get(&format!("/api/jobs/{job_id}"))).await.unwrap()).await;
        assert_eq!(job["status"], "completed");
        assert_eq!(job["target_language"], "fr");
        assert_eq!(job["outcome"]["text"], "8 bytes of image/png");
        assert_eq!(job["outcome"]["processing_method"], "ai-powered");
        assert_eq!(job["downloads"].as_array().unwrap().len(), 4);

        let download = app
            .clone()
            .oneshot(get(&format!("/api/jobs/{job_id}/download/txt")))
            .await
            .unwrap();
        assert_eq!(download.status(), StatusCode::OK);
        let disposition = download.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
        assert!(disposition.contains("scan_translated.txt"));
        assert_eq!(body_bytes(download).await, b"8 bytes of image/png");

        let docx = app
            .clone()
            .oneshot(get(&format!("/api/jobs/{job_id}/download/docx")))
            .await
            .unwrap();
        assert_eq!(docx.status(), StatusCode::OK);
        assert!(body_bytes(docx).await.starts_with(b"PK"));

        let unknown = app
            .oneshot(get(&format!("/api/jobs/{job_id}/download/xls")))
            .await
            .unwrap();
        assert_eq!(unknown.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_reported() {
        let app = keyless_app();
        let (job_id, stream) = run_to_end(&app, upload("scan.png", "image/png", b"fake-png", None)).await;
        assert!(stream.contains("event: error"));

        let job = json_body(app.clone().oneshot(get(&format!("/api/jobs/{job_id}"))).await.unwrap()).await;
        assert_eq!(job["status"], "failed");
        assert_eq!(job["error"]["kind"], "upstream_service_error");
        assert!(job["outcome"].is_null());

        let download = app
            .oneshot(get(&format!("/api/jobs/{job_id}/download/txt")))
            .await
            .unwrap();
        assert_eq!(download.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_rejected_uploads() {
        let app = echo_app();

        let unsupported = app
            .clone()
            .oneshot(upload("notes.txt", "text/plain", b"hello", None))
            .await
            .unwrap();
        assert_eq!(unsupported.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let empty = app
            .clone()
            .oneshot(upload("scan.png", "image/png", b"", None))
            .await
            .unwrap();
        assert_eq!(empty.status(), StatusCode::BAD_REQUEST);

        let not_pdf = app
            .oneshot(upload("paper.pdf", "application/pdf", b"not a pdf", None))
            .await
            .unwrap();
        assert_eq!(not_pdf.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_finished_job() {
        let app = echo_app();
        let (job_id, _) = run_to_end(&app, upload("scan.png", "image/png", b"fake-png", None)).await;

        let delete = Request::builder()
            .method("DELETE")
            .uri(format!("/api/jobs/{job_id}"))
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(delete).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let gone = app.oneshot(get(&format!("/api/jobs/{job_id}"))).await.unwrap();
        assert_eq!(gone.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_job() {
        let response = echo_app().oneshot(get("/api/jobs/not-a-job")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
