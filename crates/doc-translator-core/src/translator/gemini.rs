use async_trait::async_trait;
use base64::Engine;
use futures::{Stream, StreamExt};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::traits::{TextStream, Translator, TranslatorInfo};
use crate::config::TranslatorConfig;
use crate::error::{Error, Result};
use crate::source::MediaType;

/// Google Gemini translator using the streaming `generateContent` endpoint.
///
/// The chunk is inlined as base64 data next to the instruction text, and the
/// response is read as server-sent events so long translations arrive
/// incrementally.
pub struct GeminiTranslator {
    client: Client,
    /// Base URL for the API (e.g., "https://generativelanguage.googleapis.com/v1beta")
    pub api_base: String,
    /// API key sent as `x-goog-api-key`
    pub api_key: Option<String>,
    /// Model identifier
    pub model: String,
    pub temperature: f32,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: &'static str,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

impl GeminiTranslator {
    /// Create a new Gemini translator from configuration.
    pub fn new(config: &TranslatorConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::TranslationRequest(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base: config.api_base.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.api_base.trim_end_matches('/'),
            self.model
        )
    }

    fn build_request(&self, payload: &[u8], media_type: MediaType, instructions: &str) -> GenerateRequest {
        GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![
                    Part::Text {
                        text: instructions.to_string(),
                    },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: media_type.mime(),
                            data: base64::engine::general_purpose::STANDARD.encode(payload),
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        }
    }
}

#[async_trait]
impl Translator for GeminiTranslator {
    fn info(&self) -> TranslatorInfo {
        TranslatorInfo {
            name: "Gemini",
            model: self.model.clone(),
            requires_api_key: true,
        }
    }

    async fn translate(
        &self,
        payload: &[u8],
        media_type: MediaType,
        instructions: &str,
    ) -> Result<TextStream> {
        let api_key = self.api_key.as_ref().ok_or(Error::TranslationMissingApiKey)?;
        let url = self.endpoint();
        let request = self.build_request(payload, media_type, instructions);

        debug!(
            "Sending {} byte {} payload to {}",
            payload.len(),
            media_type,
            url
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            let body = response.text().await.unwrap_or_default();
            warn!("Gemini API error: {} - {}", status, body);
            return Err(status_error(status, &body, retry_after));
        }

        Ok(text_stream(response.bytes_stream()))
    }

    fn is_available(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

fn transport_error(e: &reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::TranslationTimeout
    } else {
        Error::TranslationRequest(e.to_string())
    }
}

fn status_error(status: StatusCode, body: &str, retry_after: Option<u64>) -> Error {
    let message = serde_json::from_str::<GenerateResponse>(body)
        .ok()
        .and_then(|r| r.error)
        .map_or_else(|| body.to_string(), |e| e.message);

    match status {
        StatusCode::TOO_MANY_REQUESTS => Error::TranslationRateLimited { retry_after },
        StatusCode::REQUEST_TIMEOUT => Error::TranslationTimeout,
        s if s.is_client_error() => Error::TranslationRejected(format!("HTTP {s}: {message}")),
        s => Error::TranslationRequest(format!("HTTP {s}: {message}")),
    }
}

/// Turn the SSE response body into text fragments.
///
/// The stream only ends cleanly after a candidate reported `STOP`; a body
/// that closes before that yields an error so the attempt is not mistaken
/// for a complete translation.
fn text_stream<S, B>(body: S) -> TextStream
where
    S: Stream<Item = std::result::Result<B, reqwest::Error>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let stream = async_stream::stream! {
        let mut body = Box::pin(body);
        let mut decoder = SseDecoder::default();
        let mut eof = false;
        let mut stopped = false;

        while !eof {
            let events = match body.next().await {
                Some(Ok(bytes)) => decoder.push(bytes.as_ref()),
                Some(Err(e)) => {
                    yield Err(transport_error(&e));
                    return;
                }
                None => {
                    eof = true;
                    decoder.finish()
                }
            };

            for event in events {
                match parse_event(&event) {
                    Ok(parsed) => {
                        stopped |= parsed.stopped;
                        if let Some(text) = parsed.text {
                            yield Ok(text);
                        }
                    }
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        }

        if !stopped {
            yield Err(Error::TranslationInvalidResponse(
                "response ended without a finish reason".to_string(),
            ));
        }
    };

    Box::pin(stream)
}

/// What one SSE event contributed.
#[derive(Debug, Default, PartialEq, Eq)]
struct ParsedEvent {
    text: Option<String>,
    /// A candidate finished normally
    stopped: bool,
}

/// Extract the text carried by one SSE event payload.
///
/// Any finish reason other than `STOP` means the output is incomplete:
/// safety-style reasons are permanent, the rest (e.g. `MAX_TOKENS`) are
/// reported as an invalid response and retried.
fn parse_event(data: &str) -> Result<ParsedEvent> {
    let response: GenerateResponse = serde_json::from_str(data)
        .map_err(|e| Error::TranslationInvalidResponse(format!("{e}: {data}")))?;

    if let Some(error) = response.error {
        return Err(Error::TranslationRequest(error.message));
    }

    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(Error::TranslationBlocked(reason));
    }

    let mut text = String::new();
    let mut stopped = false;
    for candidate in response.candidates {
        match candidate.finish_reason.as_deref() {
            None | Some("FINISH_REASON_UNSPECIFIED") => {}
            Some("STOP") => stopped = true,
            Some(reason @ ("SAFETY" | "RECITATION" | "PROHIBITED_CONTENT" | "BLOCKLIST" | "SPII")) => {
                return Err(Error::TranslationBlocked(reason.to_string()));
            }
            Some(reason) => {
                return Err(Error::TranslationInvalidResponse(format!(
                    "output truncated: {reason}"
                )));
            }
        }
        for part in candidate.content.into_iter().flat_map(|c| c.parts) {
            if let Some(fragment) = part.text {
                text.push_str(&fragment);
            }
        }
    }

    Ok(ParsedEvent {
        text: (!text.is_empty()).then_some(text),
        stopped,
    })
}

/// Incremental server-sent-events decoder.
///
/// Collects `data:` lines and emits one payload per blank-line-terminated
/// event. Bytes may be split anywhere, including inside a UTF-8 sequence.
#[derive(Debug, Default)]
struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);
            self.handle_line(line, &mut events);
        }

        events
    }

    fn finish(&mut self) -> Vec<String> {
        let mut events = Vec::new();
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&rest);
            self.handle_line(line.trim_end_matches('\r'), &mut events);
        }
        self.flush(&mut events);
        events
    }

    fn handle_line(&mut self, line: &str, events: &mut Vec<String>) {
        if line.is_empty() {
            self.flush(events);
        } else if let Some(value) = line.strip_prefix("data:") {
            self.data.push(value.strip_prefix(' ').unwrap_or(value).to_string());
        }
        // Comments (":") and other fields (event, id, retry) carry nothing we use.
    }

    fn flush(&mut self, events: &mut Vec<String>) {
        if !self.data.is_empty() {
            events.push(self.data.join("\n"));
            self.data.clear();
        }
    }
}
