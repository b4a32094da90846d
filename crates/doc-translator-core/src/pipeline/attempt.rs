use futures::StreamExt;
use serde::Serialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::chunking::{Chunk, ChunkSpec};
use crate::error::{Error, Result};
use crate::translator::Translator;

/// Upper bound for exponential retry delays.
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Delay between attempts on the same chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay before every retry
    Fixed { delay: Duration },
    /// `base * 2^(attempt - 1)`, capped at `max`
    Exponential { base: Duration, max: Duration },
}

impl Backoff {
    pub const fn fixed(delay: Duration) -> Self {
        Self::Fixed { delay }
    }

    pub const fn exponential(base: Duration) -> Self {
        Self::Exponential {
            base,
            max: MAX_BACKOFF,
        }
    }

    /// Delay after failed attempt number `attempt` (1-based).
    ///
    /// A server-provided `retry_after` is honoured when it is longer, up to
    /// [`MAX_BACKOFF`].
    pub fn delay_for(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let delay = match *self {
            Self::Fixed { delay } => delay,
            Self::Exponential { base, max } => {
                let factor = 1u32
                    .checked_shl(attempt.saturating_sub(1))
                    .unwrap_or(u32::MAX);
                base.saturating_mul(factor).min(max)
            }
        };
        retry_after.map_or(delay, |wait| delay.max(wait.min(MAX_BACKOFF)))
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::fixed(Duration::from_millis(5000))
    }
}

/// How a chunk's attempt sequence ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStatus {
    /// Non-empty translation
    Success,
    /// The model answered with nothing; never retried
    Empty,
    /// Every attempt failed
    Failed,
}

/// Outcome of one chunk. Created once, never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkResult {
    pub spec: ChunkSpec,
    pub status: ChunkStatus,
    /// Trimmed translation; empty unless `status` is `Success`
    pub text: String,
    /// Network calls made; zero for cache hits and unextractable ranges
    pub attempts: u32,
    /// Last error seen, for failed chunks
    pub error: Option<String>,
}

impl ChunkResult {
    pub fn success(spec: ChunkSpec, text: impl Into<String>, attempts: u32) -> Self {
        Self {
            spec,
            status: ChunkStatus::Success,
            text: text.into(),
            attempts,
            error: None,
        }
    }

    pub const fn empty(spec: ChunkSpec, attempts: u32) -> Self {
        Self {
            spec,
            status: ChunkStatus::Empty,
            text: String::new(),
            attempts,
            error: None,
        }
    }

    pub fn failed(spec: ChunkSpec, attempts: u32, error: &Error) -> Self {
        Self {
            spec,
            status: ChunkStatus::Failed,
            text: String::new(),
            attempts,
            error: Some(error.to_string()),
        }
    }
}

/// Bounded-retry translation of a single chunk.
///
/// Each attempt collects the whole fragment stream before judging it, so an
/// interrupted stream counts as a failed attempt rather than a short
/// translation. Failures are retried until `max_retries` attempts have been
/// made; empty output is final. Errors that cannot improve on retry (missing
/// key, rejected request, blocked content) end the sequence early.
pub struct TranslationAttempt<'a> {
    translator: &'a dyn Translator,
    max_retries: u32,
    backoff: Backoff,
    cancel: &'a CancellationToken,
}

impl<'a> TranslationAttempt<'a> {
    pub fn new(
        translator: &'a dyn Translator,
        max_retries: u32,
        backoff: Backoff,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            translator,
            max_retries: max_retries.max(1),
            backoff,
            cancel,
        }
    }

    /// Run the attempt sequence. Only cancellation is returned as `Err`.
    pub async fn run(&self, chunk: &Chunk, instructions: &str) -> Result<ChunkResult> {
        let spec = chunk.spec;
        let mut attempts = 0;

        loop {
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            attempts += 1;
            debug!(
                "Chunk {} ({}): attempt {}/{}",
                spec.index,
                spec.span(),
                attempts,
                self.max_retries
            );

            let outcome = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return Err(Error::Cancelled),
                outcome = self.call(chunk, instructions) => outcome,
            };

            let err = match outcome {
                Ok(text) => {
                    let text = text.trim();
                    if text.is_empty() {
                        debug!("Chunk {} returned no text", spec.index);
                        return Ok(ChunkResult::empty(spec, attempts));
                    }
                    return Ok(ChunkResult::success(spec, text, attempts));
                }
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(e) => e,
            };

            if !err.is_transient() {
                error!(
                    "Chunk {} ({}) failed permanently: {}",
                    spec.index,
                    spec.span(),
                    err
                );
                return Ok(ChunkResult::failed(spec, attempts, &err));
            }

            if attempts >= self.max_retries {
                error!(
                    "Chunk {} ({}) failed after {} attempts: {}",
                    spec.index,
                    spec.span(),
                    attempts,
                    err
                );
                return Ok(ChunkResult::failed(spec, attempts, &err));
            }

            let delay = self.backoff.delay_for(attempts, retry_after(&err));
            warn!(
                "Chunk {} attempt {} failed: {}; retrying in {:?}",
                spec.index, attempts, err, delay
            );

            tokio::select! {
                biased;
                () = self.cancel.cancelled() => return Err(Error::Cancelled),
                () = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn call(&self, chunk: &Chunk, instructions: &str) -> Result<String> {
        let mut stream = self
            .translator
            .translate(&chunk.payload, chunk.media_type, instructions)
            .await?;

        let mut text = String::new();
        while let Some(fragment) = stream.next().await {
            text.push_str(&fragment?);
        }
        Ok(text)
    }
}

fn retry_after(err: &Error) -> Option<Duration> {
    match err {
        Error::TranslationRateLimited {
            retry_after: Some(secs),
        } => Some(Duration::from_secs(*secs)),
        _ => None,
    }
}
