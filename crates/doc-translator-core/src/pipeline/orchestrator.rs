use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::assemble::{CHUNK_SEPARATOR, ResultAssembler, TranslationOutcome};
use super::attempt::{ChunkResult, ChunkStatus, TranslationAttempt};
use crate::cache::{CacheKey, TranslationCache};
use crate::chunking::{ChunkSpec, PageRangeSplitter, PageSource};
use crate::config::{Lang, PipelineConfig};
use crate::error::{Error, Result};
use crate::translator::{ChunkContext, FidelityMode, Translator, build_instructions};
use crate::util::format_bytes;

/// Reported after every chunk.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub pages_processed: usize,
    pub total_pages: usize,
    pub status: ChunkStatus,
}

impl ProgressEvent {
    /// Share of chunks finished, 0-100.
    pub fn percent(&self) -> u8 {
        if self.total_chunks == 0 {
            return 100;
        }
        let pct = self.chunk_index.min(self.total_chunks) * 100 / self.total_chunks;
        u8::try_from(pct).unwrap_or(100)
    }
}

pub type ProgressCallback = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;

/// Per-run state, owned by one `translate` call.
#[derive(Default)]
struct RunAccumulator {
    results: Vec<ChunkResult>,
    output: String,
    pages_processed: usize,
    chunks_succeeded: usize,
    chunks_failed: usize,
}

impl RunAccumulator {
    fn record(&mut self, result: ChunkResult) {
        match result.status {
            ChunkStatus::Success => {
                if !self.output.is_empty() {
                    self.output.push_str(CHUNK_SEPARATOR);
                }
                self.output.push_str(&result.text);
                self.pages_processed += result.spec.page_count();
                self.chunks_succeeded += 1;
            }
            ChunkStatus::Empty => {
                self.pages_processed += result.spec.page_count();
            }
            ChunkStatus::Failed => {
                self.chunks_failed += 1;
            }
        }
        self.results.push(result);
    }
}

/// Drives a document through the chunked translation pipeline.
///
/// Chunks are translated strictly one after another, in page order, with a
/// pacing delay between network calls. A chunk that fails every attempt is
/// skipped; the run only fails when nothing at all was translated.
pub struct ChunkedTranslationOrchestrator {
    translator: Arc<dyn Translator>,
    config: PipelineConfig,
    cache: Option<Arc<TranslationCache>>,
    progress: Option<ProgressCallback>,
    cancel: CancellationToken,
}

impl ChunkedTranslationOrchestrator {
    pub fn new(translator: Arc<dyn Translator>, config: PipelineConfig) -> Self {
        Self {
            translator,
            config,
            cache: None,
            progress: None,
            cancel: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn with_cache(mut self, cache: Arc<TranslationCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    #[must_use]
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub async fn translate(
        &self,
        source: &dyn PageSource,
        target: &Lang,
        mode: FidelityMode,
    ) -> Result<TranslationOutcome> {
        let started = Instant::now();
        let total_pages = source.total_pages();
        let splitter = PageRangeSplitter::new(source, &self.config.chunk_policy());
        let total_chunks = splitter.specs().len();

        if splitter.is_empty() {
            warn!("Document has no pages to translate");
            return Err(Error::NoTranslatableContent);
        }

        if !self.translator.is_available() {
            return Err(Error::TranslationMissingApiKey);
        }

        info!(
            "Translating {} ({} pages, {}) into {} with {}: {} chunk(s) of up to {} pages",
            source.media_type(),
            total_pages,
            format_bytes(source.total_bytes()),
            target.display_name(),
            self.translator.name(),
            total_chunks,
            splitter.chunk_size()
        );

        let model = self.translator.info().model;
        let backoff = self.config.backoff();
        let attempt = TranslationAttempt::new(
            self.translator.as_ref(),
            self.config.max_retries,
            backoff,
            &self.cancel,
        );
        let mut acc = RunAccumulator::default();

        for spec in splitter.specs() {
            if self.cancel.is_cancelled() {
                info!("Translation cancelled before chunk {}", spec.index);
                return Err(Error::Cancelled);
            }

            let context = ChunkContext {
                spec: *spec,
                total_pages,
                total_chunks,
            };
            let instructions = build_instructions(target, mode, Some(&context));

            let result = match splitter.load(spec) {
                Ok(chunk) => {
                    let key = CacheKey::for_chunk(&chunk.payload, &instructions, &model);
                    match self.cached(&key, spec).await {
                        Some(hit) => hit,
                        None => {
                            let result = attempt.run(&chunk, &instructions).await?;
                            if result.status == ChunkStatus::Success
                                && let Some(cache) = &self.cache
                            {
                                cache.insert(&key, &result.text).await;
                            }
                            result
                        }
                    }
                }
                Err(e) => {
                    warn!("Could not extract {}: {}", spec.span(), e);
                    ChunkResult::failed(*spec, 0, &e)
                }
            };

            log_chunk(&result, total_chunks);
            let made_request = result.attempts > 0;
            let status = result.status;
            acc.record(result);

            if let Some(progress) = &self.progress {
                progress(&ProgressEvent {
                    chunk_index: spec.index,
                    total_chunks,
                    pages_processed: acc.pages_processed,
                    total_pages,
                    status,
                });
            }

            let is_last = spec.index == total_chunks;
            if !is_last && made_request {
                self.pace().await?;
            }
        }

        if acc.output.trim().is_empty() {
            warn!(
                "No text produced: {} of {} chunks failed",
                acc.chunks_failed, total_chunks
            );
            return Err(Error::NoTranslatableContent);
        }

        let outcome = ResultAssembler::assemble(&acc.output, &acc.results, total_pages);

        if !outcome.failed_ranges.is_empty() {
            let ranges: Vec<String> = outcome.failed_ranges.iter().map(ToString::to_string).collect();
            warn!("Untranslated ranges: {}", ranges.join(", "));
        }

        info!(
            "Translated {}/{} chunks ({}/{} pages, {} words) in {:.1}s",
            acc.chunks_succeeded,
            total_chunks,
            outcome.pages_processed,
            total_pages,
            outcome.word_count,
            started.elapsed().as_secs_f64()
        );

        Ok(outcome)
    }

    async fn cached(&self, key: &CacheKey, spec: &ChunkSpec) -> Option<ChunkResult> {
        let text = self.cache.as_ref()?.get(key).await?;
        debug!("Cache hit for chunk {} ({})", spec.index, spec.span());
        Some(ChunkResult::success(*spec, text, 0))
    }

    async fn pace(&self) -> Result<()> {
        let delay = self.config.chunk_delay();
        if delay.is_zero() {
            return Ok(());
        }
        debug!("Waiting {:?} before next chunk", delay);
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(Error::Cancelled),
            () = tokio::time::sleep(delay) => Ok(()),
        }
    }
}

fn log_chunk(result: &ChunkResult, total_chunks: usize) {
    let spec = &result.spec;
    match result.status {
        ChunkStatus::Success => info!(
            "Chunk {}/{} ({}): {} chars",
            spec.index,
            total_chunks,
            spec.span(),
            result.text.len()
        ),
        ChunkStatus::Empty => info!(
            "Chunk {}/{} ({}): no text",
            spec.index,
            total_chunks,
            spec.span()
        ),
        ChunkStatus::Failed => warn!(
            "Chunk {}/{} ({}) skipped: {}",
            spec.index,
            total_chunks,
            spec.span(),
            result.error.as_deref().unwrap_or("unknown error")
        ),
    }
}
