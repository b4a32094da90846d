//! Document Translator Core Library
//!
//! This library translates uploaded documents with a generative model:
//! - Input validation and PDF page-range splitting
//! - Chunked translation with bounded retry, pacing and cancellation
//! - Translation via the Gemini streaming API
//! - Caching of chunk translations (memory and disk)
//! - TXT, HTML, PDF and DOCX output

pub mod cache;
pub mod chunking;
pub mod config;
pub mod error;
pub mod output;
pub mod pdf;
pub mod pipeline;
pub mod source;
pub mod translator;
pub mod util;

pub use cache::{CacheKey, TranslationCache};
pub use chunking::{ChunkSizePolicy, ChunkSpec, PageRangeSplitter, PageSource, PageSpan};
pub use config::{
    AppConfig, BackoffKind, CacheConfig, DEFAULT_API_BASE, DEFAULT_MODEL, DEFAULT_TARGET_LANG,
    Lang, LanguageOption, PipelineConfig, TranslatorConfig, target_languages,
};
pub use error::{Error, ErrorKind, Result};
pub use output::{OutputFormat, RenderContext, output_filename, render};
pub use pdf::{DocumentMetadata, PdfDocument};
pub use pipeline::{
    Backoff, ChunkResult, ChunkStatus, ChunkedTranslationOrchestrator, ProcessingMethod,
    ProgressCallback, ProgressEvent, TranslationOutcome,
};
pub use source::{MediaType, SourceDocument, SourceFile};
pub use translator::{FidelityMode, GeminiTranslator, Translator, create_translator};
pub use util::clear_translation_cache;

pub use tokio_util::sync::CancellationToken;

use std::sync::Arc;
use tracing::{info, warn};

/// High-level document translator that combines all components.
///
/// Holds the long-lived pieces (translator client, cache, configuration);
/// every call to [`DocumentTranslator::translate_document`] is an
/// independent run with its own orchestrator.
pub struct DocumentTranslator {
    translator: Arc<dyn Translator>,
    cache: Option<Arc<TranslationCache>>,
    config: AppConfig,
}

/// Per-run options beyond target language and fidelity.
#[derive(Default, Clone)]
pub struct RunOptions {
    pub progress: Option<ProgressCallback>,
    pub cancel: Option<CancellationToken>,
}

impl DocumentTranslator {
    /// Create a translator backed by the configured Gemini endpoint.
    pub fn new(config: AppConfig) -> Result<Self> {
        let translator = create_translator(&config.translator)?;
        Self::with_translator(translator, config)
    }

    /// Create with a custom translator
    pub fn with_translator(translator: Arc<dyn Translator>, config: AppConfig) -> Result<Self> {
        config.validate()?;

        let cache = if config.cache.memory_enabled || config.cache.disk_enabled {
            match TranslationCache::new(&config.cache) {
                Ok(cache) => Some(Arc::new(cache)),
                Err(e) => {
                    warn!("Chunk cache disabled: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Ok(Self {
            translator,
            cache,
            config,
        })
    }

    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn translator(&self) -> &Arc<dyn Translator> {
        &self.translator
    }

    /// Validate and load an uploaded file.
    pub fn load(&self, file: SourceFile) -> Result<SourceDocument> {
        let document = SourceDocument::load(file, self.config.pipeline.max_file_size)?;
        info!(
            "Loaded {} ({}, {} pages)",
            document.filename(),
            document.media_type(),
            document.total_pages()
        );
        Ok(document)
    }

    /// Translate an uploaded file.
    pub async fn translate_document(
        &self,
        file: SourceFile,
        target: &Lang,
        high_fidelity: bool,
    ) -> Result<TranslationOutcome> {
        let document = self.load(file)?;
        self.translate_source(&document, target, high_fidelity, RunOptions::default())
            .await
    }

    /// Translate an already loaded document.
    pub async fn translate_source(
        &self,
        source: &SourceDocument,
        target: &Lang,
        high_fidelity: bool,
        options: RunOptions,
    ) -> Result<TranslationOutcome> {
        let mut orchestrator = ChunkedTranslationOrchestrator::new(
            Arc::clone(&self.translator),
            self.config.pipeline.clone(),
        );
        if let Some(cache) = &self.cache {
            orchestrator = orchestrator.with_cache(Arc::clone(cache));
        }
        if let Some(progress) = options.progress {
            orchestrator = orchestrator.with_progress(progress);
        }
        if let Some(cancel) = options.cancel {
            orchestrator = orchestrator.with_cancellation(cancel);
        }

        orchestrator
            .translate(source, target, FidelityMode::from_high_fidelity(high_fidelity))
            .await
    }
}
