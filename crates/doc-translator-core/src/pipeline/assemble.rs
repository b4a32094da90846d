use serde::Serialize;

use super::attempt::{ChunkResult, ChunkStatus};
use crate::chunking::PageSpan;

/// Placed between the translations of consecutive successful chunks.
pub const CHUNK_SEPARATOR: &str = "\n\n---\n\n";

/// How the document was sent to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProcessingMethod {
    /// One request for the whole document
    AiPowered,
    /// Several page-range requests
    ChunkedAi,
}

impl ProcessingMethod {
    pub const fn for_chunks(chunks: usize) -> Self {
        if chunks > 1 { Self::ChunkedAi } else { Self::AiPowered }
    }
}

/// Final result of a translation run.
#[derive(Debug, Clone, Serialize)]
pub struct TranslationOutcome {
    pub text: String,
    pub word_count: usize,
    /// UTF-16 code units, matching what browsers report as string length
    pub char_count: usize,
    pub total_pages: usize,
    /// Pages in chunks that ended `Success` or `Empty`
    pub pages_processed: usize,
    pub chunks_processed: usize,
    pub successful_chunks: usize,
    pub failed_chunks: usize,
    pub empty_chunks: usize,
    pub failed_ranges: Vec<PageSpan>,
    pub processing_method: ProcessingMethod,
}

impl TranslationOutcome {
    /// Whether some chunks contributed nothing.
    pub const fn is_partial(&self) -> bool {
        self.successful_chunks < self.chunks_processed
    }
}

/// Turns accumulated chunk output into a [`TranslationOutcome`].
pub struct ResultAssembler;

impl ResultAssembler {
    /// Pure: counts are derived from the trimmed text and the chunk results.
    pub fn assemble(text: &str, chunks: &[ChunkResult], total_pages: usize) -> TranslationOutcome {
        let text = text.trim();

        let count = |status: ChunkStatus| chunks.iter().filter(|c| c.status == status).count();
        let pages_processed = chunks
            .iter()
            .filter(|c| c.status != ChunkStatus::Failed)
            .map(|c| c.spec.page_count())
            .sum();

        TranslationOutcome {
            text: text.to_string(),
            word_count: text.split_whitespace().count(),
            char_count: text.encode_utf16().count(),
            total_pages,
            pages_processed,
            chunks_processed: chunks.len(),
            successful_chunks: count(ChunkStatus::Success),
            failed_chunks: count(ChunkStatus::Failed),
            empty_chunks: count(ChunkStatus::Empty),
            failed_ranges: chunks
                .iter()
                .filter(|c| c.status == ChunkStatus::Failed)
                .map(|c| c.spec.span())
                .collect(),
            processing_method: ProcessingMethod::for_chunks(chunks.len()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::chunking::ChunkSpec;
    use crate::error::Error;

    #[test]
    fn test_counts_on_trimmed_text() {
        let chunks = vec![ChunkResult::success(ChunkSpec::new(1, 0, 3), "Hello  world", 1)];
        let outcome = ResultAssembler::assemble("  Hello  world \n", &chunks, 3);
        assert_eq!(outcome.text, "Hello  world");
        assert_eq!(outcome.word_count, 2);
        assert_eq!(outcome.char_count, 12);
        assert_eq!(outcome.pages_processed, 3);
        assert_eq!(outcome.processing_method, ProcessingMethod::AiPowered);
        assert!(!outcome.is_partial());
    }

    #[test]
    fn test_char_count_uses_utf16_units() {
        let outcome = ResultAssembler::assemble("é😀", &[], 0);
        assert_eq!(outcome.char_count, 3);
        assert_eq!(outcome.word_count, 1);
    }

    #[test]
    fn test_mixed_statuses() {
        let chunks = vec![
            ChunkResult::success(ChunkSpec::new(1, 0, 5), "a", 1),
            ChunkResult::failed(
                ChunkSpec::new(2, 5, 10),
                3,
                &Error::TranslationTimeout,
            ),
            ChunkResult::empty(ChunkSpec::new(3, 10, 12), 1),
        ];
        let outcome = ResultAssembler::assemble("a", &chunks, 12);
        assert_eq!(outcome.chunks_processed, 3);
        assert_eq!(outcome.successful_chunks, 1);
        assert_eq!(outcome.failed_chunks, 1);
        assert_eq!(outcome.empty_chunks, 1);
        assert_eq!(outcome.pages_processed, 7);
        assert_eq!(outcome.failed_ranges, vec![PageSpan { first: 6, last: 10 }]);
        assert_eq!(outcome.processing_method, ProcessingMethod::ChunkedAi);
        assert!(outcome.is_partial());
    }

    #[test]
    fn test_serialized_shape() {
        let outcome = ResultAssembler::assemble("x", &[], 1);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["processing_method"], "ai-powered");
        assert_eq!(json["failed_ranges"], serde_json::json!([]));
    }
}
