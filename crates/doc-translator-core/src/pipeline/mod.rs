//! The chunked translation pipeline.
//!
//! [`ChunkedTranslationOrchestrator`] splits a document with the chunking
//! module, runs a [`TranslationAttempt`] per chunk and hands the collected
//! results to [`ResultAssembler`].

mod assemble;
mod attempt;
mod orchestrator;
#[cfg(test)]
pub(crate) mod testing;

pub use assemble::{CHUNK_SEPARATOR, ProcessingMethod, ResultAssembler, TranslationOutcome};
pub use attempt::{Backoff, ChunkResult, ChunkStatus, MAX_BACKOFF, TranslationAttempt};
pub use orchestrator::{ChunkedTranslationOrchestrator, ProgressCallback, ProgressEvent};
