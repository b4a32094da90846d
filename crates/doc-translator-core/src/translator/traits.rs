use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;
use crate::source::MediaType;

/// Fragments of translated text as the backend produces them.
///
/// An `Err` item ends the stream; fragments received before it must not be
/// treated as a complete translation.
pub type TextStream = BoxStream<'static, Result<String>>;

/// Information about a translator backend
#[derive(Debug, Clone)]
pub struct TranslatorInfo {
    /// Human-readable name
    pub name: &'static str,
    /// Model identifier, part of the chunk cache key
    pub model: String,
    /// Whether this translator requires an API key
    pub requires_api_key: bool,
}

/// Trait for document translation backends
#[async_trait]
pub trait Translator: Send + Sync {
    /// Get information about this translator
    fn info(&self) -> TranslatorInfo;

    /// Get the translator name (convenience method)
    fn name(&self) -> &'static str {
        self.info().name
    }

    /// Send a document payload with instructions and stream back the text.
    ///
    /// Errors raised before any output (connection failures, HTTP status)
    /// are returned directly; errors after that arrive through the stream.
    async fn translate(
        &self,
        payload: &[u8],
        media_type: MediaType,
        instructions: &str,
    ) -> Result<TextStream>;

    /// Check if the translator is available (e.g., API key configured)
    fn is_available(&self) -> bool {
        true
    }
}
