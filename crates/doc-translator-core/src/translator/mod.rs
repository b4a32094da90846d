mod gemini;
mod prompt;
mod traits;

pub use gemini::GeminiTranslator;
pub use prompt::{ChunkContext, FidelityMode, build_instructions};
pub use traits::{TextStream, Translator, TranslatorInfo};

use crate::config::TranslatorConfig;
use crate::error::Result;
use std::sync::Arc;

/// Create a translator from configuration
pub fn create_translator(config: &TranslatorConfig) -> Result<Arc<dyn Translator>> {
    let translator = GeminiTranslator::new(config)?;
    Ok(Arc::new(translator))
}
