//! Instruction prompts sent alongside each chunk.

use serde::{Deserialize, Serialize};

use crate::chunking::ChunkSpec;
use crate::config::Lang;

/// Output style requested from the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FidelityMode {
    /// Plain, fluent prose
    #[default]
    Standard,
    /// Markdown that mirrors the document's structure
    HighFidelity,
}

impl FidelityMode {
    pub const fn from_high_fidelity(high_fidelity: bool) -> Self {
        if high_fidelity {
            Self::HighFidelity
        } else {
            Self::Standard
        }
    }
}

/// Where a chunk sits in the whole document, for the prompt's preamble.
#[derive(Debug, Clone, Copy)]
pub struct ChunkContext {
    pub spec: ChunkSpec,
    pub total_pages: usize,
    pub total_chunks: usize,
}

/// Build the instructions for one chunk.
pub fn build_instructions(target: &Lang, mode: FidelityMode, context: Option<&ChunkContext>) -> String {
    let language = target.display_name();
    let mut prompt = String::from("You are an expert multilingual translator.");

    if let Some(ctx) = context.filter(|ctx| ctx.total_chunks > 1) {
        prompt.push_str(&format!(
            " The attached file is {} of a {}-page document (part {} of {}). \
             Translate only this part; do not summarise or refer to other parts.",
            ctx.spec.span(),
            ctx.total_pages,
            ctx.spec.index,
            ctx.total_chunks
        ));
    }

    prompt.push_str(&format!(
        "\n\n1. EXTRACT: Read ALL text in the attached document, including complex scripts \
         (Malayalam, Hindi, Arabic, Tamil and others), text inside images, headers, footers \
         and footnotes.\n\
         2. TRANSLATE: Translate everything into natural, fluent {language}, preserving \
         meaning, technical terms and proper names. Text already in {language} is kept as-is.\n"
    ));

    match mode {
        FidelityMode::Standard => prompt.push_str(
            "3. FORMAT: Return plain prose as continuous, well-formed paragraphs separated by \
             blank lines. Do not use markdown.\n",
        ),
        FidelityMode::HighFidelity => prompt.push_str(
            "3. FORMAT: Preserve the document structure using markdown:\n\
             - # for document or chapter titles, ## for section headings, ### for \
             sub-sections; never skip a level\n\
             - **bold** for important text and emphasis, *italic* for secondary emphasis\n\
             - - for bullet lists and 1. 2. 3. for numbered lists\n\
             - keep paragraph breaks and table rows in reading order\n",
        ),
    }

    prompt.push_str(
        "4. OUTPUT: Return ONLY the translated content. No preambles, explanations or \
         phrases like \"Here is the translation\". If the document contains no readable \
         text, return an empty response.",
    );

    prompt
}
