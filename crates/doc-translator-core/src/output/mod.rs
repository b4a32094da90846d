//! Writers that turn a translation into a downloadable file.

mod blocks;
mod docx;
mod html;
mod pdf;

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::config::Lang;
use crate::error::{Error, Result};
use crate::pdf::DocumentMetadata;
use crate::pipeline::TranslationOutcome;

/// Downloadable output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Txt,
    Html,
    Pdf,
    Docx,
}

impl OutputFormat {
    pub const ALL: [Self; 4] = [Self::Txt, Self::Html, Self::Pdf, Self::Docx];

    pub const fn extension(self) -> &'static str {
        match self {
            Self::Txt => "txt",
            Self::Html => "html",
            Self::Pdf => "pdf",
            Self::Docx => "docx",
        }
    }

    pub const fn mime(self) -> &'static str {
        match self {
            Self::Txt => "text/plain; charset=utf-8",
            Self::Html => "text/html; charset=utf-8",
            Self::Pdf => "application/pdf",
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "txt" | "text" => Ok(Self::Txt),
            "html" | "htm" => Ok(Self::Html),
            "pdf" => Ok(Self::Pdf),
            "docx" | "word" => Ok(Self::Docx),
            other => Err(Error::ConfigInvalid {
                field: "format".to_string(),
                reason: format!("unknown output format '{other}' (expected txt, html, pdf or docx)"),
            }),
        }
    }
}

/// Everything a writer needs besides the text itself.
#[derive(Debug, Clone)]
pub struct RenderContext<'a> {
    pub title: &'a str,
    pub metadata: &'a DocumentMetadata,
    pub target: &'a Lang,
}

impl RenderContext<'_> {
    /// Lines for the metadata banner at the top of rich formats.
    fn banner(&self, outcome: &TranslationOutcome) -> Vec<(&'static str, String)> {
        let mut lines = vec![
            ("Translated into", self.target.display_name().to_string()),
            (
                "Pages translated",
                format!("{} of {}", outcome.pages_processed, outcome.total_pages),
            ),
        ];
        if let Some(author) = &self.metadata.author {
            lines.push(("Author", author.clone()));
        }
        if let Some(subject) = &self.metadata.subject {
            lines.push(("Subject", subject.clone()));
        }
        if !outcome.failed_ranges.is_empty() {
            let ranges: Vec<String> = outcome.failed_ranges.iter().map(ToString::to_string).collect();
            lines.push(("Not translated", ranges.join(", ")));
        }
        lines
    }
}

/// Render a translation in the given format.
pub fn render(format: OutputFormat, outcome: &TranslationOutcome, ctx: &RenderContext<'_>) -> Result<Vec<u8>> {
    match format {
        OutputFormat::Txt => Ok(outcome.text.clone().into_bytes()),
        OutputFormat::Html => Ok(html::render(outcome, ctx).into_bytes()),
        OutputFormat::Pdf => pdf::render(outcome, ctx),
        OutputFormat::Docx => docx::render(outcome, ctx),
    }
}

/// `report.pdf` becomes `report_translated.docx`.
pub fn output_filename(original: &str, format: OutputFormat) -> String {
    let stem = std::path::Path::new(original)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("document");
    format!("{stem}_translated.{}", format.extension())
}

#[cfg(test)]
pub(crate) fn sample_outcome(text: &str) -> TranslationOutcome {
    use crate::chunking::ChunkSpec;
    use crate::pipeline::{ChunkResult, ResultAssembler};

    let chunks = vec![ChunkResult::success(ChunkSpec::new(1, 0, 2), text, 1)];
    ResultAssembler::assemble(text, &chunks, 2)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parsing() {
        assert_eq!("PDF".parse::<OutputFormat>().unwrap(), OutputFormat::Pdf);
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Txt);
        assert!("rtf".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_output_filename() {
        assert_eq!(output_filename("report.pdf", OutputFormat::Docx), "report_translated.docx");
        assert_eq!(output_filename("", OutputFormat::Txt), "document_translated.txt");
    }

    #[test]
    fn test_txt_is_verbatim() {
        let outcome = sample_outcome("Hello\n\nWorld");
        let metadata = DocumentMetadata::default();
        let lang = Lang::new("en");
        let ctx = RenderContext {
            title: "t",
            metadata: &metadata,
            target: &lang,
        };
        assert_eq!(render(OutputFormat::Txt, &outcome, &ctx).unwrap(), b"Hello\n\nWorld");
    }
}
