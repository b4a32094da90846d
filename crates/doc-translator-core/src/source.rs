//! Uploaded files: media type validation and page-addressable documents.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::chunking::{ChunkSpec, PageSource};
use crate::error::{Error, Result};
use crate::pdf::{DocumentMetadata, PdfDocument};

/// Media types accepted for translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Pdf,
    Docx,
    Doc,
    Jpeg,
    Png,
    Webp,
    Gif,
}

impl MediaType {
    pub const ALL: [Self; 7] = [
        Self::Pdf,
        Self::Docx,
        Self::Doc,
        Self::Jpeg,
        Self::Png,
        Self::Webp,
        Self::Gif,
    ];

    /// Parse a MIME type, ignoring case and parameters such as `charset`.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|t| t.mime() == essence)
    }

    pub const fn mime(self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::Doc => "application/msword",
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
            Self::Gif => "image/gif",
        }
    }

    /// Whether the format can be split into page ranges.
    pub const fn is_paginated(self) -> bool {
        matches!(self, Self::Pdf)
    }

    pub const fn is_image(self) -> bool {
        matches!(self, Self::Jpeg | Self::Png | Self::Webp | Self::Gif)
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mime())
    }
}

/// An uploaded file as received from the caller, not yet validated.
#[derive(Clone)]
pub struct SourceFile {
    pub filename: String,
    pub bytes: Vec<u8>,
    /// Declared MIME type; guessed from the filename when absent
    pub mime_type: Option<String>,
}

impl SourceFile {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>, mime_type: Option<String>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
            mime_type,
        }
    }

    /// Read a file from disk, guessing its type from the extension.
    pub fn from_path(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let filename = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("document")
            .to_string();
        Ok(Self::new(filename, bytes, None))
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Validate presence, media type and size. Runs before any translation work.
    pub fn validate(&self, max_size: u64) -> Result<MediaType> {
        if self.bytes.is_empty() {
            return Err(Error::MissingFile);
        }

        let declared = self
            .mime_type
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty() && !m.eq_ignore_ascii_case("application/octet-stream"));

        let media_type = match declared {
            Some(mime) => MediaType::from_mime(mime)
                .ok_or_else(|| Error::UnsupportedFileType(mime.to_string()))?,
            None => {
                let guessed = mime_guess::from_path(&self.filename).first_raw();
                guessed.and_then(MediaType::from_mime).ok_or_else(|| {
                    Error::UnsupportedFileType(
                        guessed.map_or_else(|| self.filename.clone(), str::to_string),
                    )
                })?
            }
        };

        let size = self.size_bytes();
        if size > max_size {
            return Err(Error::FileTooLarge {
                size,
                limit: max_size,
            });
        }

        if media_type == MediaType::Pdf && !self.bytes.starts_with(b"%PDF-") {
            return Err(Error::InvalidDocument(
                "file does not appear to be a valid PDF".to_string(),
            ));
        }

        Ok(media_type)
    }
}

impl std::fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceFile")
            .field("filename", &self.filename)
            .field("mime_type", &self.mime_type)
            .field("bytes_len", &self.bytes.len())
            .finish()
    }
}

enum Content {
    Paged(PdfDocument),
    Whole(Arc<Vec<u8>>),
}

/// A validated, loaded document ready to be split into chunks.
///
/// Immutable once loaded. Paginated formats expose their real page count;
/// everything else is treated as a single page whose sub-document is the
/// whole payload.
pub struct SourceDocument {
    filename: String,
    media_type: MediaType,
    size_bytes: u64,
    content: Content,
}

impl SourceDocument {
    /// Validate and load an uploaded file.
    pub fn load(file: SourceFile, max_size: u64) -> Result<Self> {
        let media_type = file.validate(max_size)?;
        let size_bytes = file.size_bytes();

        let content = if media_type.is_paginated() {
            Content::Paged(PdfDocument::from_bytes(file.bytes)?)
        } else {
            Content::Whole(Arc::new(file.bytes))
        };

        Ok(Self {
            filename: file.filename,
            media_type,
            size_bytes,
            content,
        })
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn metadata(&self) -> DocumentMetadata {
        match &self.content {
            Content::Paged(pdf) => pdf.metadata().clone(),
            Content::Whole(_) => DocumentMetadata::default(),
        }
    }

    /// Title for rendered output: document title, else the file stem.
    pub fn title(&self) -> String {
        self.metadata().title.unwrap_or_else(|| {
            std::path::Path::new(&self.filename)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("Translated Document")
                .to_string()
        })
    }
}

impl PageSource for SourceDocument {
    fn total_pages(&self) -> usize {
        match &self.content {
            Content::Paged(pdf) => pdf.page_count(),
            Content::Whole(_) => 1,
        }
    }

    fn total_bytes(&self) -> u64 {
        self.size_bytes
    }

    fn media_type(&self) -> MediaType {
        self.media_type
    }

    fn extract(&self, spec: &ChunkSpec) -> Result<Vec<u8>> {
        match &self.content {
            Content::Paged(pdf) => pdf.extract_pages(spec.start_page, spec.end_page),
            Content::Whole(bytes) => {
                if spec.start_page == 0 && spec.end_page == 1 {
                    Ok(bytes.to_vec())
                } else {
                    Err(Error::PdfInvalidPage {
                        start: spec.start_page,
                        end: spec.end_page,
                        total: 1,
                    })
                }
            }
        }
    }
}

impl std::fmt::Debug for SourceDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceDocument")
            .field("filename", &self.filename)
            .field("media_type", &self.media_type)
            .field("size_bytes", &self.size_bytes)
            .field("total_pages", &self.total_pages())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::pdf::build_test_pdf;

    const LIMIT: u64 = 200 * 1024 * 1024;

    #[test]
    fn test_from_mime() {
        assert_eq!(MediaType::from_mime("application/pdf"), Some(MediaType::Pdf));
        assert_eq!(MediaType::from_mime("IMAGE/PNG"), Some(MediaType::Png));
        assert_eq!(
            MediaType::from_mime("application/msword; charset=binary"),
            Some(MediaType::Doc)
        );
        assert_eq!(MediaType::from_mime("text/plain"), None);
    }

    #[test]
    fn test_validate_missing_file() {
        let file = SourceFile::new("a.pdf", Vec::new(), None);
        assert!(matches!(file.validate(LIMIT), Err(Error::MissingFile)));
    }

    #[test]
    fn test_validate_unsupported_type() {
        let file = SourceFile::new("notes.txt", b"hello".to_vec(), Some("text/plain".into()));
        assert!(matches!(file.validate(LIMIT), Err(Error::UnsupportedFileType(_))));

        let file = SourceFile::new("archive.zip", b"PK".to_vec(), None);
        assert!(matches!(file.validate(LIMIT), Err(Error::UnsupportedFileType(_))));
    }

    #[test]
    fn test_validate_too_large() {
        let file = SourceFile::new("photo.png", vec![0; 11], Some("image/png".into()));
        assert!(matches!(
            file.validate(10),
            Err(Error::FileTooLarge { size: 11, limit: 10 })
        ));
    }

    #[test]
    fn test_validate_guesses_from_extension() {
        let file = SourceFile::new(
            "scan.JPG",
            vec![0xFF, 0xD8],
            Some("application/octet-stream".into()),
        );
        assert_eq!(file.validate(LIMIT).unwrap(), MediaType::Jpeg);

        let file = SourceFile::new("letter.docx", b"PK".to_vec(), None);
        assert_eq!(file.validate(LIMIT).unwrap(), MediaType::Docx);
    }

    #[test]
    fn test_validate_rejects_fake_pdf() {
        let file = SourceFile::new("a.pdf", b"not a pdf".to_vec(), Some("application/pdf".into()));
        assert!(matches!(file.validate(LIMIT), Err(Error::InvalidDocument(_))));
    }

    #[test]
    fn test_load_pdf_pages() {
        let file = SourceFile::new("book.pdf", build_test_pdf(&["1", "2", "3", "4"]), None);
        let doc = SourceDocument::load(file, LIMIT).unwrap();
        assert_eq!(doc.total_pages(), 4);
        assert_eq!(doc.media_type(), MediaType::Pdf);
        assert_eq!(doc.title(), "Test Document");

        let spec = ChunkSpec::new(1, 0, 2);
        let sub = PdfDocument::from_bytes(doc.extract(&spec).unwrap()).unwrap();
        assert_eq!(sub.page_count(), 2);
    }

    #[test]
    fn test_load_image_is_single_page() {
        let bytes = vec![0x89, 0x50, 0x4E, 0x47];
        let file = SourceFile::new("scan.png", bytes.clone(), None);
        let doc = SourceDocument::load(file, LIMIT).unwrap();
        assert_eq!(doc.total_pages(), 1);
        assert_eq!(doc.title(), "scan");
        assert_eq!(doc.extract(&ChunkSpec::new(1, 0, 1)).unwrap(), bytes);
        assert!(doc.extract(&ChunkSpec::new(2, 1, 2)).is_err());
    }
}
