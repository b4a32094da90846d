use std::path::Path;
use std::sync::Arc;

use lopdf::{Document as LoDocument, Object};

use crate::error::{Error, Result};

/// Thread-safe wrapper around a parsed PDF document
pub struct PdfDocument {
    /// The raw PDF bytes, returned as-is when a range covers every page
    bytes: Arc<Vec<u8>>,
    /// Parsed object graph, cloned for each page-range extraction
    parsed: Arc<LoDocument>,
    /// Cached metadata
    metadata: DocumentMetadata,
    /// Number of pages
    page_count: usize,
}

/// Document metadata
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
}

impl PdfDocument {
    /// Open a PDF from bytes
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();

        let parsed = LoDocument::load_mem(&bytes)
            .map_err(|e| Error::PdfOpen(format!("Failed to parse PDF: {e}")))?;

        let page_count = parsed.get_pages().len();
        let metadata = read_metadata(&parsed);

        Ok(Self {
            bytes: Arc::new(bytes),
            parsed: Arc::new(parsed),
            metadata,
            page_count,
        })
    }

    /// Open a PDF from a file path
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref()).map_err(|e| {
            Error::PdfOpen(format!("Failed to read file {}: {}", path.as_ref().display(), e))
        })?;
        Self::from_bytes(bytes)
    }

    /// Get document metadata
    pub const fn metadata(&self) -> &DocumentMetadata {
        &self.metadata
    }

    /// Get number of pages
    pub const fn page_count(&self) -> usize {
        self.page_count
    }

    /// Get raw PDF bytes as a slice.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Build a standalone PDF holding only the pages in `[start, end)`.
    ///
    /// Pages outside the range are deleted and objects no longer reachable
    /// from the page tree are pruned, so each sub-document carries only the
    /// resources its own pages use.
    pub fn extract_pages(&self, start: usize, end: usize) -> Result<Vec<u8>> {
        if start >= end || end > self.page_count {
            return Err(Error::PdfInvalidPage {
                start,
                end,
                total: self.page_count,
            });
        }

        if start == 0 && end == self.page_count {
            return Ok(self.bytes.to_vec());
        }

        let mut doc = (*self.parsed).clone();

        // lopdf page numbers are 1-based
        let to_delete: Vec<u32> = doc
            .get_pages()
            .keys()
            .copied()
            .filter(|&number| {
                let index = number.saturating_sub(1) as usize;
                index < start || index >= end
            })
            .collect();

        doc.delete_pages(&to_delete);
        doc.prune_objects();
        doc.renumber_objects();
        doc.compress();

        let mut output = Vec::new();
        doc.save_to(&mut output)
            .map_err(|e| Error::PdfSave(format!("Failed to save pages {start}..{end}: {e}")))?;

        Ok(output)
    }
}

impl Clone for PdfDocument {
    /// Clone the document efficiently.
    ///
    /// This is O(1) - it only clones the `Arc` pointers to the bytes and the
    /// parsed document. The metadata is also cloned (small struct).
    fn clone(&self) -> Self {
        Self {
            bytes: Arc::clone(&self.bytes),
            parsed: Arc::clone(&self.parsed),
            metadata: self.metadata.clone(),
            page_count: self.page_count,
        }
    }
}

impl std::fmt::Debug for PdfDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfDocument")
            .field("page_count", &self.page_count)
            .field("metadata", &self.metadata)
            .field("bytes_len", &self.bytes.len())
            .finish()
    }
}

fn read_metadata(doc: &LoDocument) -> DocumentMetadata {
    let Some(info) = doc
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|obj| doc.dereference(obj).ok())
        .and_then(|(_, obj)| obj.as_dict().ok())
    else {
        return DocumentMetadata::default();
    };

    let get_meta = |key: &[u8]| -> Option<String> {
        info.get(key)
            .ok()
            .and_then(|obj| obj.as_str().ok())
            .map(decode_text_string)
            .filter(|s| !s.trim().is_empty())
    };

    DocumentMetadata {
        title: get_meta(b"Title"),
        author: get_meta(b"Author"),
        subject: get_meta(b"Subject"),
    }
}

/// Decode a PDF text string: UTF-16BE with BOM, otherwise treated as Latin-1.
fn decode_text_string(raw: &[u8]) -> String {
    if let Some(utf16) = raw.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    raw.iter().map(|&b| char::from(b)).collect()
}

/// Build a minimal PDF with one Helvetica text line per page.
///
/// Used by tests across the crate to get real multi-page documents without
/// fixture files.
#[cfg(test)]
pub(crate) fn build_test_pdf(pages: &[&str]) -> Vec<u8> {
    use lopdf::content::{Content, Operation};
    use lopdf::{Dictionary, Stream};

    let mut doc = LoDocument::with_version("1.5");
    let page_tree_id = doc.new_object_id();

    let font_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
    ]));

    let resources_id = doc.add_object(Dictionary::from_iter([(
        "Font",
        Object::Dictionary(Dictionary::from_iter([("F1", Object::Reference(font_id))])),
    )]));

    let mut kids = Vec::with_capacity(pages.len());
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![100.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            Dictionary::new(),
            content.encode().unwrap_or_default(),
        ));
        let page_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(page_tree_id)),
            ("Contents", Object::Reference(content_id)),
            ("Resources", Object::Reference(resources_id)),
            (
                "MediaBox",
                Object::Array(vec![0.into(), 0.into(), 612.into(), 792.into()]),
            ),
        ]));
        kids.push(Object::Reference(page_id));
    }

    let count = i64::try_from(kids.len()).unwrap_or(i64::MAX);
    doc.objects.insert(
        page_tree_id,
        Object::Dictionary(Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(kids)),
            ("Count", Object::Integer(count)),
        ])),
    );

    let catalog_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(page_tree_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let info_id = doc.add_object(Dictionary::from_iter([(
        "Title",
        Object::string_literal("Test Document"),
    )]));
    doc.trailer.set("Info", Object::Reference(info_id));

    let mut output = Vec::new();
    doc.save_to(&mut output).unwrap_or_default();
    output
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_page_count_and_metadata() {
        let doc = PdfDocument::from_bytes(build_test_pdf(&["one", "two", "three"])).unwrap();
        assert_eq!(doc.page_count(), 3);
        assert_eq!(doc.metadata().title.as_deref(), Some("Test Document"));
        assert_eq!(doc.metadata().author, None);
    }

    #[test]
    fn test_extract_middle_range() {
        let doc = PdfDocument::from_bytes(build_test_pdf(&["a", "b", "c", "d", "e"])).unwrap();
        let sub = doc.extract_pages(1, 3).unwrap();
        assert!(sub.starts_with(b"%PDF"));

        let sub_doc = PdfDocument::from_bytes(sub).unwrap();
        assert_eq!(sub_doc.page_count(), 2);
    }

    #[test]
    fn test_extract_full_range_returns_original() {
        let bytes = build_test_pdf(&["a", "b"]);
        let doc = PdfDocument::from_bytes(bytes.clone()).unwrap();
        assert_eq!(doc.extract_pages(0, 2).unwrap(), bytes);
    }

    #[test]
    fn test_extract_invalid_ranges() {
        let doc = PdfDocument::from_bytes(build_test_pdf(&["a", "b"])).unwrap();
        assert!(matches!(
            doc.extract_pages(1, 1),
            Err(Error::PdfInvalidPage { .. })
        ));
        assert!(matches!(
            doc.extract_pages(0, 3),
            Err(Error::PdfInvalidPage { total: 2, .. })
        ));
    }

    #[test]
    fn test_invalid_pdf_bytes() {
        assert!(PdfDocument::from_bytes(vec![0, 1, 2, 3]).is_err());
        assert!(PdfDocument::from_bytes(Vec::new()).is_err());
    }

    #[test]
    fn test_decode_text_string() {
        assert_eq!(decode_text_string(b"Plain"), "Plain");
        assert_eq!(decode_text_string(&[0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69]), "Hi");
    }
}
