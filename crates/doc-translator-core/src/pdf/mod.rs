mod document;

pub use document::{DocumentMetadata, PdfDocument};

#[cfg(test)]
pub(crate) use document::build_test_pdf;
