use serde::{Deserialize, Serialize};

const MIB: u64 = 1024 * 1024;

/// Decides how many pages go into a single translation request.
///
/// Tiers are checked in order and the first match wins: very large files get
/// small chunks to keep each inlined payload under request-size limits, long
/// documents get medium chunks, everything else uses the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSizePolicy {
    pub large_file_bytes: u64,
    pub large_file_pages: usize,
    pub long_document_pages: usize,
    pub long_document_chunk: usize,
    pub default_chunk: usize,
}

impl ChunkSizePolicy {
    /// A policy that always answers `pages`, whatever the document looks like.
    pub const fn fixed(pages: usize) -> Self {
        let pages = if pages == 0 { 1 } else { pages };
        Self {
            large_file_bytes: 0,
            large_file_pages: pages,
            long_document_pages: 0,
            long_document_chunk: pages,
            default_chunk: pages,
        }
    }

    /// Chunk size in pages; always at least 1.
    pub fn decide(&self, total_bytes: u64, total_pages: usize) -> usize {
        let size = if total_bytes > self.large_file_bytes {
            self.large_file_pages
        } else if total_pages > self.long_document_pages {
            self.long_document_chunk
        } else {
            self.default_chunk
        };
        size.max(1)
    }
}

impl Default for ChunkSizePolicy {
    fn default() -> Self {
        Self {
            large_file_bytes: 50 * MIB,
            large_file_pages: 25,
            long_document_pages: 200,
            long_document_chunk: 30,
            default_chunk: 50,
        }
    }
}
