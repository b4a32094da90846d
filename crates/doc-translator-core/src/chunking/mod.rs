//! Partitioning a document into page-range chunks.
//!
//! [`ChunkSizePolicy`] picks how many pages go into one translation request,
//! [`PageRangeSplitter`] tiles `[0, total_pages)` with [`ChunkSpec`]s and
//! pulls each range out of the source as its own sub-document.

mod policy;
mod splitter;

pub use policy::ChunkSizePolicy;
pub use splitter::{Chunk, PageRangeSplitter, split_pages};

use serde::Serialize;

use crate::error::Result;
use crate::source::MediaType;

/// A half-open page range `[start_page, end_page)` with its 1-based position
/// in the chunk sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ChunkSpec {
    pub index: usize,
    pub start_page: usize,
    pub end_page: usize,
}

impl ChunkSpec {
    pub const fn new(index: usize, start_page: usize, end_page: usize) -> Self {
        Self {
            index,
            start_page,
            end_page,
        }
    }

    pub const fn page_count(&self) -> usize {
        self.end_page - self.start_page
    }

    /// Human-facing page span (1-based, inclusive).
    pub const fn span(&self) -> PageSpan {
        PageSpan {
            first: self.start_page + 1,
            last: self.end_page,
        }
    }
}

/// Inclusive, 1-based page numbers as shown to people.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageSpan {
    pub first: usize,
    pub last: usize,
}

impl std::fmt::Display for PageSpan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.first == self.last {
            write!(f, "page {}", self.first)
        } else {
            write!(f, "pages {}-{}", self.first, self.last)
        }
    }
}

/// A document that can hand out page ranges as standalone payloads.
pub trait PageSource: Send + Sync {
    fn total_pages(&self) -> usize;

    fn total_bytes(&self) -> u64;

    /// Media type of the payloads returned by [`PageSource::extract`].
    fn media_type(&self) -> MediaType;

    /// Sub-document holding only the pages of `spec`, same format as the source.
    fn extract(&self, spec: &ChunkSpec) -> Result<Vec<u8>>;
}
