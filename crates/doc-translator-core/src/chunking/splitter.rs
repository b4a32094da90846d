use tracing::debug;

use super::{ChunkSizePolicy, ChunkSpec, PageSource};
use crate::error::Result;
use crate::source::MediaType;

/// Tile `[0, total_pages)` with ranges of at most `chunk_size` pages.
///
/// Ranges are contiguous and in increasing order; the last one is clipped to
/// `total_pages`. A zero-page document yields no ranges.
pub fn split_pages(total_pages: usize, chunk_size: usize) -> Vec<ChunkSpec> {
    let chunk_size = chunk_size.max(1);
    (0..total_pages)
        .step_by(chunk_size)
        .enumerate()
        .map(|(i, start)| ChunkSpec::new(i + 1, start, (start + chunk_size).min(total_pages)))
        .collect()
}

/// A page range together with the sub-document that holds it.
pub struct Chunk {
    pub spec: ChunkSpec,
    pub payload: Vec<u8>,
    pub media_type: MediaType,
}

impl std::fmt::Debug for Chunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chunk")
            .field("spec", &self.spec)
            .field("media_type", &self.media_type)
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

/// Splits a [`PageSource`] into ordered chunks.
///
/// The range list is computed up front; payloads are extracted one at a
/// time when the caller asks for them, so only the chunk in flight is held
/// in memory.
pub struct PageRangeSplitter<'a> {
    source: &'a dyn PageSource,
    chunk_size: usize,
    specs: Vec<ChunkSpec>,
}

impl<'a> PageRangeSplitter<'a> {
    pub fn new(source: &'a dyn PageSource, policy: &ChunkSizePolicy) -> Self {
        let total_pages = source.total_pages();
        let chunk_size = policy.decide(source.total_bytes(), total_pages);
        let specs = split_pages(total_pages, chunk_size);

        debug!(
            "Split {} pages into {} chunks of up to {} pages",
            total_pages,
            specs.len(),
            chunk_size
        );

        Self {
            source,
            chunk_size,
            specs,
        }
    }

    pub const fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn specs(&self) -> &[ChunkSpec] {
        &self.specs
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Extract the payload for one range.
    pub fn load(&self, spec: &ChunkSpec) -> Result<Chunk> {
        let payload = self.source.extract(spec)?;
        Ok(Chunk {
            spec: *spec,
            payload,
            media_type: self.source.media_type(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::Error;

    struct FakeSource {
        pages: usize,
        bytes: u64,
    }

    impl PageSource for FakeSource {
        fn total_pages(&self) -> usize {
            self.pages
        }

        fn total_bytes(&self) -> u64 {
            self.bytes
        }

        fn media_type(&self) -> MediaType {
            MediaType::Pdf
        }

        fn extract(&self, spec: &ChunkSpec) -> Result<Vec<u8>> {
            if spec.end_page > self.pages {
                return Err(Error::PdfInvalidPage {
                    start: spec.start_page,
                    end: spec.end_page,
                    total: self.pages,
                });
            }
            Ok(format!("{}-{}", spec.start_page, spec.end_page).into_bytes())
        }
    }

    fn assert_tiles(specs: &[ChunkSpec], total: usize, chunk: usize) {
        assert_eq!(specs.first().map(|s| s.start_page), Some(0));
        assert_eq!(specs.last().map(|s| s.end_page), Some(total));
        for (i, spec) in specs.iter().enumerate() {
            assert_eq!(spec.index, i + 1);
            assert!(spec.end_page > spec.start_page);
            assert!(spec.page_count() <= chunk);
        }
        for pair in specs.windows(2) {
            assert_eq!(pair[0].end_page, pair[1].start_page);
        }
    }

    #[test]
    fn test_split_exact_multiple() {
        let specs = split_pages(10, 5);
        assert_eq!(specs, vec![ChunkSpec::new(1, 0, 5), ChunkSpec::new(2, 5, 10)]);
    }

    #[test]
    fn test_split_remainder_is_clipped() {
        let specs = split_pages(7, 3);
        assert_eq!(
            specs,
            vec![
                ChunkSpec::new(1, 0, 3),
                ChunkSpec::new(2, 3, 6),
                ChunkSpec::new(3, 6, 7)
            ]
        );
    }

    #[test]
    fn test_split_partition_property() {
        for total in 1..=60 {
            for chunk in 1..=13 {
                let specs = split_pages(total, chunk);
                assert_eq!(specs.len(), total.div_ceil(chunk));
                assert_tiles(&specs, total, chunk);
            }
        }
    }

    #[test]
    fn test_split_zero_pages() {
        assert!(split_pages(0, 50).is_empty());
    }

    #[test]
    fn test_span_display() {
        assert_eq!(ChunkSpec::new(1, 0, 5).span().to_string(), "pages 1-5");
        assert_eq!(ChunkSpec::new(3, 9, 10).span().to_string(), "page 10");
    }

    #[test]
    fn test_splitter_uses_policy_and_extracts() {
        let source = FakeSource { pages: 12, bytes: 1024 };
        let splitter = PageRangeSplitter::new(&source, &ChunkSizePolicy::fixed(5));
        assert_eq!(splitter.chunk_size(), 5);
        assert_eq!(splitter.specs().len(), 3);

        let chunk = splitter.load(&splitter.specs()[2]).unwrap();
        assert_eq!(chunk.payload, b"10-12");
        assert_eq!(chunk.media_type, MediaType::Pdf);
    }

    #[test]
    fn test_splitter_empty_document() {
        let source = FakeSource { pages: 0, bytes: 0 };
        let splitter = PageRangeSplitter::new(&source, &ChunkSizePolicy::default());
        assert!(splitter.is_empty());
    }
}
