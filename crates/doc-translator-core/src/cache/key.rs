/// Cache key for one translated chunk.
///
/// An MD5 digest over the chunk payload, the exact instruction text and the
/// model name. The instructions already carry the target language, the
/// fidelity mode and the chunk's position in the document, so any change to
/// those yields a different key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    hash: String,
}

impl CacheKey {
    pub fn for_chunk(payload: &[u8], instructions: &str, model: &str) -> Self {
        let payload_digest = md5::compute(payload);
        // Null separators keep ("a", "bc") and ("ab", "c") apart.
        let combined = format!(
            "{payload_digest:x}\0{instructions}\0{}",
            model.to_lowercase()
        );

        Self {
            hash: format!("{:x}", md5::compute(combined.as_bytes())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.hash
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.hash)
    }
}
