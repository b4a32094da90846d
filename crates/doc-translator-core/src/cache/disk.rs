use sled::{Db, Tree};
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{Error, Result};

const TRANSLATIONS_TREE: &str = "chunk-translations";

/// Persistent layer backed by sled, one UTF-8 value per chunk key.
pub struct DiskCache {
    db: Db,
    translations: Tree,
}

impl DiskCache {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        std::fs::create_dir_all(path).map_err(|e| {
            Error::CacheInit(format!(
                "Failed to create cache directory {}: {}",
                path.display(),
                e
            ))
        })?;

        let db = sled::open(path).map_err(|e| {
            let err_str = e.to_string();
            if err_str.contains("WouldBlock") || err_str.contains("lock") {
                Error::CacheInit(format!(
                    "Cache locked at {}\n\n\
                    Another process is using the cache, or a previous instance crashed.\n\
                    To fix: rm {}/db/LOCK",
                    path.display(),
                    path.display()
                ))
            } else {
                Error::CacheInit(format!("Failed to open cache at {}: {}", path.display(), e))
            }
        })?;

        let translations = db
            .open_tree(TRANSLATIONS_TREE)
            .map_err(|e| Error::CacheInit(format!("Failed to open cache tree: {e}")))?;

        debug!(
            "Opened disk cache at {} ({} entries)",
            path.display(),
            translations.len()
        );

        Ok(Self { db, translations })
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match self.translations.get(key.as_bytes()) {
            Ok(Some(value)) => match String::from_utf8(value.to_vec()) {
                Ok(text) => Some(text),
                Err(_) => {
                    warn!("Discarding non-UTF-8 cache entry {}", key);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("Cache read error: {}", e);
                None
            }
        }
    }

    pub fn insert(&self, key: &str, text: &str) -> Result<()> {
        self.translations
            .insert(key.as_bytes(), text.as_bytes())
            .map_err(|e| Error::CacheWrite(e.to_string()))?;

        self.db
            .flush()
            .map_err(|e| Error::CacheWrite(format!("Flush failed: {e}")))?;

        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        self.translations
            .clear()
            .map_err(|e| Error::CacheWrite(e.to_string()))?;
        self.db
            .flush()
            .map_err(|e| Error::CacheWrite(format!("Flush failed: {e}")))?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.translations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.translations.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let cache = DiskCache::new(dir.path()).unwrap();
            cache.insert("k1", "Hallo Welt").unwrap();
            assert_eq!(cache.len(), 1);
        }
        let cache = DiskCache::new(dir.path()).unwrap();
        assert_eq!(cache.get("k1").as_deref(), Some("Hallo Welt"));
        assert_eq!(cache.get("missing"), None);

        cache.clear().unwrap();
        assert!(cache.is_empty());
    }
}
