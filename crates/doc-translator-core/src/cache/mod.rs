//! Two-layer cache of chunk translations: moka in memory, sled on disk.

mod disk;
mod key;
mod memory;

pub use disk::DiskCache;
pub use key::CacheKey;
pub use memory::MemoryCache;

use tracing::warn;

use crate::config::CacheConfig;
use crate::error::Result;

/// Combined cache with memory and disk layers
pub struct TranslationCache {
    memory: Option<MemoryCache>,
    disk: Option<DiskCache>,
}

impl TranslationCache {
    /// Create a new translation cache from configuration
    pub fn new(config: &CacheConfig) -> Result<Self> {
        let memory = config
            .memory_enabled
            .then(|| MemoryCache::new(config.memory_max_mb, config.memory_ttl_seconds));

        let disk = if config.disk_enabled {
            let path = config
                .disk_path
                .clone()
                .unwrap_or_else(crate::util::translation_cache_path);
            Some(DiskCache::new(path)?)
        } else {
            None
        };

        Ok(Self { memory, disk })
    }

    /// Whether either layer is active.
    pub const fn is_enabled(&self) -> bool {
        self.memory.is_some() || self.disk.is_some()
    }

    /// Get a cached chunk translation
    pub async fn get(&self, key: &CacheKey) -> Option<String> {
        let key_str = key.as_str();

        if let Some(ref memory) = self.memory
            && let Some(text) = memory.get(key_str).await
        {
            return Some(text);
        }

        if let Some(ref disk) = self.disk
            && let Some(text) = disk.get(key_str)
        {
            // Promote disk hits
            if let Some(ref memory) = self.memory {
                memory.insert(key_str.to_string(), &text).await;
            }
            return Some(text);
        }

        None
    }

    /// Store a chunk translation. Disk write failures are logged, not raised.
    pub async fn insert(&self, key: &CacheKey, text: &str) {
        if let Some(ref memory) = self.memory {
            memory.insert(key.as_str().to_string(), text).await;
        }

        if let Some(ref disk) = self.disk
            && let Err(e) = disk.insert(key.as_str(), text)
        {
            warn!("Failed to persist cache entry: {}", e);
        }
    }

    /// Clear all caches
    pub fn clear(&self) -> Result<()> {
        if let Some(ref memory) = self.memory {
            memory.clear();
        }

        if let Some(ref disk) = self.disk {
            disk.clear()?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn memory_only() -> CacheConfig {
        CacheConfig {
            memory_enabled: true,
            ..CacheConfig::disabled()
        }
    }

    #[tokio::test]
    async fn test_memory_round_trip() {
        let mut config = memory_only();
        config.memory_max_mb = 1;
        let cache = TranslationCache::new(&config).unwrap();
        let key = CacheKey::for_chunk(b"chunk", "into German", "model");

        assert_eq!(cache.get(&key).await, None);
        cache.insert(&key, "Guten Tag").await;
        assert_eq!(cache.get(&key).await.as_deref(), Some("Guten Tag"));

        cache.clear().unwrap();
        assert_eq!(cache.get(&key).await, None);
    }

    #[tokio::test]
    async fn test_disk_hit_promotes_to_memory() {
        let dir = tempfile::tempdir().unwrap();
        let key = CacheKey::for_chunk(b"chunk", "into French", "model");

        let disk_only = CacheConfig {
            disk_enabled: true,
            disk_path: Some(dir.path().to_path_buf()),
            ..CacheConfig::disabled()
        };
        TranslationCache::new(&disk_only)
            .unwrap()
            .insert(&key, "Bonjour")
            .await;

        let both = CacheConfig {
            memory_enabled: true,
            memory_max_mb: 1,
            ..disk_only
        };
        let cache = TranslationCache::new(&both).unwrap();
        assert_eq!(cache.get(&key).await.as_deref(), Some("Bonjour"));
    }

    #[test]
    fn test_disabled_cache() {
        let cache = TranslationCache::new(&CacheConfig::disabled()).unwrap();
        assert!(!cache.is_enabled());
    }
}
