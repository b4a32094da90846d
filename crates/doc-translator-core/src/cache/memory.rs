use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

/// In-memory layer holding chunk translations, evicted by total text size.
pub struct MemoryCache {
    cache: Cache<String, Arc<str>>,
}

impl MemoryCache {
    pub fn new(max_mb: u64, ttl_seconds: u64) -> Self {
        let max_bytes = max_mb.saturating_mul(1024 * 1024);

        let mut builder = Cache::builder()
            .max_capacity(max_bytes)
            .weigher(|key: &String, value: &Arc<str>| -> u32 {
                (key.len() + value.len()).try_into().unwrap_or(u32::MAX)
            });

        if ttl_seconds > 0 {
            builder = builder.time_to_live(Duration::from_secs(ttl_seconds));
        }

        Self {
            cache: builder.build(),
        }
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        self.cache.get(key).await.map(|text| text.to_string())
    }

    pub async fn insert(&self, key: String, text: &str) {
        self.cache.insert(key, Arc::from(text)).await;
    }

    pub fn clear(&self) {
        self.cache.invalidate_all();
    }
}
