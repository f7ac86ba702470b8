use dashmap::DashMap;
use image::DynamicImage;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A thread-safe cache with TTL (time-to-live) support
pub struct TtlCache<K, V> {
    data: DashMap<K, CacheEntry<V>>,
    ttl: Duration,
}

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<K, V> TtlCache<K, V>
where
    K: std::hash::Hash + Eq + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            data: DashMap::new(),
            ttl,
        }
    }

    /// Get a value if it exists and hasn't expired
    pub fn get(&self, key: &K) -> Option<V> {
        let entry = self.data.get(key)?;
        if entry.expires_at > Instant::now() {
            Some(entry.value.clone())
        } else {
            drop(entry);
            self.data.remove(key);
            None
        }
    }

    pub fn insert(&self, key: K, value: V) {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + self.ttl,
        };
        self.data.insert(key, entry);
    }

    /// Remove expired entries
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.data.retain(|_, entry| entry.expires_at > now);
    }

    /// Number of entries, expired ones included
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Decoded weather icons keyed by icon code ("10d")
pub type IconCache = Arc<TtlCache<String, Arc<DynamicImage>>>;

/// Icon artwork never changes for a code, a day is plenty
pub fn create_icon_cache() -> IconCache {
    Arc::new(TtlCache::new(Duration::from_secs(24 * 60 * 60)))
}

/// Start a background task that drops expired icons hourly
pub fn start_cache_cleanup_task(cache: IconCache) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60 * 60));
        loop {
            interval.tick().await;
            if cache.is_empty() {
                continue;
            }
            let before = cache.len();
            cache.cleanup();
            let after = cache.len();
            if before != after {
                tracing::debug!(
                    removed = before - after,
                    remaining = after,
                    "Icon cache cleanup completed"
                );
            }
        }
    });
}
