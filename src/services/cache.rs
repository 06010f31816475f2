// Small keyed cache with a fixed time-to-live.
//
// Uses tokio's clock so expiry follows a paused runtime in tests.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// Thread-safe cache where every entry expires `ttl` after it was set.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: Mutex<HashMap<K, CacheEntry<V>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the live value for `key`, evicting it if it has expired.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock().unwrap();
        let now = Instant::now();
        match entries.get(key) {
            Some(entry) if now < entry.expires_at => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Store `value` under `key`, replacing any previous entry.
    pub fn set(&self, key: K, value: V) {
        let expires_at = Instant::now() + self.ttl;
        self.entries
            .lock()
            .unwrap()
            .insert(key, CacheEntry { value, expires_at });
    }

    /// Time left before `key` expires, if it is present and live.
    pub fn expires_in(&self, key: &K) -> Option<Duration> {
        let entries = self.entries.lock().unwrap();
        let now = Instant::now();
        entries
            .get(key)
            .filter(|e| now < e.expires_at)
            .map(|e| e.expires_at - now)
    }

    /// Number of stored entries, including any not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_get_within_ttl() {
        let cache = TtlCache::new(Duration::from_secs(5));
        cache.set("k", 1);
        tokio::time::advance(Duration::from_secs(4)).await;
        assert_eq!(cache.get(&"k"), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_and_is_evicted() {
        let cache = TtlCache::new(Duration::from_secs(5));
        cache.set("k", 1);
        assert_eq!(cache.len(), 1);

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(cache.get(&"k"), None);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_refreshes_expiry() {
        let cache = TtlCache::new(Duration::from_secs(5));
        cache.set("k", 1);
        tokio::time::advance(Duration::from_secs(3)).await;
        cache.set("k", 2);
        assert_eq!(cache.expires_in(&"k"), Some(Duration::from_secs(5)));

        tokio::time::advance(Duration::from_secs(3)).await;
        assert_eq!(cache.get(&"k"), Some(2));
    }

    #[test]
    fn test_missing_key() {
        let cache: TtlCache<&str, i32> = TtlCache::new(Duration::from_secs(5));
        assert_eq!(cache.get(&"nope"), None);
        assert_eq!(cache.expires_in(&"nope"), None);
        assert_eq!(cache.ttl(), Duration::from_secs(5));
    }
}
