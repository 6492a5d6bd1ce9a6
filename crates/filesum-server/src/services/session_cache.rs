use dashmap::DashMap;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::models::ConversationKey;

/// Time source for cache expiry. `Instant` is monotonic, so expiry can never
/// be undone by a wall-clock adjustment.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to. Used to drive TTL expiry in tests
/// without sleeping.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.offset.lock()
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: T,
    pub expires_at: Instant,
}

impl<T> CacheEntry<T> {
    pub fn new(value: T, expires_at: Instant) -> Self {
        Self { value, expires_at }
    }

    /// An entry is logically gone once `now` reaches its expiry,
    /// whether or not it has been physically removed yet.
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Key-value table with one TTL for every entry, expiry checked on access.
pub struct ExpiringCache<V> {
    name: &'static str,
    ttl: Duration,
    storage: DashMap<ConversationKey, CacheEntry<V>>,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> ExpiringCache<V> {
    pub fn new(name: &'static str, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            name,
            ttl,
            storage: DashMap::new(),
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Insert or overwrite; the expiry restarts from now.
    pub fn put(&self, key: &ConversationKey, value: V) {
        let expires_at = self.clock.now() + self.ttl;
        self.storage.insert(key.clone(), CacheEntry::new(value, expires_at));
        debug!("[{}] stored {} (ttl {:?})", self.name, key, self.ttl);
    }

    /// Returns None if not found or expired
    pub fn get(&self, key: &ConversationKey) -> Option<V> {
        let entry = self.storage.get(key)?;

        // Lazy deletion
        if entry.is_expired(self.clock.now()) {
            drop(entry); // release the shard read lock before removing
            self.storage
                .remove_if(key, |_, e| e.is_expired(self.clock.now()));
            debug!("[{}] {} expired, removed", self.name, key);
            return None;
        }

        Some(entry.value.clone())
    }

    /// Apply `f` to a live entry in place without touching its expiry.
    /// Returns false when the entry is missing or expired.
    pub fn update(&self, key: &ConversationKey, f: impl FnOnce(&mut V)) -> bool {
        let now = self.clock.now();
        match self.storage.get_mut(key) {
            Some(mut entry) if !entry.is_expired(now) => {
                f(&mut entry.value);
                true
            }
            _ => false,
        }
    }

    pub fn remove(&self, key: &ConversationKey) -> Option<V> {
        let removed = self.storage.remove(key).map(|(_, entry)| entry.value);
        if removed.is_some() {
            debug!("[{}] removed {}", self.name, key);
        }
        removed
    }

    pub fn contains(&self, key: &ConversationKey) -> bool {
        self.get(key).is_some()
    }

    /// Physically stored entries, live or not yet swept
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Drop every expired entry. Returns number of entries removed
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.storage.len();
        self.storage.retain(|_, entry| !entry.is_expired(now));
        let count = before.saturating_sub(self.storage.len());

        if count > 0 {
            info!("[{}] purged {} expired entries", self.name, count);
        }
        count
    }
}

/// A received file waiting for its summary trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFile {
    pub path: PathBuf,
    /// Set once summarization of this upload has started
    pub processed: bool,
}

impl PendingFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            processed: false,
        }
    }
}

/// Plain text of a summarized file, kept for follow-up questions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedContent {
    pub text: String,
    /// Summary for this text has been delivered
    pub processed: bool,
}

/// The two expiring tables behind the summarization flow.
/// Built once per process, TTLs taken from configuration; dropping it is the teardown.
pub struct SessionStore {
    pub pending: ExpiringCache<PendingFile>,
    pub content: ExpiringCache<ExtractedContent>,
}

impl SessionStore {
    pub fn new(file_ttl: Duration, content_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        info!(
            "Initializing session store (file ttl {:?}, content ttl {:?})",
            file_ttl, content_ttl
        );
        Self {
            pending: ExpiringCache::new("pending", file_ttl, clock.clone()),
            content: ExpiringCache::new("content", content_ttl, clock),
        }
    }

    pub fn purge_expired(&self) -> usize {
        self.pending.purge_expired() + self.content.purge_expired()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(n: u32) -> ConversationKey {
        ConversationKey::new(&format!("chat{}", n), "user")
    }

    fn cache(ttl_secs: u64) -> (Arc<ManualClock>, ExpiringCache<String>) {
        let clock = Arc::new(ManualClock::new());
        let cache = ExpiringCache::new("test", Duration::from_secs(ttl_secs), clock.clone());
        (clock, cache)
    }

    #[test]
    fn test_cache_basic_operations() {
        let (_, cache) = cache(60);
        let k = key(1);

        cache.put(&k, "a".to_string());
        assert_eq!(cache.get(&k), Some("a".to_string()));
        assert!(cache.contains(&k));

        cache.put(&k, "b".to_string());
        assert_eq!(cache.get(&k), Some("b".to_string()));
        assert_eq!(cache.len(), 1);

        assert_eq!(cache.remove(&k), Some("b".to_string()));
        assert!(!cache.contains(&k));
        assert_eq!(cache.remove(&k), None);
    }

    #[test]
    fn test_get_after_ttl_is_absent_without_remove() {
        let (clock, cache) = cache(60);
        let k = key(1);
        cache.put(&k, "a".to_string());

        clock.advance(Duration::from_secs(59));
        assert!(cache.contains(&k));

        clock.advance(Duration::from_secs(1));
        assert_eq!(cache.get(&k), None);
        assert!(!cache.contains(&k));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_put_resets_expiry() {
        let (clock, cache) = cache(60);
        let k = key(1);
        cache.put(&k, "old".to_string());

        clock.advance(Duration::from_secs(50));
        cache.put(&k, "new".to_string());
        clock.advance(Duration::from_secs(50));

        assert_eq!(cache.get(&k), Some("new".to_string()));
    }

    #[test]
    fn test_update_keeps_expiry() {
        let (clock, cache) = cache(60);
        let k = key(1);
        cache.put(&k, "a".to_string());

        clock.advance(Duration::from_secs(30));
        assert!(cache.update(&k, |v| v.push('!')));
        assert_eq!(cache.get(&k), Some("a!".to_string()));

        clock.advance(Duration::from_secs(30));
        assert!(!cache.update(&k, |v| v.push('!')));
        assert_eq!(cache.get(&k), None);
    }

    #[test]
    fn test_purge_expired() {
        let (clock, cache) = cache(60);
        cache.put(&key(1), "a".to_string());
        clock.advance(Duration::from_secs(30));
        cache.put(&key(2), "b".to_string());

        clock.advance(Duration::from_secs(30));
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&key(2)));
    }

    #[test]
    fn test_keys_independent() {
        let (_, cache) = cache(60);
        cache.put(&key(1), "a".to_string());
        cache.put(&key(2), "b".to_string());

        cache.remove(&key(1));
        assert_eq!(cache.get(&key(2)), Some("b".to_string()));
    }

    #[test]
    fn test_store_tables_expire_independently() {
        let clock = Arc::new(ManualClock::new());
        let store = SessionStore::new(
            Duration::from_secs(60),
            Duration::from_secs(300),
            clock.clone(),
        );
        let k = key(1);

        store.pending.put(&k, PendingFile::new("/tmp/a.txt"));
        store.content.put(
            &k,
            ExtractedContent {
                text: "hello".to_string(),
                processed: true,
            },
        );

        clock.advance(Duration::from_secs(61));
        assert!(!store.pending.contains(&k));
        assert!(store.content.contains(&k));

        clock.advance(Duration::from_secs(300));
        assert_eq!(store.purge_expired(), 1);
        assert!(!store.content.contains(&k));
    }
}
