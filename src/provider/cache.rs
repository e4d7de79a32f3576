//! Keyed executor cache
//!
//! Creates executors lazily, bounds the number kept alive, and disposes
//! every executor that leaves the cache.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::config::CacheSettings;
use crate::executor::{Executor, Listener};

use super::ExecutorProvider;

/// Builds the listener of the executor created for a key
pub type ListenerFactory<K> = Arc<dyn Fn(&K) -> Listener + Send + Sync>;

// ─────────────────────────────────────────────────────────────────
// Cache Entry
// ─────────────────────────────────────────────────────────────────

struct CacheEntry<T, E> {
    executor: Executor<T, E>,

    /// Logical timestamp of the last lookup
    last_used: u64,
}

struct CacheInner<K, T, E> {
    entries: HashMap<K, CacheEntry<T, E>>,
    clock: u64,
}

impl<K, T, E> CacheInner<K, T, E>
where
    K: Eq + Hash + Clone,
{
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Remove least recently used entries until at most `keep` remain
    fn shrink_to(&mut self, keep: usize) -> Vec<(K, Executor<T, E>)> {
        let excess = self.entries.len().saturating_sub(keep);
        if excess == 0 {
            return Vec::new();
        }

        let mut by_age: Vec<(K, u64)> = self
            .entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.last_used))
            .collect();
        by_age.sort_by_key(|(_, last_used)| *last_used);

        by_age
            .into_iter()
            .take(excess)
            .filter_map(|(key, _)| {
                self.entries
                    .remove(&key)
                    .map(|entry| (key, entry.executor))
            })
            .collect()
    }
}

// ─────────────────────────────────────────────────────────────────
// Executor Cache
// ─────────────────────────────────────────────────────────────────

/// One executor per key, least recently used keys evicted past capacity
pub struct ExecutorCache<K, T, E> {
    inner: Mutex<CacheInner<K, T, E>>,
    listener_factory: ListenerFactory<K>,

    /// Maximum live executors (0 = unbounded)
    max_entries: usize,
}

impl<K, T, E> ExecutorCache<K, T, E>
where
    K: Eq + Hash + Clone,
    T: Clone + PartialEq + Send + 'static,
    E: Clone + PartialEq + Send + 'static,
{
    /// Create an unbounded cache
    pub fn new<F>(listener_factory: F) -> Self
    where
        F: Fn(&K) -> Listener + Send + Sync + 'static,
    {
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                clock: 0,
            }),
            listener_factory: Arc::new(listener_factory),
            max_entries: 0,
        }
    }

    /// Create a cache whose executors notify nobody
    pub fn detached() -> Self {
        Self::new(|_| -> Listener { Arc::new(|| {}) })
    }

    /// Create a cache bounded by `settings.max_entries`
    pub fn from_settings<F>(settings: &CacheSettings, listener_factory: F) -> Self
    where
        F: Fn(&K) -> Listener + Send + Sync + 'static,
    {
        Self::new(listener_factory).with_max_entries(settings.max_entries)
    }

    /// Bound the cache to `max_entries` executors (0 = unbounded)
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Configured capacity
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Executor for `key` if one is cached, without creating it
    pub fn get(&self, key: &K) -> Option<Executor<T, E>> {
        let mut inner = self.inner.lock();
        let now = inner.tick();
        inner.entries.get_mut(key).map(|entry| {
            entry.last_used = now;
            entry.executor.clone()
        })
    }

    /// Whether `key` has a cached executor
    pub fn contains(&self, key: &K) -> bool {
        self.inner.lock().entries.contains_key(key)
    }

    /// Number of cached executors
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Whether the cache holds no executors
    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    /// Keys currently cached
    pub fn keys(&self) -> Vec<K> {
        self.inner.lock().entries.keys().cloned().collect()
    }

    /// Keep only the executors for which `keep` returns true
    pub fn retain<P>(&self, mut keep: P) -> usize
    where
        P: FnMut(&K, &Executor<T, E>) -> bool,
    {
        let evicted: Vec<Executor<T, E>> = {
            let mut inner = self.inner.lock();
            let doomed: Vec<K> = inner
                .entries
                .iter()
                .filter(|&(key, entry)| !keep(key, &entry.executor))
                .map(|(key, _)| key.clone())
                .collect();

            doomed
                .iter()
                .filter_map(|key| inner.entries.remove(key).map(|e| e.executor))
                .collect()
        };

        let count = evicted.len();
        dispose_all(evicted);
        count
    }

    /// Evict and dispose every executor
    pub fn clear(&self) {
        let evicted: Vec<Executor<T, E>> = {
            let mut inner = self.inner.lock();
            inner.entries.drain().map(|(_, entry)| entry.executor).collect()
        };

        debug!(count = evicted.len(), "Executor cache cleared");
        dispose_all(evicted);
    }
}

impl<K, T, E> ExecutorProvider<K, T, E> for ExecutorCache<K, T, E>
where
    K: Eq + Hash + Clone,
    T: Clone + PartialEq + Send + 'static,
    E: Clone + PartialEq + Send + 'static,
{
    fn executor(&self, key: &K) -> Executor<T, E> {
        let (executor, evicted) = {
            let mut inner = self.inner.lock();
            let now = inner.tick();

            if let Some(entry) = inner.entries.get_mut(key) {
                entry.last_used = now;
                return entry.executor.clone();
            }

            let executor = Executor::from_listener((self.listener_factory)(key));
            inner.entries.insert(
                key.clone(),
                CacheEntry {
                    executor: executor.clone(),
                    last_used: now,
                },
            );

            let evicted = if self.max_entries > 0 {
                inner.shrink_to(self.max_entries)
            } else {
                Vec::new()
            };
            (executor, evicted)
        };

        if !evicted.is_empty() {
            debug!(
                count = evicted.len(),
                max_entries = self.max_entries,
                "Evicted least recently used executors"
            );
        }
        dispose_all(evicted.into_iter().map(|(_, executor)| executor));

        executor
    }

    fn evict(&self, key: &K) -> bool {
        let removed = self.inner.lock().entries.remove(key);
        match removed {
            Some(entry) => {
                entry.executor.dispose();
                true
            }
            None => false,
        }
    }
}

/// Dispose outside the cache lock; listeners may call back into the cache
fn dispose_all<T, E, I>(executors: I)
where
    T: Clone + PartialEq + Send + 'static,
    E: Clone + PartialEq + Send + 'static,
    I: IntoIterator<Item = Executor<T, E>>,
{
    for executor in executors {
        executor.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_same_key_same_executor() {
        let cache: ExecutorCache<&str, i32, String> = ExecutorCache::detached();

        cache.executor(&"a").resolve(1);
        assert_eq!(cache.executor(&"a").result(), Some(1));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_listener_factory_receives_key() {
        let created = Arc::new(Mutex::new(Vec::new()));
        let cache: ExecutorCache<String, i32, String> = {
            let created = created.clone();
            ExecutorCache::new(move |key: &String| {
                created.lock().push(key.clone());
                Arc::new(|| {}) as Listener
            })
        };

        cache.executor(&"x".to_string());
        cache.executor(&"x".to_string());
        cache.executor(&"y".to_string());

        assert_eq!(*created.lock(), vec!["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn test_shrink_evicts_oldest() {
        let cache: ExecutorCache<u32, i32, String> =
            ExecutorCache::detached().with_max_entries(2);

        let first = cache.executor(&1);
        cache.executor(&2);
        cache.executor(&1);
        cache.executor(&3);

        assert!(cache.contains(&1));
        assert!(!cache.contains(&2));
        assert!(cache.contains(&3));
        assert!(!first.disposed());
    }

    #[test]
    fn test_retain_disposes_rejected_entries() {
        let notified = Arc::new(AtomicUsize::new(0));
        let cache: ExecutorCache<u32, i32, String> = {
            let notified = notified.clone();
            ExecutorCache::new(move |_: &u32| {
                let notified = notified.clone();
                Arc::new(move || {
                    notified.fetch_add(1, Ordering::SeqCst);
                }) as Listener
            })
        };

        let even = cache.executor(&2);
        let odd = cache.executor(&3);

        let removed = cache.retain(|key, _| key % 2 == 0);

        assert_eq!(removed, 1);
        assert!(!even.disposed());
        assert!(odd.disposed());
        assert_eq!(notified.load(Ordering::SeqCst), 1);
    }
}
