use crate::scraper::Result;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Cached value with its insertion time and position in the FIFO order
struct CacheEntry<V> {
    value: Arc<V>,
    inserted_at: Instant,
    seq: u64,
}

struct Inner<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    /// Insertion order: sequence number -> key
    order: BTreeMap<u64, K>,
    next_seq: u64,
}

/// Bounded, time-expiring response cache.
///
/// Entries expire `ttl` after insertion and are dropped lazily. When full,
/// the oldest-inserted entry is evicted first (FIFO, not LRU).
pub struct ResponseCache<K, V> {
    inner: Mutex<Inner<K, V>>,
    /// One gate per key that is currently being populated
    in_flight: DashMap<K, Arc<tokio::sync::Mutex<()>>>,
    ttl: Duration,
    max_entries: usize,
}

impl<K, V> ResponseCache<K, V>
where
    K: Eq + Hash + Clone,
{
    /// `max_entries` of zero is treated as one
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                order: BTreeMap::new(),
                next_seq: 0,
            }),
            in_flight: DashMap::new(),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    /// Cached value if present and not expired
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        let expired = match inner.entries.get(key) {
            None => return None,
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => {
                return Some(Arc::clone(&entry.value));
            }
            Some(entry) => entry.seq,
        };

        inner.order.remove(&expired);
        inner.entries.remove(key);
        None
    }

    /// Insert or overwrite. An overwrite counts as a fresh insertion.
    pub fn put(&self, key: K, value: V) -> Arc<V> {
        let value = Arc::new(value);
        self.put_arc(key, Arc::clone(&value));
        value
    }

    fn put_arc(&self, key: K, value: Arc<V>) {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let now = Instant::now();

        if let Some(previous) = inner.entries.remove(&key) {
            inner.order.remove(&previous.seq);
        }

        // Oldest entries sit at the front of the order, so expired ones
        // can be dropped from there
        while let Some((&seq, oldest)) = inner.order.first_key_value() {
            let expired = inner
                .entries
                .get(oldest)
                .is_none_or(|e| now.duration_since(e.inserted_at) >= self.ttl);
            if !expired {
                break;
            }
            if let Some(oldest) = inner.order.remove(&seq) {
                inner.entries.remove(&oldest);
            }
        }

        while inner.entries.len() >= self.max_entries {
            let Some((_, oldest)) = inner.order.pop_first() else {
                break;
            };
            trace!("cache full, evicting oldest entry");
            inner.entries.remove(&oldest);
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.order.insert(seq, key.clone());
        inner.entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: now,
                seq,
            },
        );
    }

    /// Cached value, or the result of `init` which is then cached.
    ///
    /// Concurrent callers for the same key wait for the first one and see
    /// its value; callers for other keys are not held up. A failed `init`
    /// is not cached and the next waiter in line populates instead.
    pub async fn get_or_try_insert_with<F, Fut>(&self, key: K, init: F) -> Result<Arc<V>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        loop {
            if let Some(value) = self.get(&key) {
                return Ok(value);
            }

            let gate = Arc::clone(
                self.in_flight
                    .entry(key.clone())
                    .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                    .value(),
            );
            let _guard = gate.lock().await;

            // The gate was retired while we waited; start over with the current one
            let current = self
                .in_flight
                .get(&key)
                .is_some_and(|g| Arc::ptr_eq(g.value(), &gate));
            if !current {
                continue;
            }

            if let Some(value) = self.get(&key) {
                debug!("cache populated while waiting");
                self.in_flight.remove_if(&key, |_, g| Arc::ptr_eq(g, &gate));
                return Ok(value);
            }

            return match init().await {
                Ok(value) => {
                    let value = Arc::new(value);
                    self.put_arc(key.clone(), Arc::clone(&value));
                    self.in_flight.remove_if(&key, |_, g| Arc::ptr_eq(g, &gate));
                    Ok(value)
                }
                Err(e) => {
                    // Keep the gate while others queue on it
                    self.in_flight.remove_if(&key, |_, g| {
                        Arc::ptr_eq(g, &gate) && Arc::strong_count(g) == 2
                    });
                    Err(e)
                }
            };
        }
    }

    pub fn remove(&self, key: &K) -> Option<Arc<V>> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let entry = inner.entries.remove(key)?;
        inner.order.remove(&entry.seq);
        Some(entry.value)
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.order.clear();
    }

    /// Stored entries, including expired ones not yet dropped
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    pub const fn max_entries(&self) -> usize {
        self.max_entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::ScraperError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_put_then_get() {
        let cache = ResponseCache::new(Duration::from_secs(60), 5);
        let stored = cache.put(456, vec!["Pilot"]);

        let hit = cache.get(&456).unwrap();
        assert!(Arc::ptr_eq(&stored, &hit));
        assert!(cache.get(&457).is_none());
    }

    #[test]
    fn test_entry_expires_after_ttl() {
        let cache = ResponseCache::new(Duration::from_millis(40), 5);
        cache.put("show", 1);

        std::thread::sleep(Duration::from_millis(80));

        assert!(cache.get(&"show").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_evicts_oldest_inserted_first() {
        let cache = ResponseCache::new(Duration::from_secs(60), 2);
        cache.put("a", 1);
        cache.put("b", 2);
        // reading does not refresh position
        assert!(cache.get(&"a").is_some());
        cache.put("c", 3);

        assert!(cache.get(&"a").is_none());
        assert_eq!(*cache.get(&"b").unwrap(), 2);
        assert_eq!(*cache.get(&"c").unwrap(), 3);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_overwrite_moves_to_back() {
        let cache = ResponseCache::new(Duration::from_secs(60), 2);
        cache.put("a", 1);
        cache.put("b", 2);
        cache.put("a", 10);
        cache.put("c", 3);

        assert!(cache.get(&"b").is_none());
        assert_eq!(*cache.get(&"a").unwrap(), 10);
    }

    #[tokio::test]
    async fn test_get_or_insert_caches_success_only() {
        let cache: ResponseCache<u32, Vec<u32>> = ResponseCache::new(Duration::from_secs(60), 5);

        let failed = cache
            .get_or_try_insert_with(1, || async {
                Err(ScraperError::NotFound("nothing".to_string()))
            })
            .await;
        assert!(failed.is_err());
        assert!(cache.get(&1).is_none());

        let value = cache
            .get_or_try_insert_with(1, || async { Ok(vec![1, 2]) })
            .await
            .unwrap();
        assert_eq!(*value, vec![1, 2]);
        assert!(cache.get(&1).is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_populators_run_init_once() {
        let cache = Arc::new(ResponseCache::<u32, u32>::new(Duration::from_secs(60), 5));
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                tokio::spawn(async move {
                    cache
                        .get_or_try_insert_with(7, || async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(20)).await;
                            Ok(42)
                        })
                        .await
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(*handle.await.unwrap().unwrap(), 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_failed_populator_hands_over_to_one_waiter() {
        let cache = Arc::new(ResponseCache::<u32, u32>::new(Duration::from_secs(60), 5));
        let calls = Arc::new(AtomicUsize::new(0));
        let running = Arc::new(AtomicUsize::new(0));
        let max_running = Arc::new(AtomicUsize::new(0));

        let spawn = |start_after: u64, work: u64, outcome: Result<u32>| {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            let running = Arc::clone(&running);
            let max_running = Arc::clone(&max_running);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(start_after)).await;
                cache
                    .get_or_try_insert_with(7, || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                        max_running.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(work)).await;
                        running.fetch_sub(1, Ordering::SeqCst);
                        outcome
                    })
                    .await
            })
        };

        let failing = spawn(0, 100, Err(ScraperError::NotFound("show 7".to_string())));
        let waiter = spawn(20, 50, Ok(42));
        let late = spawn(130, 50, Ok(99));

        assert!(failing.await.unwrap().is_err());
        assert_eq!(*waiter.await.unwrap().unwrap(), 42);
        assert_eq!(*late.await.unwrap().unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(max_running.load(Ordering::SeqCst), 1);
    }
}
