//! Read-through cache entries with a fixed time to live.

use std::{
    hash::Hash,
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use rustc_hash::FxHashMap;
use tokio::time::Instant;

#[derive(Debug)]
struct Entry<V> {
    value: V,
    expires_at: Instant,
}

#[derive(Debug)]
pub(crate) struct TtlCache<K, V> {
    ttl: Duration,
    entries: Mutex<FxHashMap<K, Entry<V>>>,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    pub(crate) fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(FxHashMap::default()),
        }
    }

    /// Entries stay consistent across a panicking holder, so a poisoned lock is recovered.
    fn entries(&self) -> MutexGuard<'_, FxHashMap<K, Entry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fresh value for `key`, if any. Expired entries are dropped.
    pub(crate) fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries();

        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub(crate) fn insert(&self, key: K, value: V) {
        self.entries().insert(
            key,
            Entry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    pub(crate) fn invalidate(&self, key: &K) {
        self.entries().remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = TtlCache::new(Duration::from_secs(60));

        cache.insert(1_u64, "description".to_string());

        assert_eq!(cache.get(&1).as_deref(), Some("description"));

        tokio::time::advance(Duration::from_secs(61)).await;

        assert_eq!(cache.get(&1), None);
    }

    #[test]
    fn invalidate_removes_entry() {
        let cache = TtlCache::new(Duration::from_secs(60));

        cache.insert(1_u64, 5_u8);
        cache.invalidate(&1);

        assert_eq!(cache.get(&1), None);
    }

    #[test]
    fn poisoned_lock_keeps_the_cache_working() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert(1_u64, "description".to_string());

        let holder = std::thread::scope(|scope| {
            scope
                .spawn(|| {
                    let _entries = cache.entries.lock();
                    std::panic::resume_unwind(Box::new("holder died"));
                })
                .join()
        });

        assert!(holder.is_err(), "holder thread should have unwound");
        assert!(cache.entries.is_poisoned(), "lock should be poisoned");
        assert_eq!(cache.get(&1).as_deref(), Some("description"));

        cache.invalidate(&1);

        assert_eq!(cache.get(&1), None);
    }
}
