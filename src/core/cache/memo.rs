//! In-process memo maps with a fixed time-to-live.
//!
//! Two instances exist per process: the discovered source list and the
//! resolved step scripts. Each owns its map behind its own mutex; the two are
//! never locked together.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::content::DEFAULT_TTL;

struct MemoEntry<V> {
    value: V,
    stored_at: Instant,
}

pub struct MemoCache<K, V> {
    ttl: Duration,
    entries: Mutex<HashMap<K, MemoEntry<V>>>,
}

impl<K, V> Default for MemoCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl<K, V> MemoCache<K, V>
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

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<K, MemoEntry<V>>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    pub(crate) fn get_at(&self, key: &K, now: Instant) -> Option<V> {
        let mut entries = self.lock();
        let expired = match entries.get(key) {
            None => return None,
            Some(entry) => now.saturating_duration_since(entry.stored_at) > self.ttl,
        };
        if expired {
            entries.remove(key);
            return None;
        }
        entries.get(key).map(|entry| entry.value.clone())
    }

    pub fn insert(&self, key: K, value: V) {
        self.lock().insert(
            key,
            MemoEntry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.lock().remove(key).map(|entry| entry.value)
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Resolved step scripts, keyed by `(source identifier, script reference)`.
///
/// Partitioning by source keeps a script resolved from one revision from being
/// reused after the caller switches to another.
pub type ScriptCache = MemoCache<(String, String), String>;

/// Discovered source identifiers, keyed by a listing name.
pub type SourceListCache = MemoCache<String, Vec<String>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_get() {
        let cache: ScriptCache = MemoCache::default();
        let key = ("local".to_string(), "setup.sh".to_string());
        assert_eq!(cache.get(&key), None);

        cache.insert(key.clone(), "echo hi".to_string());
        assert_eq!(cache.get(&key), Some("echo hi".to_string()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn same_script_in_different_sources_is_distinct() {
        let cache: ScriptCache = MemoCache::default();
        cache.insert(
            ("o/n@v1".to_string(), "setup.sh".to_string()),
            "v1".to_string(),
        );
        assert_eq!(
            cache.get(&("o/n@v2".to_string(), "setup.sh".to_string())),
            None
        );
    }

    #[test]
    fn expired_entries_are_dropped() {
        let cache: SourceListCache = MemoCache::new(Duration::from_secs(10));
        cache.insert("sources".to_string(), vec!["local".to_string()]);

        let later = Instant::now() + Duration::from_secs(11);
        assert_eq!(cache.get_at(&"sources".to_string(), later), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn remove_and_clear() {
        let cache: SourceListCache = MemoCache::default();
        cache.insert("a".to_string(), vec![]);
        cache.insert("b".to_string(), vec![]);
        assert!(cache.remove(&"a".to_string()).is_some());
        cache.clear();
        assert!(cache.is_empty());
    }
}
