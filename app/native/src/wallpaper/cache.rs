//! Bounded cache of theme analyses keyed by wallpaper path.
//!
//! Entries are persisted through the settings store under
//! [`keys::THEME_CACHE`]. Writes are deferred: [`ThemeCache::put`] only marks
//! the cache dirty and the owner calls [`ThemeCache::flush`] once per batch.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{Map, Value};

use super::types::{CachedThemeEntry, ThemeAnalysis};
use crate::config::{ConfigError, ConfigStore, keys};

/// Milliseconds since the Unix epoch.
fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
}

pub struct ThemeCache {
    entries: HashMap<PathBuf, CachedThemeEntry>,
    max_size: usize,
    last_timestamp: u64,
    dirty: bool,
    store: Arc<dyn ConfigStore>,
}

impl ThemeCache {
    /// Creates an empty cache bound to `max_size` entries.
    #[must_use]
    pub fn new(store: Arc<dyn ConfigStore>, max_size: usize) -> Self {
        Self {
            entries: HashMap::new(),
            max_size,
            last_timestamp: 0,
            dirty: false,
            store,
        }
    }

    /// Loads the persisted cache from the settings store.
    pub fn load_from_store(&mut self) -> usize {
        let persisted = self.store.get(keys::THEME_CACHE).unwrap_or(Value::Null);
        self.load(&persisted)
    }

    /// Replaces the in-memory entries with `persisted`.
    ///
    /// Entries that do not deserialize or carry a zero timestamp are dropped.
    /// Returns the number of entries kept.
    pub fn load(&mut self, persisted: &Value) -> usize {
        self.entries.clear();

        if let Some(map) = persisted.as_object() {
            for (path, value) in map {
                if path.is_empty() {
                    continue;
                }

                match serde_json::from_value::<CachedThemeEntry>(value.clone()) {
                    Ok(entry) if entry.timestamp > 0 => {
                        self.entries.insert(PathBuf::from(path), entry);
                    }
                    _ => tracing::debug!(path, "dropping malformed theme cache entry"),
                }
            }
        }

        self.last_timestamp = self.entries.values().map(|entry| entry.timestamp).max().unwrap_or(0);
        self.evict();
        self.dirty = false;
        self.entries.len()
    }

    /// Serializes the cache in its persisted form.
    #[must_use]
    pub fn snapshot(&self) -> Value {
        let map: Map<String, Value> = self
            .entries
            .iter()
            .filter_map(|(path, entry)| {
                serde_json::to_value(entry)
                    .ok()
                    .map(|value| (path.to_string_lossy().into_owned(), value))
            })
            .collect();

        Value::Object(map)
    }

    #[must_use]
    pub fn get(&self, path: &Path) -> Option<CachedThemeEntry> { self.entries.get(path).copied() }

    /// Inserts or overwrites the analysis for `path` and evicts the oldest
    /// entries beyond the bound.
    ///
    /// Returns `true` when the cache went from clean to dirty, i.e. when the
    /// caller has to schedule a flush.
    pub fn put(&mut self, path: &Path, analysis: ThemeAnalysis) -> bool {
        let timestamp = now_millis().max(self.last_timestamp + 1);
        self.last_timestamp = timestamp;
        self.entries.insert(path.to_path_buf(), CachedThemeEntry { analysis, timestamp });
        self.evict();

        self.mark_dirty()
    }

    /// Writes the cache to the settings store if it changed since the last flush.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings store failed to persist the cache. The
    /// cache stays dirty.
    pub fn flush(&mut self) -> Result<(), ConfigError> {
        if !self.dirty {
            return Ok(());
        }

        self.store.set(keys::THEME_CACHE, self.snapshot())?;
        self.dirty = false;
        tracing::debug!(entries = self.entries.len(), "theme cache flushed");
        Ok(())
    }

    /// Empties the cache and persists the empty map immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings store failed to persist the empty map.
    pub fn clear(&mut self) -> Result<(), ConfigError> {
        self.entries.clear();
        self.dirty = false;
        self.store.set(keys::THEME_CACHE, Value::Object(Map::new()))
    }

    /// Drops the in-memory entries without touching the settings store.
    pub fn clear_memory(&mut self) {
        self.entries.clear();
        self.dirty = false;
    }

    /// Changes the bound, evicting immediately when it shrinks.
    ///
    /// Returns `true` when eviction left the cache needing a flush it did not
    /// need before.
    pub fn set_max_size(&mut self, max_size: usize) -> bool {
        self.max_size = max_size;
        if self.evict() > 0 { self.mark_dirty() } else { false }
    }

    #[must_use]
    pub const fn max_size(&self) -> usize { self.max_size }

    #[must_use]
    pub fn len(&self) -> usize { self.entries.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    #[must_use]
    pub const fn is_dirty(&self) -> bool { self.dirty }

    fn mark_dirty(&mut self) -> bool { !std::mem::replace(&mut self.dirty, true) }

    /// Removes the oldest entries until the bound holds. Returns how many were removed.
    fn evict(&mut self) -> usize {
        let excess = self.entries.len().saturating_sub(self.max_size);
        if excess == 0 {
            return 0;
        }

        let mut by_age: Vec<(u64, PathBuf)> = self
            .entries
            .iter()
            .map(|(path, entry)| (entry.timestamp, path.clone()))
            .collect();
        by_age.sort_unstable();

        for (_, path) in by_age.into_iter().take(excess) {
            tracing::trace!(path = %path.display(), "evicting theme cache entry");
            self.entries.remove(&path);
        }

        excess
    }
}

impl std::fmt::Debug for ThemeCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThemeCache")
            .field("entries", &self.entries.len())
            .field("max_size", &self.max_size)
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::JsonConfigStore;
    use crate::wallpaper::types::{ThemeMode, ThemeScheme};

    fn cache(max_size: usize) -> (ThemeCache, Arc<JsonConfigStore>) {
        let store = Arc::new(JsonConfigStore::in_memory());
        (ThemeCache::new(store.clone(), max_size), store)
    }

    fn dark() -> ThemeAnalysis { ThemeAnalysis::classified(ThemeMode::Dark, ThemeScheme::Rainbow) }

    #[test]
    fn test_put_and_get() {
        let (mut cache, _) = cache(10);
        cache.put(Path::new("/w/a.png"), dark());

        let entry = cache.get(Path::new("/w/a.png")).unwrap();
        assert_eq!(entry.analysis, dark());
        assert!(entry.timestamp > 0);
        assert!(cache.get(Path::new("/w/b.png")).is_none());
    }

    #[test]
    fn test_timestamps_strictly_increase() {
        let (mut cache, _) = cache(10);
        cache.put(Path::new("/w/a.png"), dark());
        cache.put(Path::new("/w/b.png"), dark());
        cache.put(Path::new("/w/a.png"), dark());

        let a = cache.get(Path::new("/w/a.png")).unwrap().timestamp;
        let b = cache.get(Path::new("/w/b.png")).unwrap().timestamp;
        assert!(a > b);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_bound_evicts_oldest() {
        let (mut cache, _) = cache(3);
        for name in ["a", "b", "c", "d"] {
            cache.put(&PathBuf::from(format!("/w/{name}.png")), dark());
        }

        assert_eq!(cache.len(), 3);
        assert!(cache.get(Path::new("/w/a.png")).is_none());
        assert!(cache.get(Path::new("/w/d.png")).is_some());
    }

    #[test]
    fn test_overwrite_refreshes_age() {
        let (mut cache, _) = cache(2);
        cache.put(Path::new("/w/a.png"), dark());
        cache.put(Path::new("/w/b.png"), dark());
        cache.put(Path::new("/w/a.png"), dark());
        cache.put(Path::new("/w/c.png"), dark());

        assert!(cache.get(Path::new("/w/a.png")).is_some());
        assert!(cache.get(Path::new("/w/b.png")).is_none());
    }

    #[test]
    fn test_put_requests_single_flush_per_batch() {
        let (mut cache, store) = cache(10);
        assert!(cache.put(Path::new("/w/a.png"), dark()));
        assert!(!cache.put(Path::new("/w/b.png"), dark()));
        assert_eq!(store.get(keys::THEME_CACHE), Some(json!({})));

        cache.flush().unwrap();
        assert!(!cache.is_dirty());
        let persisted = store.get(keys::THEME_CACHE).unwrap();
        assert_eq!(persisted.as_object().unwrap().len(), 2);

        assert!(cache.put(Path::new("/w/c.png"), dark()));
    }

    #[test]
    fn test_snapshot_round_trip() {
        let (mut cache, _) = cache(10);
        let light = ThemeAnalysis::classified(ThemeMode::Light, ThemeScheme::Neutral);
        cache.put(Path::new("/w/a.png"), dark());
        cache.put(Path::new("/w/b.png"), light);

        let (mut fresh, _) = self::cache(10);
        assert_eq!(fresh.load(&cache.snapshot()), 2);

        for path in ["/w/a.png", "/w/b.png"] {
            assert_eq!(fresh.get(Path::new(path)), cache.get(Path::new(path)));
        }

        // Timestamps keep increasing after a load.
        fresh.put(Path::new("/w/c.png"), dark());
        let newest = fresh.get(Path::new("/w/c.png")).unwrap().timestamp;
        assert!(newest > fresh.get(Path::new("/w/b.png")).unwrap().timestamp);
    }

    #[test]
    fn test_load_drops_malformed_entries() {
        let (mut cache, _) = cache(10);
        let persisted = json!({
            "/w/good.png": { "tone": 20, "chroma": 40, "mode": "dark", "scheme": "scheme-rainbow", "timestamp": 5 },
            "/w/zero.png": { "tone": 20, "chroma": 40, "mode": "dark", "scheme": "scheme-rainbow", "timestamp": 0 },
            "/w/missing.png": { "tone": 20, "chroma": 40, "mode": "dark", "scheme": "scheme-rainbow" },
            "/w/badmode.png": { "tone": 20, "chroma": 40, "mode": "dim", "scheme": "scheme-rainbow", "timestamp": 3 },
            "/w/string.png": "dark",
        });

        assert_eq!(cache.load(&persisted), 1);
        assert!(cache.get(Path::new("/w/good.png")).is_some());
        assert_eq!(cache.load(&json!([1, 2])), 0);
    }

    #[test]
    fn test_clear_persists_empty_map() {
        let (mut cache, store) = cache(10);
        cache.put(Path::new("/w/a.png"), dark());
        cache.flush().unwrap();

        cache.clear().unwrap();
        assert!(cache.is_empty());
        assert_eq!(store.get(keys::THEME_CACHE), Some(json!({})));
    }

    #[test]
    fn test_shrinking_bound_evicts() {
        let (mut cache, _) = cache(5);
        for name in ["a", "b", "c", "d"] {
            cache.put(&PathBuf::from(format!("/w/{name}.png")), dark());
        }
        cache.flush().unwrap();

        assert!(cache.set_max_size(2));
        assert_eq!(cache.len(), 2);
        assert!(cache.get(Path::new("/w/d.png")).is_some());
        assert!(!cache.set_max_size(10));
    }

    #[test]
    fn test_load_from_store() {
        let (mut cache, store) = cache(10);
        store
            .set(
                keys::THEME_CACHE,
                json!({ "/w/a.png": { "tone": 80, "chroma": 10, "mode": "light", "scheme": "scheme-neutral", "timestamp": 9 } }),
            )
            .unwrap();

        assert_eq!(cache.load_from_store(), 1);
        assert_eq!(cache.get(Path::new("/w/a.png")).unwrap().analysis.mode, ThemeMode::Light);
    }
}
