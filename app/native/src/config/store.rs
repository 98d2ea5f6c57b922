//! Runtime settings store.
//!
//! Settings are the values that change while the shell runs (current
//! wallpaper, theme overrides, the analysis cache). They are read and written
//! through [`ConfigStore`]; [`JsonConfigStore`] keeps them in a JSON file.

use std::fs;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde_json::{Map, Value, json};

use super::types::{APP_DIR, ConfigError};
use crate::events::Subscription;

/// Settings keys.
pub mod keys {
    /// Directory scanned for wallpapers.
    pub const WALLPAPER_DIR: &str = "wallpaper.dir";
    /// Path of the applied wallpaper, or `""`.
    pub const CURRENT: &str = "wallpaper.current";
    /// Maximum number of cached theme analyses.
    pub const THEME_CACHE_SIZE: &str = "wallpaper.theme.cache-size";
    /// Persisted theme analysis cache.
    pub const THEME_CACHE: &str = "wallpaper.theme.cache";
    /// Manual mode override.
    pub const THEME_MODE: &str = "wallpaper.theme.mode";
    /// Manual scheme override.
    pub const THEME_SCHEME: &str = "wallpaper.theme.scheme";

    /// Every known key.
    pub const ALL: [&str; 6] =
        [WALLPAPER_DIR, CURRENT, THEME_CACHE_SIZE, THEME_CACHE, THEME_MODE, THEME_SCHEME];
}

/// Default theme cache bound.
pub const DEFAULT_CACHE_SIZE: u64 = 100;

/// File name of the settings file inside the application directory.
const SETTINGS_FILE_NAME: &str = "settings.json";

/// Returns the default value of a known key.
#[must_use]
pub fn default_value(key: &str) -> Option<Value> {
    let value = match key {
        keys::WALLPAPER_DIR => json!("~/Pictures/Wallpapers"),
        keys::CURRENT => json!(""),
        keys::THEME_CACHE_SIZE => json!(DEFAULT_CACHE_SIZE),
        keys::THEME_CACHE => json!({}),
        keys::THEME_MODE | keys::THEME_SCHEME => json!("auto"),
        _ => return None,
    };

    Some(value)
}

/// Returns `<config dir>/wallstore/settings.json`.
#[must_use]
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(SETTINGS_FILE_NAME))
}

/// Callback invoked with the new value of a subscribed key.
pub type ChangeCallback = Box<dyn Fn(&Value) + Send + Sync>;

/// Key/value settings with change notification.
pub trait ConfigStore: Send + Sync {
    /// Returns the value of `key`, falling back to its default.
    fn get(&self, key: &str) -> Option<Value>;

    /// Stores `value` under `key` and notifies subscribers if it changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the value could not be persisted.
    fn set(&self, key: &str, value: Value) -> Result<(), ConfigError>;

    /// Calls `callback` whenever the value of `key` changes.
    fn subscribe(&self, key: &str, callback: ChangeCallback) -> Subscription;

    /// Returns the string value of `key`, if it is a string.
    fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).and_then(|value| value.as_str().map(str::to_string))
    }

    /// Returns the unsigned integer value of `key`, if it is one.
    fn get_u64(&self, key: &str) -> Option<u64> { self.get(key).and_then(|value| value.as_u64()) }
}

struct Subscriber {
    id: u64,
    key: String,
    callback: Arc<dyn Fn(&Value) + Send + Sync>,
}

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    entries: Vec<Subscriber>,
}

/// Settings kept in a JSON object on disk.
///
/// Writes go to a temporary file that is renamed over the settings file.
/// Missing keys read as their defaults and are not written until set.
pub struct JsonConfigStore {
    path: Option<PathBuf>,
    values: Mutex<Map<String, Value>>,
    subscribers: Arc<Mutex<Subscribers>>,
}

impl JsonConfigStore {
    /// Opens the settings file at `path`; a missing file starts empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or is not a JSON object.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let values = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            if contents.trim().is_empty() {
                Map::new()
            } else {
                serde_json::from_str::<Map<String, Value>>(&contents)?
            }
        } else {
            Map::new()
        };

        tracing::debug!(path = %path.display(), keys = values.len(), "opened settings store");

        Ok(Self {
            path: Some(path),
            values: Mutex::new(values),
            subscribers: Arc::default(),
        })
    }

    /// A store that never touches the disk.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            path: None,
            values: Mutex::default(),
            subscribers: Arc::default(),
        }
    }

    /// Location of the settings file, if persisted.
    #[must_use]
    pub fn path(&self) -> Option<&Path> { self.path.as_deref() }

    fn persist(&self, values: &Map<String, Value>) -> Result<(), ConfigError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(values)?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    fn notify(&self, key: &str, value: &Value) {
        let callbacks: Vec<_> = self
            .subscribers
            .lock()
            .entries
            .iter()
            .filter(|subscriber| subscriber.key == key)
            .map(|subscriber| Arc::clone(&subscriber.callback))
            .collect();

        for callback in callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(value))).is_err() {
                tracing::error!(key, "settings subscriber panicked");
            }
        }
    }
}

impl ConfigStore for JsonConfigStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.lock().get(key).cloned().or_else(|| default_value(key))
    }

    fn set(&self, key: &str, value: Value) -> Result<(), ConfigError> {
        {
            let mut values = self.values.lock();
            let current = values.get(key).cloned().or_else(|| default_value(key));
            if current.as_ref() == Some(&value) {
                return Ok(());
            }

            let mut updated = values.clone();
            updated.insert(key.to_string(), value.clone());
            self.persist(&updated)?;
            *values = updated;
        }

        tracing::trace!(key, "setting changed");
        self.notify(key, &value);
        Ok(())
    }

    fn subscribe(&self, key: &str, callback: ChangeCallback) -> Subscription {
        let id = {
            let mut subscribers = self.subscribers.lock();
            let id = subscribers.next_id;
            subscribers.next_id += 1;
            subscribers.entries.push(Subscriber {
                id,
                key: key.to_string(),
                callback: Arc::from(callback),
            });
            id
        };

        let subscribers: Weak<Mutex<Subscribers>> = Arc::downgrade(&self.subscribers);
        Subscription::new(move || {
            if let Some(subscribers) = subscribers.upgrade() {
                subscribers.lock().entries.retain(|subscriber| subscriber.id != id);
            }
        })
    }
}

impl std::fmt::Debug for JsonConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonConfigStore").field("path", &self.path).finish_non_exhaustive()
    }
}
