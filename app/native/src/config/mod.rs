//! Configuration module for Wallstore.
//!
//! Two layers of configuration exist:
//!
//! - the static configuration file ([`WallstoreConfig`]), JSONC, read once at startup
//! - runtime settings ([`ConfigStore`]), read and written while the store runs
//!
//! The configuration file supports JSONC format (JSON with comments).
//! Both single-line (`//`) and multi-line (`/* */`) comments are allowed.

pub mod store;
pub mod types;

use std::path::{Path, PathBuf};

pub use store::{
    ChangeCallback, ConfigStore, DEFAULT_CACHE_SIZE, JsonConfigStore, default_settings_path,
    default_value, keys,
};
pub use types::{
    ConfigError, WallpaperConfig, WallstoreConfig, config_paths, load_config, load_config_from_path,
};

/// Loads the configuration, falling back to defaults.
///
/// `custom_path` (the `--config` flag) replaces the default search paths.
/// A missing file yields defaults silently; unreadable or invalid files are
/// logged and also yield defaults. Returns the path actually loaded, if any.
#[must_use]
pub fn load_or_default(custom_path: Option<&Path>) -> (WallstoreConfig, Option<PathBuf>) {
    let result = custom_path.map_or_else(load_config, |path| {
        load_config_from_path(path).map(|config| (config, path.to_path_buf()))
    });

    match result {
        Ok((config, path)) => {
            tracing::debug!(path = %path.display(), "loaded configuration");
            (config, Some(path))
        }
        Err(ConfigError::NotFound) => {
            if let Some(path) = custom_path {
                tracing::warn!(path = %path.display(), "configuration file not found, using defaults");
            }
            (WallstoreConfig::default(), None)
        }
        Err(err) => {
            tracing::warn!(error = %err, "failed to load configuration, using defaults");
            (WallstoreConfig::default(), None)
        }
    }
}
