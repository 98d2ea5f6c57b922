//! Configuration types for Wallstore.
//!
//! The configuration file supports JSONC format (JSON with comments).
//! Both single-line (`//`) and multi-line (`/* */`) comments are allowed.

use std::fs;
use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct WallstoreConfig {
    /// JSON Schema reference, accepted so editors can validate the file.
    #[serde(rename = "$schema", skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Wallpaper index and theming settings.
    pub wallpaper: WallpaperConfig,
}

/// Wallpaper index and theming settings.
///
/// The wallpaper directory, the current wallpaper and theme overrides live in
/// the settings store instead, since they change at runtime.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct WallpaperConfig {
    /// Include dot-prefixed files and directories when scanning.
    pub include_hidden: bool,

    /// How many directory levels below the wallpaper directory are scanned.
    pub scan_depth: usize,

    /// Maximum number of search results.
    pub max_results: usize,

    /// Delay in milliseconds before a wallpaper change is analyzed.
    /// Changes arriving within the delay replace the pending one.
    pub debounce_ms: u64,

    /// Theme tool executable. `~` is expanded and bare names are looked up
    /// on `PATH` and common user binary directories.
    pub tool: String,

    /// Show a desktop notification when a theme is applied.
    pub notifications: bool,

    /// Rescan automatically when the wallpaper directory changes.
    pub watch: bool,
}

impl Default for WallpaperConfig {
    fn default() -> Self {
        Self {
            include_hidden: false,
            scan_depth: 2,
            max_results: 12,
            debounce_ms: 100,
            tool: "chromash".to_string(),
            notifications: true,
            watch: false,
        }
    }
}

/// Errors that can occur while loading configuration or settings.
#[derive(Debug)]
pub enum ConfigError {
    /// No configuration file was found in any of the expected locations.
    NotFound,
    /// The configuration file exists but could not be read or written.
    IoError(std::io::Error),
    /// The configuration file contains invalid JSON.
    ParseError(serde_json::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(
                f,
                "No configuration file found. Expected at $XDG_CONFIG_HOME/wallstore/config.jsonc \
                or ~/.config/wallstore/config.jsonc"
            ),
            Self::IoError(err) => write!(f, "Failed to access configuration file: {err}"),
            Self::ParseError(err) => write!(f, "Failed to parse configuration file: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::IoError(err) => Some(err),
            Self::ParseError(err) => Some(err),
            Self::NotFound => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self { Self::IoError(err) }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self { Self::ParseError(err) }
}

/// Configuration file names to search for (in priority order).
const CONFIG_FILE_NAMES: &[&str] = &["config.jsonc", "config.json"];

/// Application directory name under the configuration roots.
pub const APP_DIR: &str = "wallstore";

/// Returns the possible configuration file paths in priority order.
///
/// The function checks the following locations (both `.jsonc` and `.json` variants):
/// 1. `$XDG_CONFIG_HOME/wallstore/` if `$XDG_CONFIG_HOME` is set
/// 2. `~/.config/wallstore/`
/// 3. The platform configuration directory
#[must_use]
pub fn config_paths() -> Vec<PathBuf> {
    let mut roots = Vec::new();

    if let Some(xdg_config) = std::env::var_os("XDG_CONFIG_HOME").filter(|dir| !dir.is_empty()) {
        roots.push(PathBuf::from(xdg_config));
    }

    if let Some(home) = dirs::home_dir() {
        roots.push(home.join(".config"));
    }

    if let Some(config_dir) = dirs::config_dir() {
        roots.push(config_dir);
    }

    let mut paths = Vec::new();
    for root in roots {
        for filename in CONFIG_FILE_NAMES {
            let path = root.join(APP_DIR).join(filename);
            // XDG_CONFIG_HOME is often ~/.config itself
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
    }

    paths
}

/// Loads the configuration from the first available config file.
///
/// # Errors
///
/// Returns `ConfigError::NotFound` if no configuration file exists in any of the expected locations.
/// Returns `ConfigError::IoError` if a configuration file exists but could not be read.
/// Returns `ConfigError::ParseError` if the configuration file contains invalid JSON.
pub fn load_config() -> Result<(WallstoreConfig, PathBuf), ConfigError> {
    for path in config_paths() {
        if path.exists() {
            return load_config_from_path(&path).map(|config| (config, path));
        }
    }

    Err(ConfigError::NotFound)
}

/// Loads the configuration from a specific file.
///
/// # Errors
///
/// Returns `ConfigError::NotFound` if the file does not exist, or the I/O and
/// parse errors of [`load_config`].
pub fn load_config_from_path(path: &Path) -> Result<WallstoreConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound);
    }

    let file = fs::File::open(path)?;
    // Strip comments from JSONC before parsing
    let reader = json_comments::StripComments::new(file);
    Ok(serde_json::from_reader(reader)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_wallpaper_config() {
        let config = WallpaperConfig::default();
        assert!(!config.include_hidden);
        assert_eq!(config.scan_depth, 2);
        assert_eq!(config.max_results, 12);
        assert_eq!(config.debounce_ms, 100);
        assert_eq!(config.tool, "chromash");
        assert!(config.notifications);
        assert!(!config.watch);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let json = r#"{ "wallpaper": { "debounceMs": 250, "includeHidden": true } }"#;
        let config: WallstoreConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.wallpaper.debounce_ms, 250);
        assert!(config.wallpaper.include_hidden);
        assert_eq!(config.wallpaper.max_results, 12);
    }

    #[test]
    fn test_load_config_strips_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.jsonc");
        fs::write(
            &path,
            r#"{
                // line comment
                "wallpaper": {
                    /* block comment */
                    "tool": "~/bin/chromash",
                    "scanDepth": 0
                }
            }"#,
        )
        .unwrap();

        let config = load_config_from_path(&path).unwrap();
        assert_eq!(config.wallpaper.tool, "~/bin/chromash");
        assert_eq!(config.wallpaper.scan_depth, 0);
    }

    #[test]
    fn test_load_config_from_missing_path() {
        let result = load_config_from_path(Path::new("/nonexistent/wallstore/config.jsonc"));
        assert!(matches!(result, Err(ConfigError::NotFound)));
    }

    #[test]
    fn test_load_config_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let err = load_config_from_path(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn test_config_paths_end_with_config_files() {
        for path in config_paths() {
            assert!(path.parent().unwrap().ends_with(APP_DIR));
            let name = path.file_name().unwrap().to_string_lossy();
            assert!(name == "config.jsonc" || name == "config.json");
        }
    }

    #[test]
    fn test_config_error_not_found_display() {
        assert!(ConfigError::NotFound.to_string().contains("No configuration file found"));
    }
}
