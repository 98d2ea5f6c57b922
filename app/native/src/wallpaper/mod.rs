//! Wallpaper and theme management.
//!
//! - [`index`] - directory scanning and fuzzy search
//! - [`cache`] - bounded, persisted cache of theme analyses
//! - [`analysis`] - theme tool output parsing and the filename/clock fallback
//! - [`pipeline`] - debounced analysis with stale-result protection
//! - [`store`] - the actor tying everything together
//! - [`tool`], [`notifier`] - external theme tool and desktop notifications
//! - [`watcher`] - wallpaper directory watching

pub mod analysis;
pub mod cache;
pub mod index;
pub mod notifier;
pub mod pipeline;
pub mod store;
pub mod tool;
pub mod types;
pub mod watcher;

pub use notifier::{DesktopNotifier, NotificationSink, NullNotifier};
pub use store::{ActorError, StoreOptions, WallpaperStore, WallpaperStoreHandle};
pub use tool::{Chromash, ThemeTool, ToolError};
pub use types::{
    CachedThemeEntry, ModeOverride, OverrideState, SchemeOverride, ThemeAnalysis, ThemeMode,
    ThemeScheme, WallpaperEntry,
};
