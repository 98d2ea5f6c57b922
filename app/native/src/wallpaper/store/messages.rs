//! Message types for the wallpaper store actor.
//!
//! All communication with the store actor happens through messages:
//! - `StoreMessage` - commands, task results and internal notifications
//! - `StoreQuery` - requests for state data (with response channel)
//! - `QueryResult` - responses from queries

use std::path::PathBuf;

use serde_json::Value;
use tokio::sync::oneshot;

use crate::wallpaper::pipeline::PipelineEvent;
use crate::wallpaper::tool::ToolError;
use crate::wallpaper::types::{
    CachedThemeEntry, ModeOverride, OverrideState, SchemeOverride, WallpaperEntry,
};

/// Acknowledgement channel for commands whose callers wait for completion.
pub type Ack = Option<oneshot::Sender<()>>;

// ============================================================================
// Store Messages
// ============================================================================

/// Messages sent to the store actor.
#[derive(Debug)]
pub enum StoreMessage {
    // ════════════════════════════════════════════════════════════════════════
    // Commands
    // ════════════════════════════════════════════════════════════════════════
    /// Apply a wallpaper. Acknowledged once the apply tool has finished.
    SetWallpaper { entry: WallpaperEntry, respond_to: Ack },

    /// Apply a random wallpaper other than the current one.
    SetRandomWallpaper { respond_to: Ack },

    /// Rescan the wallpaper directory. Acknowledged once the latest scan is published.
    Refresh { respond_to: Ack },

    /// Change the manual mode override.
    SetManualMode { mode: ModeOverride, respond_to: Ack },

    /// Change the manual scheme override.
    SetManualScheme { scheme: SchemeOverride, respond_to: Ack },

    /// Empty the theme cache.
    ClearThemeCache { respond_to: Ack },

    /// Release all resources and stop the actor.
    Dispose { respond_to: Ack },

    /// Read state.
    Query {
        query: StoreQuery,
        respond_to: oneshot::Sender<QueryResult>,
    },

    // ════════════════════════════════════════════════════════════════════════
    // Task results
    // ════════════════════════════════════════════════════════════════════════
    /// The apply tool finished for `path`, invoked with `overrides`.
    ApplyFinished {
        path: PathBuf,
        overrides: OverrideState,
        result: Result<(), ToolError>,
        respond_to: Ack,
    },

    /// A directory scan finished.
    ScanFinished { generation: u64, entries: Vec<WallpaperEntry> },

    /// Timer or tool result from the analysis pipeline.
    Pipeline(PipelineEvent),

    // ════════════════════════════════════════════════════════════════════════
    // Internal notifications
    // ════════════════════════════════════════════════════════════════════════
    /// Persist pending theme cache changes.
    FlushThemeCache,

    /// The `wallpaper.dir` setting changed.
    DirectoryChanged,

    /// The `wallpaper.theme.cache-size` setting changed.
    CacheSizeChanged(Value),

    /// The directory watcher saw changes in the wallpaper directory.
    DirectoryContentsChanged,
}

impl StoreMessage {
    /// Message name, for logging.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SetWallpaper { .. } => "SetWallpaper",
            Self::SetRandomWallpaper { .. } => "SetRandomWallpaper",
            Self::Refresh { .. } => "Refresh",
            Self::SetManualMode { .. } => "SetManualMode",
            Self::SetManualScheme { .. } => "SetManualScheme",
            Self::ClearThemeCache { .. } => "ClearThemeCache",
            Self::Dispose { .. } => "Dispose",
            Self::Query { .. } => "Query",
            Self::ApplyFinished { .. } => "ApplyFinished",
            Self::ScanFinished { .. } => "ScanFinished",
            Self::Pipeline(PipelineEvent::DebounceElapsed { .. }) => "Pipeline::DebounceElapsed",
            Self::Pipeline(PipelineEvent::Queried { .. }) => "Pipeline::Queried",
            Self::FlushThemeCache => "FlushThemeCache",
            Self::DirectoryChanged => "DirectoryChanged",
            Self::CacheSizeChanged(_) => "CacheSizeChanged",
            Self::DirectoryContentsChanged => "DirectoryContentsChanged",
        }
    }
}

// ============================================================================
// Queries
// ============================================================================

/// Queries for reading store state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreQuery {
    /// Fuzzy search; `None` uses the configured result limit.
    Search { query: String, limit: Option<usize> },
    /// All indexed entries.
    Entries,
    /// The applied wallpaper.
    CurrentWallpaper,
    /// The manual overrides.
    Overrides,
    /// The cached analysis for a path.
    CachedTheme { path: PathBuf },
}

/// Results from store queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryResult {
    Entries(Vec<WallpaperEntry>),
    CurrentWallpaper(Option<PathBuf>),
    Overrides(OverrideState),
    CachedTheme(Option<CachedThemeEntry>),
}

impl QueryResult {
    /// Try to get entries from the result.
    #[must_use]
    pub fn into_entries(self) -> Option<Vec<WallpaperEntry>> {
        match self {
            Self::Entries(entries) => Some(entries),
            _ => None,
        }
    }

    /// Try to get the current wallpaper from the result.
    #[must_use]
    pub fn into_current_wallpaper(self) -> Option<Option<PathBuf>> {
        match self {
            Self::CurrentWallpaper(path) => Some(path),
            _ => None,
        }
    }

    /// Try to get the overrides from the result.
    #[must_use]
    pub const fn as_overrides(&self) -> Option<OverrideState> {
        match self {
            Self::Overrides(overrides) => Some(*overrides),
            _ => None,
        }
    }

    /// Try to get a cached analysis from the result.
    #[must_use]
    pub const fn as_cached_theme(&self) -> Option<Option<CachedThemeEntry>> {
        match self {
            Self::CachedTheme(entry) => Some(*entry),
            _ => None,
        }
    }

    /// Variant name, for error messages.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Entries(_) => "Entries",
            Self::CurrentWallpaper(_) => "CurrentWallpaper",
            Self::Overrides(_) => "Overrides",
            Self::CachedTheme(_) => "CachedTheme",
        }
    }
}
