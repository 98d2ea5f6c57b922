//! Wallpaper store actor.
//!
//! The store actor owns the wallpaper index, the theme cache, the analysis
//! pipeline and the selection state, and processes messages sequentially.
//! Anything that may block (tool invocations, directory scans) runs in a
//! spawned task and reports back as a message, so a hung tool never stalls
//! the store.
//!
//! Spawned tasks, settings subscriptions and the directory watcher only hold
//! a weak sender: once every [`WallpaperStoreHandle`] is dropped the actor
//! stops.
//!
//! # Panic Recovery
//!
//! If a message handler panics the panic is caught and logged and the actor
//! continues with the next message. State may be partially inconsistent but
//! the store stays responsive.

mod handle;
mod messages;

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub use handle::{ActorError, WallpaperStoreHandle};
pub use messages::{QueryResult, StoreMessage, StoreQuery};
use messages::Ack;
use rand::Rng;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};

use super::cache::ThemeCache;
use super::index::{self, WallpaperIndex};
use super::notifier::NotificationSink;
use super::pipeline::{AnalysisPipeline, DEFAULT_DEBOUNCE, PipelineEvent, PipelineSink};
use super::tool::{ThemeTool, ToolError};
use super::types::{ModeOverride, OverrideState, SchemeOverride, WallpaperEntry};
use super::watcher::{DirectoryWatcher, WATCH_DEBOUNCE};
use crate::config::{ConfigStore, DEFAULT_CACHE_SIZE, WallpaperConfig, keys};
use crate::events::{EventBus, StoreEvent, Subscription};
use crate::platform;

/// Channel buffer size for the store actor.
const CHANNEL_BUFFER_SIZE: usize = 256;

/// Behavior settings of a store instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    /// Directory levels scanned below the wallpaper directory.
    pub scan_depth: usize,
    /// Include dot-prefixed files and directories.
    pub include_hidden: bool,
    /// Result limit for [`WallpaperStoreHandle::search`].
    pub max_results: usize,
    /// Delay before a wallpaper change is analyzed.
    pub debounce: Duration,
    /// Watch the wallpaper directory and rescan on changes.
    pub watch: bool,
}

impl Default for StoreOptions {
    fn default() -> Self { Self::from(&WallpaperConfig::default()) }
}

impl From<&WallpaperConfig> for StoreOptions {
    fn from(config: &WallpaperConfig) -> Self {
        Self {
            scan_depth: config.scan_depth,
            include_hidden: config.include_hidden,
            max_results: config.max_results,
            debounce: Duration::from_millis(config.debounce_ms),
            watch: config.watch,
        }
    }
}

/// Sends `msg` without waiting.
///
/// Falls back to an async send when the channel is full and a runtime is
/// available. Returns `false` if the store has stopped or the message was dropped.
fn deliver(weak: &mpsc::WeakSender<StoreMessage>, msg: StoreMessage) -> bool {
    let Some(sender) = weak.upgrade() else {
        return false;
    };

    match sender.try_send(msg) {
        Ok(()) => true,
        Err(TrySendError::Full(msg)) => {
            if let Ok(runtime) = tokio::runtime::Handle::try_current() {
                runtime.spawn(async move {
                    let _ = sender.send(msg).await;
                });
                true
            } else {
                tracing::warn!(message = msg.name(), "store busy, dropping message");
                false
            }
        }
        Err(TrySendError::Closed(_)) => false,
    }
}

async fn deliver_async(weak: &mpsc::WeakSender<StoreMessage>, msg: StoreMessage) {
    if let Some(sender) = weak.upgrade() {
        let _ = sender.send(msg).await;
    }
}

fn ack(respond_to: Ack) {
    if let Some(tx) = respond_to {
        let _ = tx.send(());
    }
}

/// The wallpaper store actor.
pub struct WallpaperStore {
    options: StoreOptions,
    receiver: mpsc::Receiver<StoreMessage>,
    weak: mpsc::WeakSender<StoreMessage>,
    config: Arc<dyn ConfigStore>,
    tool: Arc<dyn ThemeTool>,
    events: EventBus,
    index: WallpaperIndex,
    cache: ThemeCache,
    pipeline: AnalysisPipeline,
    /// Selected wallpaper; may still be waiting for its apply to finish.
    current: Option<PathBuf>,
    /// Last wallpaper the apply tool accepted. Failed applies roll back here.
    confirmed: Option<PathBuf>,
    overrides: OverrideState,
    scan_generation: u64,
    scan_waiters: Vec<oneshot::Sender<()>>,
    config_subscriptions: Vec<Subscription>,
    watcher: Option<DirectoryWatcher>,
}

impl WallpaperStore {
    /// Spawn a new store actor and return a handle for communication.
    ///
    /// The store restores the current wallpaper, overrides and theme cache
    /// from `config` and starts an initial directory scan.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    #[must_use]
    pub fn spawn(
        options: StoreOptions,
        config: Arc<dyn ConfigStore>,
        tool: Arc<dyn ThemeTool>,
        notifier: Arc<dyn NotificationSink>,
    ) -> WallpaperStoreHandle {
        let (sender, receiver) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let weak = sender.downgrade();
        let events = EventBus::new();

        let sink: PipelineSink = {
            let weak = weak.clone();
            Arc::new(move |event: PipelineEvent| {
                deliver(&weak, StoreMessage::Pipeline(event));
            })
        };
        let debounce = if options.debounce.is_zero() { DEFAULT_DEBOUNCE } else { options.debounce };
        let pipeline = AnalysisPipeline::new(debounce, Arc::clone(&tool), notifier, sink);

        let cache_size = config
            .get_u64(keys::THEME_CACHE_SIZE)
            .and_then(|size| usize::try_from(size).ok())
            .unwrap_or(DEFAULT_CACHE_SIZE as usize);
        let mut cache = ThemeCache::new(Arc::clone(&config), cache_size);
        let cached = cache.load_from_store();

        let current = config
            .get_string(keys::CURRENT)
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);
        let overrides = load_overrides(config.as_ref());

        let config_subscriptions = subscribe_settings(config.as_ref(), &weak);

        tracing::debug!(
            current = ?current,
            cached,
            mode = %overrides.mode,
            scheme = %overrides.scheme,
            "spawning wallpaper store"
        );

        let actor = Self {
            options,
            receiver,
            weak,
            config,
            tool,
            events: events.clone(),
            index: WallpaperIndex::default(),
            cache,
            pipeline,
            confirmed: current.clone(),
            current,
            overrides,
            scan_generation: 0,
            scan_waiters: Vec::new(),
            config_subscriptions,
            watcher: None,
        };

        tokio::spawn(actor.run());

        WallpaperStoreHandle::new(sender, events)
    }

    /// Run the actor's message loop.
    async fn run(mut self) {
        self.start_watcher();
        self.start_scan(None);

        while let Some(msg) = self.receiver.recv().await {
            if let StoreMessage::Dispose { respond_to } = msg {
                self.dispose();
                ack(respond_to);
                return;
            }

            let msg_name = msg.name();
            let result = catch_unwind(AssertUnwindSafe(|| {
                self.handle_message(msg);
            }));

            if let Err(panic_info) = result {
                let panic_msg = panic_info
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic_info.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());

                tracing::error!(message = msg_name, panic = %panic_msg, "store actor recovered from panic");
            }
        }

        tracing::debug!("store channel closed, exiting");
        self.dispose();
    }

    /// Handle a single message.
    fn handle_message(&mut self, msg: StoreMessage) {
        match msg {
            // Commands
            StoreMessage::SetWallpaper { entry, respond_to } => self.on_set_wallpaper(entry, respond_to),
            StoreMessage::SetRandomWallpaper { respond_to } => self.on_set_random_wallpaper(respond_to),
            StoreMessage::Refresh { respond_to } => self.start_scan(respond_to),
            StoreMessage::SetManualMode { mode, respond_to } => {
                self.on_set_overrides(OverrideState { mode, ..self.overrides });
                ack(respond_to);
            }
            StoreMessage::SetManualScheme { scheme, respond_to } => {
                self.on_set_overrides(OverrideState { scheme, ..self.overrides });
                ack(respond_to);
            }
            StoreMessage::ClearThemeCache { respond_to } => {
                self.on_clear_theme_cache();
                ack(respond_to);
            }
            StoreMessage::Dispose { respond_to } => {
                self.dispose();
                ack(respond_to);
            }
            StoreMessage::Query { query, respond_to } => {
                let _ = respond_to.send(self.on_query(query));
            }

            // Task results
            StoreMessage::ApplyFinished { path, overrides, result, respond_to } => {
                self.on_apply_finished(path, overrides, result);
                ack(respond_to);
            }
            StoreMessage::ScanFinished { generation, entries } => {
                self.on_scan_finished(generation, entries);
            }
            StoreMessage::Pipeline(PipelineEvent::DebounceElapsed { ticket }) => {
                self.pipeline.on_debounce_elapsed(ticket);
            }
            StoreMessage::Pipeline(PipelineEvent::Queried { ticket, path, apply_error, output }) => {
                self.on_queried(ticket, &path, apply_error, output);
            }

            // Internal notifications
            StoreMessage::FlushThemeCache => self.on_flush_theme_cache(),
            StoreMessage::DirectoryChanged => {
                tracing::info!(path = %self.root().display(), "wallpaper directory setting changed");
                self.start_watcher();
                self.start_scan(None);
            }
            StoreMessage::CacheSizeChanged(value) => self.on_cache_size_changed(&value),
            StoreMessage::DirectoryContentsChanged => self.start_scan(None),
        }
    }

    // ========================================================================
    // Selection
    // ========================================================================

    fn on_set_wallpaper(&mut self, entry: WallpaperEntry, respond_to: Ack) {
        let Some(path) = entry.path.clone() else {
            self.emit_error(format!("Wallpaper '{}' has no file", entry.display_name));
            ack(respond_to);
            return;
        };

        if self.current.as_deref() == Some(path.as_path()) {
            tracing::debug!(path = %path.display(), "wallpaper already applied");
            ack(respond_to);
            return;
        }

        if !path.is_file() {
            self.emit_error(format!("Wallpaper not found: {}", path.display()));
            ack(respond_to);
            return;
        }

        self.current = Some(path.clone());
        self.persist_current();

        tracing::info!(path = %path.display(), "setting wallpaper");
        let overrides = self.overrides;
        let apply = self.tool.apply_wallpaper(&path, overrides);
        let weak = self.weak.clone();
        tokio::spawn(async move {
            let result = apply.await;
            let msg = StoreMessage::ApplyFinished { path, overrides, result, respond_to };
            deliver_async(&weak, msg).await;
        });
    }

    fn on_apply_finished(
        &mut self,
        path: PathBuf,
        overrides: OverrideState,
        result: Result<(), ToolError>,
    ) {
        let is_current = self.current.as_deref() == Some(path.as_path());

        match result {
            Ok(()) if is_current => {
                self.confirmed = Some(path.clone());
                if overrides == self.overrides {
                    self.pipeline.schedule(&path);
                } else {
                    // Overrides changed while the apply was running.
                    self.pipeline.run_now(&path, self.overrides);
                }
                self.events.emit(&StoreEvent::WallpaperSet { path });
            }
            Ok(()) => {
                tracing::debug!(path = %path.display(), "wallpaper superseded before apply finished");
            }
            Err(err) => {
                if is_current {
                    self.roll_back();
                }
                self.emit_error(format!("Failed to apply wallpaper {}: {err}", path.display()));
            }
        }
    }

    /// Restores the last confirmed wallpaper after a failed apply.
    fn roll_back(&mut self) {
        self.current.clone_from(&self.confirmed);
        self.persist_current();

        let Some(path) = self.confirmed.clone() else {
            return;
        };
        tracing::info!(path = %path.display(), "rolled back to previous wallpaper");

        // Its analysis may have been discarded while the failed apply was pending.
        if self.cache.get(&path).is_none() {
            self.pipeline.schedule(&path);
        }
    }

    fn on_set_random_wallpaper(&mut self, respond_to: Ack) {
        let entries = self.index.entries();
        let others: Vec<&WallpaperEntry> =
            entries.iter().filter(|entry| entry.path() != self.current.as_deref()).collect();
        let pool: Vec<&WallpaperEntry> =
            if others.is_empty() { entries.iter().collect() } else { others };

        if pool.is_empty() {
            self.emit_error("No wallpapers available");
            ack(respond_to);
            return;
        }

        let choice = pool[rand::rng().random_range(0..pool.len())].clone();
        self.on_set_wallpaper(choice, respond_to);
    }

    fn persist_current(&self) {
        let value = self
            .current
            .as_ref()
            .map_or_else(String::new, |path| path.to_string_lossy().into_owned());

        if let Err(err) = self.config.set(keys::CURRENT, Value::String(value)) {
            tracing::warn!(error = %err, "failed to persist current wallpaper");
        }
    }

    // ========================================================================
    // Index
    // ========================================================================

    fn root(&self) -> PathBuf {
        platform::expand(&self.config.get_string(keys::WALLPAPER_DIR).unwrap_or_default())
    }

    fn start_scan(&mut self, respond_to: Ack) {
        self.scan_generation += 1;
        self.scan_waiters.extend(respond_to);

        let generation = self.scan_generation;
        let root = self.root();
        let depth = self.options.scan_depth;
        let hidden = self.options.include_hidden;
        let weak = self.weak.clone();

        tracing::debug!(path = %root.display(), generation, "scanning wallpaper directory");
        tokio::spawn(async move {
            match tokio::task::spawn_blocking(move || index::scan(&root, depth, hidden)).await {
                Ok(entries) => {
                    deliver_async(&weak, StoreMessage::ScanFinished { generation, entries }).await;
                }
                Err(err) => tracing::error!(error = %err, "wallpaper scan failed"),
            }
        });
    }

    fn on_scan_finished(&mut self, generation: u64, entries: Vec<WallpaperEntry>) {
        if generation != self.scan_generation {
            tracing::debug!(generation, latest = self.scan_generation, "discarding stale scan");
            return;
        }

        tracing::info!(count = entries.len(), "wallpapers indexed");
        self.index.replace(entries.clone());
        self.events.emit(&StoreEvent::WallpapersChanged { entries });

        for waiter in self.scan_waiters.drain(..) {
            let _ = waiter.send(());
        }
    }

    fn start_watcher(&mut self) {
        if !self.options.watch {
            self.watcher = None;
            return;
        }

        let root = self.root();
        if self.watcher.as_ref().is_some_and(|watcher| watcher.root() == root) {
            return;
        }

        self.watcher = None;
        let weak = self.weak.clone();
        match DirectoryWatcher::start(&root, WATCH_DEBOUNCE, move || {
            deliver(&weak, StoreMessage::DirectoryContentsChanged);
        }) {
            Ok(watcher) => self.watcher = Some(watcher),
            Err(err) => {
                tracing::warn!(path = %root.display(), error = %err, "cannot watch wallpaper directory");
            }
        }
    }

    // ========================================================================
    // Theme
    // ========================================================================

    fn on_set_overrides(&mut self, overrides: OverrideState) {
        if overrides == self.overrides {
            return;
        }

        if overrides.mode != self.overrides.mode {
            self.persist(keys::THEME_MODE, overrides.mode);
        }
        if overrides.scheme != self.overrides.scheme {
            self.persist(keys::THEME_SCHEME, overrides.scheme);
        }
        self.overrides = overrides;

        tracing::info!(mode = %overrides.mode, scheme = %overrides.scheme, "theme overrides changed");
        self.events.emit(&StoreEvent::ThemeSettingsChanged { overrides });

        // A pending apply picks the new overrides up once it finishes.
        match self.confirmed.clone() {
            Some(path) if self.current.as_ref() == Some(&path) => {
                self.pipeline.run_now(&path, overrides);
            }
            Some(_) => tracing::debug!("wallpaper apply pending, deferring theme update"),
            None => {}
        }
    }

    fn on_queried(
        &mut self,
        ticket: u64,
        path: &Path,
        apply_error: Option<ToolError>,
        output: Result<String, ToolError>,
    ) {
        if self.current.as_deref() != Some(path) {
            tracing::debug!(path = %path.display(), "discarding analysis of replaced wallpaper");
            return;
        }

        let Some(outcome) =
            self.pipeline.on_queried(ticket, path, apply_error, output, &mut self.cache, self.overrides)
        else {
            return;
        };

        if outcome.flush_needed {
            self.queue_flush();
        }

        for message in outcome.errors {
            self.emit_error(message);
        }

        self.events.emit(&StoreEvent::ThemeApplied {
            path: outcome.path,
            analysis: outcome.effective,
        });
    }

    fn on_clear_theme_cache(&mut self) {
        match self.cache.clear() {
            Ok(()) => tracing::info!("theme cache cleared"),
            Err(err) => self.emit_error(format!("Failed to clear theme cache: {err}")),
        }
    }

    fn on_cache_size_changed(&mut self, value: &Value) {
        let Some(size) = value.as_u64().and_then(|size| usize::try_from(size).ok()) else {
            tracing::warn!(%value, "ignoring invalid theme cache size");
            return;
        };

        tracing::debug!(size, "theme cache size changed");
        if self.cache.set_max_size(size) {
            self.queue_flush();
        }
    }

    /// Enqueues a single flush behind the messages already queued.
    fn queue_flush(&mut self) {
        if !deliver(&self.weak, StoreMessage::FlushThemeCache) {
            self.on_flush_theme_cache();
        }
    }

    fn on_flush_theme_cache(&mut self) {
        if let Err(err) = self.cache.flush() {
            self.emit_error(format!("Failed to save theme cache: {err}"));
        }
    }

    // ========================================================================
    // Queries and helpers
    // ========================================================================

    fn on_query(&self, query: StoreQuery) -> QueryResult {
        match query {
            StoreQuery::Search { query, limit } => {
                let limit = limit.unwrap_or(self.options.max_results);
                QueryResult::Entries(self.index.search(&query, limit))
            }
            StoreQuery::Entries => QueryResult::Entries(self.index.entries().to_vec()),
            StoreQuery::CurrentWallpaper => QueryResult::CurrentWallpaper(self.current.clone()),
            StoreQuery::Overrides => QueryResult::Overrides(self.overrides),
            StoreQuery::CachedTheme { path } => QueryResult::CachedTheme(self.cache.get(&path)),
        }
    }

    fn persist(&self, key: &str, value: impl Serialize) {
        let result = serde_json::to_value(value)
            .map_err(crate::config::ConfigError::from)
            .and_then(|value| self.config.set(key, value));

        if let Err(err) = result {
            tracing::warn!(key, error = %err, "failed to persist setting");
        }
    }

    fn emit_error(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(error = %message, "wallpaper store error");
        self.events.emit(&StoreEvent::error(message));
    }

    /// Releases timers, subscriptions and the watcher, then drops the in-memory cache.
    fn dispose(&mut self) {
        self.pipeline.dispose();
        for subscription in self.config_subscriptions.drain(..) {
            subscription.unsubscribe();
        }
        self.watcher = None;

        if let Err(err) = self.cache.flush() {
            tracing::warn!(error = %err, "failed to save theme cache on dispose");
        }
        self.cache.clear_memory();
        self.events.clear();
        self.scan_waiters.clear();

        tracing::debug!("wallpaper store disposed");
    }
}

/// Reads the persisted overrides, treating unknown values as `auto`.
fn load_overrides(config: &dyn ConfigStore) -> OverrideState {
    let mode = config.get_string(keys::THEME_MODE).map_or(Ok(ModeOverride::Auto), |s| s.parse());
    let scheme =
        config.get_string(keys::THEME_SCHEME).map_or(Ok(SchemeOverride::Auto), |s| s.parse());

    OverrideState {
        mode: mode.unwrap_or_else(|err| {
            tracing::warn!(%err, "invalid persisted mode override");
            ModeOverride::Auto
        }),
        scheme: scheme.unwrap_or_else(|err| {
            tracing::warn!(%err, "invalid persisted scheme override");
            SchemeOverride::Auto
        }),
    }
}

/// Forwards changes of the settings the store reacts to.
fn subscribe_settings(
    config: &dyn ConfigStore,
    weak: &mpsc::WeakSender<StoreMessage>,
) -> Vec<Subscription> {
    let dir_weak = weak.clone();
    let size_weak = weak.clone();

    vec![
        config.subscribe(
            keys::WALLPAPER_DIR,
            Box::new(move |_| {
                deliver(&dir_weak, StoreMessage::DirectoryChanged);
            }),
        ),
        config.subscribe(
            keys::THEME_CACHE_SIZE,
            Box::new(move |value| {
                deliver(&size_weak, StoreMessage::CacheSizeChanged(value.clone()));
            }),
        ),
    ]
}
