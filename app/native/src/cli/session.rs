//! Store lifecycle for one CLI invocation.
//!
//! Each command spawns its own store on top of the persisted settings, runs,
//! and disposes the store so pending theme cache changes reach disk.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::config::{self, ConfigStore, JsonConfigStore, WallstoreConfig};
use crate::error::WallstoreError;
use crate::events::{StoreEvent, Subscription};
use crate::wallpaper::{
    Chromash, DesktopNotifier, NotificationSink, NullNotifier, StoreOptions, ThemeAnalysis,
    WallpaperStore, WallpaperStoreHandle,
};

/// How long `set` and `theme` wait for the analysis to finish.
pub const THEME_TIMEOUT: Duration = Duration::from_secs(30);

/// A running store plus the configuration it was built from.
pub struct Session {
    pub config: WallstoreConfig,
    pub handle: WallpaperStoreHandle,
}

impl Session {
    /// Loads configuration and settings and spawns the store.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings file exists but cannot be read or parsed.
    pub fn open(config_path: Option<&Path>, watch: bool) -> Result<Self, WallstoreError> {
        let (config, _) = config::load_or_default(config_path);

        let settings: Arc<dyn ConfigStore> = match config::default_settings_path() {
            Some(path) => Arc::new(JsonConfigStore::open(path)?),
            None => {
                tracing::warn!("no configuration directory, settings will not be saved");
                Arc::new(JsonConfigStore::in_memory())
            }
        };

        let notifier: Arc<dyn NotificationSink> =
            match config.wallpaper.notifications.then(DesktopNotifier::locate) {
                Some(desktop) if desktop.is_available() => Arc::new(desktop),
                _ => Arc::new(NullNotifier),
            };

        let mut options = StoreOptions::from(&config.wallpaper);
        options.watch = watch;

        let tool = Arc::new(Chromash::locate(&config.wallpaper.tool));
        let handle = WallpaperStore::spawn(options, settings, tool, notifier);

        Ok(Self { config, handle })
    }

    /// Waits for the index to reflect the wallpaper directory.
    pub async fn indexed(&self) { self.handle.refresh().await; }

    /// Disposes the store, flushing the theme cache.
    pub async fn close(self) { self.handle.dispose().await; }
}

/// Buffered store events, collected from the moment of subscription.
pub struct EventStream {
    receiver: mpsc::UnboundedReceiver<StoreEvent>,
    backlog: VecDeque<StoreEvent>,
    subscription: Option<Subscription>,
}

impl EventStream {
    #[must_use]
    pub fn subscribe(handle: &WallpaperStoreHandle) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let subscription = handle.subscribe_all(move |event| {
            let _ = sender.send(event.clone());
        });

        Self { receiver, backlog: VecDeque::new(), subscription: Some(subscription) }
    }

    /// Removes and returns the error messages received so far.
    pub fn take_errors(&mut self) -> Vec<String> {
        while let Ok(event) = self.receiver.try_recv() {
            self.backlog.push_back(event);
        }

        let mut errors = Vec::new();
        self.backlog.retain(|event| match event {
            StoreEvent::Error { message } => {
                errors.push(message.clone());
                false
            }
            _ => true,
        });
        errors
    }

    /// Waits for the theme of `path` to be applied, printing errors as warnings.
    ///
    /// # Errors
    ///
    /// Returns an error if the store stops or nothing arrives within `timeout`.
    pub async fn wait_for_theme(
        &mut self,
        path: &Path,
        timeout: Duration,
    ) -> Result<ThemeAnalysis, WallstoreError> {
        let deadline = Instant::now() + timeout;

        loop {
            let event = match self.backlog.pop_front() {
                Some(event) => event,
                None => match tokio::time::timeout_at(deadline, self.receiver.recv()).await {
                    Ok(Some(event)) => event,
                    Ok(None) => {
                        return Err(WallstoreError::WallpaperError("store stopped".to_string()));
                    }
                    Err(_) => {
                        return Err(WallstoreError::Timeout(format!(
                            "no theme reported for {} after {}s",
                            path.display(),
                            timeout.as_secs()
                        )));
                    }
                },
            };

            match event {
                StoreEvent::ThemeApplied { path: applied, analysis } if applied == path => {
                    return Ok(analysis);
                }
                StoreEvent::Error { message } => warn(&message),
                _ => {}
            }
        }
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }
}

/// Prints a non-fatal store error.
pub fn warn(message: &str) {
    eprintln!("{} {message}", "warning:".yellow().bold());
}

/// Resolves a user-supplied wallpaper path against the working directory.
#[must_use]
pub fn resolve_path(path: &str) -> PathBuf {
    let cwd = std::env::current_dir().unwrap_or_default();
    crate::platform::expand_and_resolve(path, &cwd)
}
