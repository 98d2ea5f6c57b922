//! Store events and observer registration.
//!
//! ## Naming Convention
//!
//! Event names follow the pattern `wallstore://<module>/<event-name>`:
//!
//! - `wallstore://` - Prefix identifying a Wallstore event
//! - `<module>` - The part of the store that owns the event (`wallpaper`, `theme`, `store`)
//! - `<event-name>` - Descriptive kebab-case name for the event
//!
//! Observers register with [`EventBus::subscribe`] and keep the returned
//! [`Subscription`]. Dropping a subscription does not unregister the handler;
//! call [`Subscription::unsubscribe`].

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::Serialize;

use crate::wallpaper::types::{OverrideState, ThemeAnalysis, WallpaperEntry};

/// Wallpaper index and selection events.
pub mod wallpaper {
    /// Emitted after a rescan replaced the entry list.
    ///
    /// Payload: `{ entries: WallpaperEntry[] }`
    pub const WALLPAPERS_CHANGED: &str = "wallstore://wallpaper/wallpapers-changed";

    /// Emitted when the apply tool accepted a new wallpaper.
    ///
    /// Payload: `{ path: string }`
    pub const WALLPAPER_SET: &str = "wallstore://wallpaper/wallpaper-set";
}

/// Theme events.
pub mod theme {
    /// Emitted when a manual mode or scheme override changes.
    ///
    /// Payload: `{ overrides: { mode, scheme } }`
    pub const SETTINGS_CHANGED: &str = "wallstore://theme/settings-changed";

    /// Emitted with the effective analysis once a theme has been applied.
    ///
    /// Payload: `{ path: string, analysis: ThemeAnalysis }`
    pub const APPLIED: &str = "wallstore://theme/applied";
}

/// Store-wide events.
pub mod store {
    /// Emitted when an operation failed.
    ///
    /// Payload: `{ message: string }`
    pub const ERROR: &str = "wallstore://store/error";
}

/// Discriminant of a [`StoreEvent`], used to filter subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    WallpapersChanged,
    WallpaperSet,
    ThemeSettingsChanged,
    ThemeApplied,
    Error,
}

impl EventKind {
    /// Fully qualified event name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::WallpapersChanged => wallpaper::WALLPAPERS_CHANGED,
            Self::WallpaperSet => wallpaper::WALLPAPER_SET,
            Self::ThemeSettingsChanged => theme::SETTINGS_CHANGED,
            Self::ThemeApplied => theme::APPLIED,
            Self::Error => store::ERROR,
        }
    }
}

/// Lifecycle events emitted by the wallpaper store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum StoreEvent {
    WallpapersChanged { entries: Vec<WallpaperEntry> },
    WallpaperSet { path: PathBuf },
    ThemeSettingsChanged { overrides: OverrideState },
    ThemeApplied { path: PathBuf, analysis: ThemeAnalysis },
    Error { message: String },
}

impl StoreEvent {
    /// Builds an error event.
    pub fn error(message: impl Into<String>) -> Self { Self::Error { message: message.into() } }

    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::WallpapersChanged { .. } => EventKind::WallpapersChanged,
            Self::WallpaperSet { .. } => EventKind::WallpaperSet,
            Self::ThemeSettingsChanged { .. } => EventKind::ThemeSettingsChanged,
            Self::ThemeApplied { .. } => EventKind::ThemeApplied,
            Self::Error { .. } => EventKind::Error,
        }
    }

    /// Fully qualified event name.
    #[must_use]
    pub const fn name(&self) -> &'static str { self.kind().name() }
}

/// Registration handle returned by [`EventBus::subscribe`] and configuration
/// store subscriptions.
#[must_use = "dropping a Subscription keeps the handler registered; call `unsubscribe`"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Wraps the closure that removes the registration.
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self { cancel: Some(Box::new(cancel)) }
    }

    /// A subscription with nothing to release.
    pub fn noop() -> Self { Self { cancel: None } }

    /// Removes the registration.
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("active", &self.cancel.is_some()).finish()
    }
}

type Handler = Arc<dyn Fn(&StoreEvent) + Send + Sync>;

struct Registration {
    id: u64,
    kind: Option<EventKind>,
    handler: Handler,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    handlers: Vec<Registration>,
}

/// Synchronous fan-out of [`StoreEvent`]s to registered handlers.
///
/// Handlers run on the emitting task, outside the registry lock, in
/// registration order. A panicking handler is logged and skipped.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Arc<Mutex<Registry>>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Registers `handler` for events of `kind`.
    pub fn subscribe(
        &self,
        kind: EventKind,
        handler: impl Fn(&StoreEvent) + Send + Sync + 'static,
    ) -> Subscription {
        self.register(Some(kind), Arc::new(handler))
    }

    /// Registers `handler` for every event.
    pub fn subscribe_all(&self, handler: impl Fn(&StoreEvent) + Send + Sync + 'static) -> Subscription {
        self.register(None, Arc::new(handler))
    }

    fn register(&self, kind: Option<EventKind>, handler: Handler) -> Subscription {
        let id = {
            let mut registry = self.registry.lock();
            let id = registry.next_id;
            registry.next_id += 1;
            registry.handlers.push(Registration { id, kind, handler });
            id
        };

        let registry: Weak<Mutex<Registry>> = Arc::downgrade(&self.registry);
        Subscription::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry.lock().handlers.retain(|registration| registration.id != id);
            }
        })
    }

    /// Delivers `event` to every matching handler.
    pub fn emit(&self, event: &StoreEvent) {
        let kind = event.kind();
        let handlers: Vec<Handler> = self
            .registry
            .lock()
            .handlers
            .iter()
            .filter(|registration| registration.kind.is_none_or(|k| k == kind))
            .map(|registration| Arc::clone(&registration.handler))
            .collect();

        tracing::trace!(event = event.name(), handlers = handlers.len(), "emitting event");

        for handler in handlers {
            if let Err(panic_info) = catch_unwind(AssertUnwindSafe(|| handler(event))) {
                let panic_msg = panic_info
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic_info.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());

                tracing::error!(event = event.name(), panic = %panic_msg, "event handler panicked");
            }
        }
    }

    /// Removes every handler.
    pub fn clear(&self) { self.registry.lock().handlers.clear(); }

    /// Number of registered handlers.
    #[must_use]
    pub fn handler_count(&self) -> usize { self.registry.lock().handlers.len() }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus").field("handlers", &self.handler_count()).finish()
    }
}
