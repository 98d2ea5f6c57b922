//! Handle for communicating with the wallpaper store actor.
//!
//! The `WallpaperStoreHandle` is a cheap, cloneable interface for sending
//! commands to the store, reading its state and subscribing to its events.
//!
//! Command methods never fail: problems are reported through
//! [`StoreEvent::Error`](crate::events::StoreEvent::Error) events, and calls
//! made after the store has stopped are ignored.

use std::path::{Path, PathBuf};

use tokio::sync::{mpsc, oneshot};

use super::messages::{QueryResult, StoreMessage, StoreQuery};
use crate::events::{EventBus, EventKind, StoreEvent, Subscription};
use crate::wallpaper::types::{
    CachedThemeEntry, ModeOverride, OverrideState, SchemeOverride, WallpaperEntry,
};

/// Error types for actor communication.
#[derive(Debug, thiserror::Error)]
pub enum ActorError {
    /// Failed to send message to actor.
    #[error("Failed to send message to store: channel closed")]
    SendFailed,

    /// Failed to receive response from actor.
    #[error("Failed to receive response from store: channel closed")]
    ReceiveFailed,

    /// The actor answered with a result of the wrong kind.
    #[error("Unexpected store response: {0}")]
    UnexpectedResult(&'static str),
}

/// Handle for communicating with the wallpaper store.
#[derive(Clone)]
pub struct WallpaperStoreHandle {
    sender: mpsc::Sender<StoreMessage>,
    events: EventBus,
}

impl WallpaperStoreHandle {
    pub(crate) const fn new(sender: mpsc::Sender<StoreMessage>, events: EventBus) -> Self {
        Self { sender, events }
    }

    /// Sends a command and waits until the actor acknowledges it.
    async fn command(&self, build: impl FnOnce(Option<oneshot::Sender<()>>) -> StoreMessage) {
        let (tx, rx) = oneshot::channel();
        let msg = build(Some(tx));
        let name = msg.name();

        if self.sender.send(msg).await.is_err() {
            tracing::debug!(command = name, "store stopped, command ignored");
            return;
        }

        // A dropped acknowledgement means the store stopped mid-command.
        let _ = rx.await;
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Applies `entry` as the wallpaper.
    ///
    /// Returns once the apply tool has succeeded or the change was rolled back.
    /// The theme analysis follows asynchronously.
    pub async fn set_wallpaper(&self, entry: WallpaperEntry) {
        self.command(|respond_to| StoreMessage::SetWallpaper { entry, respond_to }).await;
    }

    /// Applies the image at `path` as the wallpaper.
    pub async fn set_wallpaper_path(&self, path: impl Into<PathBuf>) {
        self.set_wallpaper(WallpaperEntry::from_path(path)).await;
    }

    /// Applies a random indexed wallpaper, avoiding the current one when possible.
    pub async fn set_random_wallpaper(&self) {
        self.command(|respond_to| StoreMessage::SetRandomWallpaper { respond_to }).await;
    }

    /// Rescans the wallpaper directory and republishes the entries.
    pub async fn refresh(&self) {
        self.command(|respond_to| StoreMessage::Refresh { respond_to }).await;
    }

    /// Changes the manual mode override and re-applies the current wallpaper.
    pub async fn set_manual_mode(&self, mode: ModeOverride) {
        self.command(|respond_to| StoreMessage::SetManualMode { mode, respond_to }).await;
    }

    /// Changes the manual scheme override and re-applies the current wallpaper.
    pub async fn set_manual_scheme(&self, scheme: SchemeOverride) {
        self.command(|respond_to| StoreMessage::SetManualScheme { scheme, respond_to }).await;
    }

    /// Empties the theme cache, in memory and in the settings store.
    pub async fn clear_theme_cache(&self) {
        self.command(|respond_to| StoreMessage::ClearThemeCache { respond_to }).await;
    }

    /// Stops the store and releases its timers, subscriptions and watcher.
    ///
    /// Idempotent; every later call on any handle is ignored.
    pub async fn dispose(&self) {
        self.command(|respond_to| StoreMessage::Dispose { respond_to }).await;
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Execute a query and wait for the result.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the store has stopped, or
    /// [`ActorError::ReceiveFailed`] if it stopped before answering.
    pub async fn query(&self, query: StoreQuery) -> Result<QueryResult, ActorError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(StoreMessage::Query { query, respond_to: tx })
            .await
            .map_err(|_| ActorError::SendFailed)?;

        rx.await.map_err(|_| ActorError::ReceiveFailed)
    }

    /// Fuzzy-searches display names using the configured result limit.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the store fails.
    pub async fn search(&self, query: &str) -> Result<Vec<WallpaperEntry>, ActorError> {
        self.search_inner(query, None).await
    }

    /// Fuzzy-searches display names, returning at most `limit` entries.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the store fails.
    pub async fn search_with_limit(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<WallpaperEntry>, ActorError> {
        self.search_inner(query, Some(limit)).await
    }

    async fn search_inner(
        &self,
        query: &str,
        limit: Option<usize>,
    ) -> Result<Vec<WallpaperEntry>, ActorError> {
        let result = self.query(StoreQuery::Search { query: query.to_string(), limit }).await?;
        let name = result.name();
        result.into_entries().ok_or(ActorError::UnexpectedResult(name))
    }

    /// Get all indexed entries.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the store fails.
    pub async fn entries(&self) -> Result<Vec<WallpaperEntry>, ActorError> {
        let result = self.query(StoreQuery::Entries).await?;
        let name = result.name();
        result.into_entries().ok_or(ActorError::UnexpectedResult(name))
    }

    /// Get the applied wallpaper.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the store fails.
    pub async fn current_wallpaper(&self) -> Result<Option<PathBuf>, ActorError> {
        let result = self.query(StoreQuery::CurrentWallpaper).await?;
        let name = result.name();
        result.into_current_wallpaper().ok_or(ActorError::UnexpectedResult(name))
    }

    /// Get the manual overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the store fails.
    pub async fn overrides(&self) -> Result<OverrideState, ActorError> {
        let result = self.query(StoreQuery::Overrides).await?;
        result.as_overrides().ok_or(ActorError::UnexpectedResult(result.name()))
    }

    /// Get the cached analysis for `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the store fails.
    pub async fn cached_theme(&self, path: &Path) -> Result<Option<CachedThemeEntry>, ActorError> {
        let result = self.query(StoreQuery::CachedTheme { path: path.to_path_buf() }).await?;
        result.as_cached_theme().ok_or(ActorError::UnexpectedResult(result.name()))
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Registers `handler` for events of `kind`.
    pub fn subscribe(
        &self,
        kind: EventKind,
        handler: impl Fn(&StoreEvent) + Send + Sync + 'static,
    ) -> Subscription {
        self.events.subscribe(kind, handler)
    }

    /// Registers `handler` for every event.
    pub fn subscribe_all(&self, handler: impl Fn(&StoreEvent) + Send + Sync + 'static) -> Subscription {
        self.events.subscribe_all(handler)
    }

    /// Whether the store has stopped.
    #[must_use]
    pub fn is_closed(&self) -> bool { self.sender.is_closed() }
}

impl std::fmt::Debug for WallpaperStoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WallpaperStoreHandle").field("closed", &self.is_closed()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_commands_on_stopped_store_are_ignored() {
        let (sender, receiver) = mpsc::channel(1);
        drop(receiver);
        let handle = WallpaperStoreHandle::new(sender, EventBus::new());

        handle.refresh().await;
        handle.dispose().await;
        assert!(handle.is_closed());
        assert!(matches!(handle.entries().await, Err(ActorError::SendFailed)));
    }

    #[test]
    fn test_actor_error_display() {
        assert!(ActorError::SendFailed.to_string().contains("channel closed"));
        assert!(ActorError::UnexpectedResult("Overrides").to_string().contains("Overrides"));
    }
}
