//! Wallpaper directory watcher.
//!
//! Watches the wallpaper directory recursively and calls back once a burst of
//! filesystem events has settled, so a copy of many images triggers a single
//! rescan.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};

/// Quiet period required after the last event before calling back.
pub const WATCH_DEBOUNCE: Duration = Duration::from_millis(200);

/// Active watch on a directory. Dropping it stops watching.
pub struct DirectoryWatcher {
    root: PathBuf,
    _watcher: RecommendedWatcher,
}

impl DirectoryWatcher {
    /// Starts watching `root`, calling `on_change` after each settled burst of changes.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform watcher cannot be created or `root`
    /// cannot be watched.
    pub fn start(
        root: &Path,
        debounce: Duration,
        on_change: impl Fn() + Send + 'static,
    ) -> notify::Result<Self> {
        let (tx, rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(tx)?;
        watcher.watch(root, RecursiveMode::Recursive)?;

        let label = root.display().to_string();
        std::thread::Builder::new()
            .name("wallstore-watcher".to_string())
            .spawn(move || debounce_loop(&rx, debounce, &label, &on_change))
            .map_err(notify::Error::io)?;

        tracing::info!(path = %root.display(), "watching wallpaper directory");
        Ok(Self { root: root.to_path_buf(), _watcher: watcher })
    }

    /// Directory being watched.
    #[must_use]
    pub fn root(&self) -> &Path { &self.root }
}

impl std::fmt::Debug for DirectoryWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryWatcher").field("root", &self.root).finish_non_exhaustive()
    }
}

/// Returns whether an event can change the set of wallpapers.
const fn is_relevant(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Create(_) | EventKind::Remove(_) | EventKind::Modify(_))
}

fn debounce_loop(
    rx: &mpsc::Receiver<notify::Result<notify::Event>>,
    debounce: Duration,
    label: &str,
    on_change: &dyn Fn(),
) {
    let mut pending = false;

    loop {
        let received = if pending {
            rx.recv_timeout(debounce)
        } else {
            rx.recv().map_err(|_| RecvTimeoutError::Disconnected)
        };

        match received {
            Ok(Ok(event)) => {
                if is_relevant(&event.kind) {
                    pending = true;
                }
            }
            Ok(Err(err)) => {
                tracing::warn!(path = label, error = %err, "wallpaper watch error");
            }
            Err(RecvTimeoutError::Timeout) => {
                pending = false;
                tracing::debug!(path = label, "wallpaper directory changed");
                on_change();
            }
            // Watcher dropped
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debounce_is_reasonable() {
        const { assert!(WATCH_DEBOUNCE.as_millis() >= 100) };
        const { assert!(WATCH_DEBOUNCE.as_millis() <= 1000) };
    }

    #[test]
    fn test_relevant_event_kinds() {
        use notify::event::{AccessKind, CreateKind, RemoveKind};

        assert!(is_relevant(&EventKind::Create(CreateKind::File)));
        assert!(is_relevant(&EventKind::Remove(RemoveKind::File)));
        assert!(!is_relevant(&EventKind::Access(AccessKind::Any)));
    }

    #[test]
    fn test_burst_of_events_calls_back_once() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let (tx, rx) = mpsc::channel();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);

        let worker = std::thread::spawn(move || {
            debounce_loop(&rx, Duration::from_millis(50), "test", &move || {
                seen.fetch_add(1, Ordering::SeqCst);
            });
        });

        for _ in 0..5 {
            let event = notify::Event::new(EventKind::Create(notify::event::CreateKind::File));
            tx.send(Ok(event)).unwrap();
        }
        std::thread::sleep(Duration::from_millis(300));
        drop(tx);
        worker.join().unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_missing_directory_fails_to_start() {
        let result = DirectoryWatcher::start(Path::new("/nonexistent/walls"), WATCH_DEBOUNCE, || {});
        assert!(result.is_err());
    }
}
