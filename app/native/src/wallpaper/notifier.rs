//! Desktop notifications for applied themes.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use super::types::ThemeAnalysis;
use crate::platform;

/// Title used for theme notifications.
pub const NOTIFICATION_TITLE: &str = "Theme Applied";

/// Receives the effective analysis whenever a theme is applied.
///
/// Implementations must not fail the caller; delivery problems are logged.
pub trait NotificationSink: Send + Sync {
    fn theme_applied(&self, path: &Path, analysis: &ThemeAnalysis);
}

/// Builds the notification body for an applied theme.
#[must_use]
pub fn format_message(path: &Path, analysis: &ThemeAnalysis) -> String {
    let image = path
        .file_name()
        .map_or_else(|| path.to_string_lossy(), |name| name.to_string_lossy());

    format!("Image: {image}\nTheme: {} {}", analysis.mode, analysis.scheme)
}

/// Sends notifications through `notify-send`.
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    binary: Option<PathBuf>,
}

impl DesktopNotifier {
    /// Locates `notify-send`; notifications are silently skipped when it is missing.
    #[must_use]
    pub fn locate() -> Self {
        let binary = platform::resolve_binary("notify-send")
            .inspect_err(|reason| tracing::debug!(%reason, "desktop notifications disabled"))
            .ok();

        Self { binary }
    }

    /// Whether a notification binary was found.
    #[must_use]
    pub const fn is_available(&self) -> bool { self.binary.is_some() }
}

impl NotificationSink for DesktopNotifier {
    fn theme_applied(&self, path: &Path, analysis: &ThemeAnalysis) {
        let Some(binary) = &self.binary else {
            return;
        };

        // Detached: the child is not awaited.
        let spawned = Command::new(binary)
            .arg(NOTIFICATION_TITLE)
            .arg(format_message(path, analysis))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        if let Err(err) = spawned {
            tracing::warn!(error = %err, "failed to send theme notification");
        }
    }
}

/// Discards all notifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl NotificationSink for NullNotifier {
    fn theme_applied(&self, _path: &Path, _analysis: &ThemeAnalysis) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallpaper::types::{ThemeMode, ThemeScheme};

    #[test]
    fn test_format_message_uses_basename() {
        let analysis = ThemeAnalysis::classified(ThemeMode::Light, ThemeScheme::TonalSpot);
        let message = format_message(Path::new("/home/me/walls/lake.jpg"), &analysis);
        assert_eq!(message, "Image: lake.jpg\nTheme: light tonal-spot");
    }

    #[test]
    fn test_null_notifier_accepts_anything() {
        let analysis = ThemeAnalysis::classified(ThemeMode::Dark, ThemeScheme::Neutral);
        NullNotifier.theme_applied(Path::new("/x.png"), &analysis);
    }
}
