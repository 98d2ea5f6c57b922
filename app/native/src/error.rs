//! Error types for Wallstore.
//!
//! `WallstoreError` is what the command-line surface reports. The store itself
//! never fails its commands; it reports problems as error events instead.

use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;
use crate::wallpaper::ActorError;

/// Errors that can occur while running a Wallstore command.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "kind", content = "message")]
pub enum WallstoreError {
    /// Invalid command arguments.
    #[error("{0}")]
    InvalidArguments(String),
    /// Configuration or settings error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
    /// Wallpaper store operation failed.
    #[error("Wallpaper error: {0}")]
    WallpaperError(String),
    /// The theme was not reported in time.
    #[error("Timed out: {0}")]
    Timeout(String),
    /// IO error.
    #[error("IO error: {0}")]
    IoError(String),
    /// Generic command error.
    #[error("{0}")]
    CommandError(String),
}

impl From<std::io::Error> for WallstoreError {
    fn from(err: std::io::Error) -> Self { Self::IoError(err.to_string()) }
}

impl From<serde_json::Error> for WallstoreError {
    fn from(err: serde_json::Error) -> Self { Self::CommandError(err.to_string()) }
}

impl From<ConfigError> for WallstoreError {
    fn from(err: ConfigError) -> Self { Self::ConfigError(err.to_string()) }
}

impl From<ActorError> for WallstoreError {
    fn from(err: ActorError) -> Self { Self::WallpaperError(err.to_string()) }
}

impl From<String> for WallstoreError {
    fn from(msg: String) -> Self { Self::CommandError(msg) }
}

impl From<&str> for WallstoreError {
    fn from(msg: &str) -> Self { Self::CommandError(msg.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_arguments_display() {
        let err = WallstoreError::InvalidArguments("Cannot specify both path and random".to_string());
        assert!(err.to_string().contains("Cannot specify both path and random"));
    }

    #[test]
    fn test_wallpaper_error_display() {
        let err = WallstoreError::WallpaperError("Image not found".to_string());
        assert!(err.to_string().contains("Wallpaper error"));
    }

    #[test]
    fn test_config_error_from_conversion() {
        let err: WallstoreError = ConfigError::NotFound.into();
        assert!(matches!(err, WallstoreError::ConfigError(_)));
        assert!(err.to_string().starts_with("Configuration error"));
    }

    #[test]
    fn test_actor_error_from_conversion() {
        let err: WallstoreError = ActorError::SendFailed.into();
        assert!(matches!(err, WallstoreError::WallpaperError(_)));
    }

    #[test]
    fn test_io_error_from_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "permission denied");
        let err: WallstoreError = io_err.into();
        assert!(matches!(err, WallstoreError::IoError(_)));
        assert!(err.to_string().contains("IO error"));
    }

    #[test]
    fn test_command_error_display() {
        let err: WallstoreError = "Generic failure".into();
        assert_eq!(err.to_string(), "Generic failure");
    }

    #[test]
    fn test_error_serializes_with_kind() {
        let err = WallstoreError::Timeout("no theme".to_string());
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"kind\":\"Timeout\""));
        assert!(json.contains("no theme"));
    }
}
