//! External theme tool: applies wallpapers and reports the generated theme.
//!
//! The tool is a black box invoked by path and arguments. [`ThemeTool`] is the
//! seam the store depends on; [`Chromash`] is the process-backed implementation.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use futures::future::BoxFuture;
use tokio::process::Command;

use super::types::OverrideState;
use crate::platform;

/// Errors produced while invoking the theme tool.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// The tool binary could not be located or is not executable.
    #[error("theme tool not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The process could not be started.
    #[error("failed to run theme tool: {0}")]
    Spawn(#[from] std::io::Error),

    /// The process exited unsuccessfully.
    #[error("theme tool exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    /// The process succeeded but its output was unusable.
    #[error("invalid theme tool output: {0}")]
    InvalidOutput(String),
}

/// Operations the store needs from the external theme tool.
///
/// Futures are `'static` so invocations can run in their own tasks while the
/// store keeps processing messages.
pub trait ThemeTool: Send + Sync {
    /// Sets `path` as the wallpaper and regenerates the theme, honoring manual overrides.
    fn apply_wallpaper(
        &self,
        path: &Path,
        overrides: OverrideState,
    ) -> BoxFuture<'static, Result<(), ToolError>>;

    /// Returns the tool's textual description of the current theme.
    fn query_theme(&self) -> BoxFuture<'static, Result<String, ToolError>>;
}

/// Process-backed theme tool (`chromash`-compatible command line).
#[derive(Debug, Clone)]
pub struct Chromash {
    binary: PathBuf,
}

impl Chromash {
    /// Uses the binary at `binary` without checking it exists.
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>) -> Self { Self { binary: binary.into() } }

    /// Locates `name` on the search path.
    ///
    /// When the binary cannot be found the returned tool keeps the unresolved
    /// name; invocations then fail with [`ToolError::NotFound`], which the
    /// store treats as an environment error rather than a startup failure.
    #[must_use]
    pub fn locate(name: &str) -> Self {
        match platform::resolve_binary(name) {
            Ok(binary) => Self { binary },
            Err(reason) => {
                tracing::warn!(tool = name, %reason, "theme tool not found");
                Self { binary: platform::expand(name) }
            }
        }
    }

    /// Path of the binary invoked.
    #[must_use]
    pub fn binary(&self) -> &Path { &self.binary }

    /// Builds the `wallpaper` subcommand arguments.
    #[must_use]
    pub fn apply_args(path: &Path, overrides: OverrideState) -> Vec<OsString> {
        let mut args = vec![OsString::from("wallpaper"), path.as_os_str().to_os_string()];

        if let Some(mode) = overrides.mode.manual() {
            args.push("--mode".into());
            args.push(mode.as_str().into());
        }

        if let Some(scheme) = overrides.scheme.manual() {
            args.push("--scheme".into());
            args.push(scheme.as_str().into());
        }

        args
    }

    fn command(&self, args: Vec<OsString>) -> BoxFuture<'static, Result<String, ToolError>> {
        let binary = self.binary.clone();

        Box::pin(async move {
            if !binary.is_file() {
                return Err(ToolError::NotFound(binary));
            }

            tracing::debug!(tool = %binary.display(), ?args, "invoking theme tool");

            let output = Command::new(&binary)
                .args(&args)
                .stdin(Stdio::null())
                .kill_on_drop(false)
                .output()
                .await?;

            if !output.status.success() {
                return Err(ToolError::Failed {
                    status: output.status.to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                });
            }

            String::from_utf8(output.stdout)
                .map_err(|err| ToolError::InvalidOutput(err.to_string()))
        })
    }
}

impl ThemeTool for Chromash {
    fn apply_wallpaper(
        &self,
        path: &Path,
        overrides: OverrideState,
    ) -> BoxFuture<'static, Result<(), ToolError>> {
        let invocation = self.command(Self::apply_args(path, overrides));
        Box::pin(async move { invocation.await.map(|_| ()) })
    }

    fn query_theme(&self) -> BoxFuture<'static, Result<String, ToolError>> {
        self.command(vec![OsString::from("theme")])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallpaper::types::{ModeOverride, SchemeOverride};

    #[test]
    fn test_apply_args_without_overrides() {
        let args = Chromash::apply_args(Path::new("/walls/a.png"), OverrideState::default());
        assert_eq!(args, vec![OsString::from("wallpaper"), OsString::from("/walls/a.png")]);
    }

    #[test]
    fn test_apply_args_with_overrides() {
        let overrides = OverrideState {
            mode: ModeOverride::Light,
            scheme: SchemeOverride::TonalSpot,
        };
        let args = Chromash::apply_args(Path::new("/walls/a.png"), overrides);
        let args: Vec<_> = args.iter().map(|arg| arg.to_string_lossy().into_owned()).collect();
        assert_eq!(
            args,
            ["wallpaper", "/walls/a.png", "--mode", "light", "--scheme", "tonal-spot"]
        );
    }

    #[test]
    fn test_locate_missing_tool_keeps_name() {
        let tool = Chromash::locate("wallstore_missing_tool_123");
        assert!(tool.binary().ends_with("wallstore_missing_tool_123"));
    }

    #[tokio::test]
    async fn test_missing_binary_reports_not_found() {
        let tool = Chromash::new("/nonexistent/chromash");
        let err = tool.query_theme().await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_runs_script_and_captures_stdout() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("tool.sh");
        std::fs::write(&script, "#!/bin/sh\nif [ \"$1\" = theme ]; then echo light; else exit 3; fi\n")
            .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let tool = Chromash::new(&script);
        assert_eq!(tool.query_theme().await.unwrap().trim(), "light");

        let err = tool
            .apply_wallpaper(Path::new("/walls/a.png"), OverrideState::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Failed { .. }));
    }
}
