//! Theme CLI commands.

use std::path::Path;

use clap::Subcommand;
use colored::Colorize;

use crate::cli::output;
use crate::cli::session::{self, EventStream, Session, THEME_TIMEOUT};
use crate::error::WallstoreError;
use crate::wallpaper::{ModeOverride, OverrideState, SchemeOverride};

/// Theme subcommands.
#[derive(Subcommand, Debug)]
#[command(next_display_order = None)]
pub enum ThemeCommands {
    /// Force light or dark mode, or return to automatic detection.
    ///
    /// Values: auto, light, dark.
    Mode {
        #[arg(value_name = "MODE")]
        mode: ModeOverride,
    },

    /// Force a color scheme, or return to automatic detection.
    ///
    /// Values: auto, neutral, tonal-spot, expressive, rainbow, content.
    Scheme {
        #[arg(value_name = "SCHEME")]
        scheme: SchemeOverride,
    },

    /// Show the theme of a wallpaper.
    ///
    /// Uses the current wallpaper when no path is given. Only cached analyses
    /// are shown; nothing is recomputed.
    Show {
        #[arg(value_name = "PATH")]
        path: Option<String>,

        /// Output as JSON.
        #[arg(long, short)]
        json: bool,
    },
}

/// Execute theme subcommands.
pub async fn execute(cmd: &ThemeCommands, config_path: Option<&Path>) -> Result<(), WallstoreError> {
    let session = Session::open(config_path, false)?;

    let result = match cmd {
        ThemeCommands::Mode { mode } => {
            let mode = *mode;
            execute_override(&session, |overrides| OverrideState { mode, ..overrides }).await
        }
        ThemeCommands::Scheme { scheme } => {
            let scheme = *scheme;
            execute_override(&session, |overrides| OverrideState { scheme, ..overrides }).await
        }
        ThemeCommands::Show { path, json } => execute_show(&session, path.as_deref(), *json).await,
    };

    session.close().await;
    result
}

/// Changes the overrides and waits for the current wallpaper to be re-themed.
async fn execute_override(
    session: &Session,
    change: impl FnOnce(OverrideState) -> OverrideState,
) -> Result<(), WallstoreError> {
    let handle = &session.handle;
    let before = handle.overrides().await?;
    let after = change(before);

    if before == after {
        println!("Theme overrides unchanged (mode {}, scheme {}).", after.mode, after.scheme);
        return Ok(());
    }

    let mut events = EventStream::subscribe(handle);
    if after.mode != before.mode {
        handle.set_manual_mode(after.mode).await;
    }
    if after.scheme != before.scheme {
        handle.set_manual_scheme(after.scheme).await;
    }

    println!(
        "Theme overrides set: mode {}, scheme {}.",
        after.mode.as_str().cyan(),
        after.scheme.as_str().cyan()
    );

    let Some(current) = handle.current_wallpaper().await? else {
        return Ok(());
    };

    let analysis = events.wait_for_theme(&current, THEME_TIMEOUT).await?;
    output::print_theme(&current, &analysis, after);
    Ok(())
}

async fn execute_show(session: &Session, path: Option<&str>, json: bool) -> Result<(), WallstoreError> {
    let handle = &session.handle;
    let path = match path {
        Some(path) => session::resolve_path(path),
        None => handle
            .current_wallpaper()
            .await?
            .ok_or_else(|| WallstoreError::WallpaperError("No wallpaper applied".to_string()))?,
    };

    let overrides = handle.overrides().await?;
    let cached = handle.cached_theme(&path).await?;

    if json {
        let value = serde_json::json!({
            "path": path,
            "overrides": overrides,
            "cached": cached,
            "effective": cached.map(|entry| overrides.apply(entry.analysis)),
        });
        output::print_highlighted_json(&value);
        return Ok(());
    }

    match cached {
        Some(entry) => output::print_theme(&path, &overrides.apply(entry.analysis), overrides),
        None => println!("{}", format!("No cached theme for {}.", path.display()).dimmed()),
    }
    Ok(())
}
