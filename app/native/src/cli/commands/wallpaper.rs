//! Wallpaper CLI commands.
//!
//! Listing, fuzzy searching, setting and watching wallpapers.

use std::path::Path;

use clap::Subcommand;

use crate::cli::output;
use crate::cli::session::{self, EventStream, Session, THEME_TIMEOUT};
use crate::error::WallstoreError;

/// Wallpaper commands.
#[derive(Subcommand, Debug)]
#[command(next_display_order = None)]
pub enum WallpaperCommands {
    /// List available wallpapers.
    ///
    /// Scans the wallpaper directory and prints every image found.
    List {
        /// Output as JSON.
        #[arg(long, short)]
        json: bool,
    },

    /// Fuzzy search wallpapers by name.
    #[command(after_long_help = r#"Examples:
  wallstore search forest             # Best matches, up to the configured maximum
  wallstore search "blue sky" -l 3    # At most three matches"#)]
    Search {
        /// Text to match against wallpaper names.
        #[arg(value_name = "QUERY")]
        query: String,

        /// Maximum number of results.
        #[arg(long, short)]
        limit: Option<usize>,

        /// Output as JSON.
        #[arg(long, short)]
        json: bool,
    },

    /// Set the wallpaper and apply its theme.
    ///
    /// Set a specific wallpaper by providing a path, or use --random to pick
    /// one from the wallpaper directory. Waits until the theme is applied.
    #[command(
        verbatim_doc_comment,
        after_long_help = r#"Examples:
  wallstore set ~/Pictures/Wallpapers/forest.jpg   # Specific wallpaper
  wallstore set --random                           # Random wallpaper"#
    )]
    Set {
        /// The path to the image to use as wallpaper.
        #[arg(value_name = "PATH")]
        path: Option<String>,

        /// Set a random wallpaper from the wallpaper directory.
        #[arg(long, short)]
        random: bool,
    },

    /// Watch the wallpaper directory and print store events.
    ///
    /// Rescans when images are added or removed. Runs until interrupted.
    Watch,
}

/// Execute wallpaper commands.
pub async fn execute(cmd: &WallpaperCommands, config_path: Option<&Path>) -> Result<(), WallstoreError> {
    if let WallpaperCommands::Set { path, random } = cmd {
        validate_set(path.as_deref(), *random)?;
    }

    let watch = matches!(cmd, WallpaperCommands::Watch);
    let session = Session::open(config_path, watch)?;

    let result = match cmd {
        WallpaperCommands::List { json } => execute_list(&session, *json).await,
        WallpaperCommands::Search { query, limit, json } => {
            execute_search(&session, query, *limit, *json).await
        }
        WallpaperCommands::Set { path, .. } => execute_set(&session, path.as_deref()).await,
        WallpaperCommands::Watch => execute_watch(&session).await,
    };

    session.close().await;
    result
}

fn validate_set(path: Option<&str>, random: bool) -> Result<(), WallstoreError> {
    match (path, random) {
        (Some(_), true) => Err(WallstoreError::InvalidArguments(
            "Cannot specify both <path> and --random. Use one or the other.".to_string(),
        )),
        (None, false) => Err(WallstoreError::InvalidArguments(
            "Either <path> or --random must be specified.".to_string(),
        )),
        _ => Ok(()),
    }
}

async fn execute_list(session: &Session, json: bool) -> Result<(), WallstoreError> {
    session.indexed().await;
    let entries = session.handle.entries().await?;

    if json {
        output::print_highlighted_json(&serde_json::to_value(&entries)?);
    } else {
        let current = session.handle.current_wallpaper().await?;
        output::print_entries("Wallpapers", &entries, current.as_deref());
    }
    Ok(())
}

async fn execute_search(
    session: &Session,
    query: &str,
    limit: Option<usize>,
    json: bool,
) -> Result<(), WallstoreError> {
    session.indexed().await;
    let entries = match limit {
        Some(limit) => session.handle.search_with_limit(query, limit).await?,
        None => session.handle.search(query).await?,
    };

    if json {
        output::print_highlighted_json(&serde_json::to_value(&entries)?);
    } else {
        let current = session.handle.current_wallpaper().await?;
        output::print_entries("Matches", &entries, current.as_deref());
    }
    Ok(())
}

/// Sets the wallpaper, or a random one when `path` is `None`.
async fn execute_set(session: &Session, path: Option<&str>) -> Result<(), WallstoreError> {
    let handle = &session.handle;
    let previous = handle.current_wallpaper().await?;
    let mut events = EventStream::subscribe(handle);

    match path {
        Some(path) => handle.set_wallpaper_path(session::resolve_path(path)).await,
        None => {
            session.indexed().await;
            handle.set_random_wallpaper().await;
        }
    }

    let current = handle.current_wallpaper().await?;
    let errors = events.take_errors();

    let Some(target) = current.filter(|current| Some(current) != previous.as_ref()) else {
        if !errors.is_empty() {
            return Err(WallstoreError::WallpaperError(errors.join("; ")));
        }
        return show_cached(session, previous.as_deref()).await;
    };

    for message in &errors {
        session::warn(message);
    }

    let analysis = events.wait_for_theme(&target, THEME_TIMEOUT).await?;
    output::print_theme(&target, &analysis, handle.overrides().await?);
    Ok(())
}

/// Reports an unchanged wallpaper along with its last known theme.
async fn show_cached(session: &Session, current: Option<&Path>) -> Result<(), WallstoreError> {
    let Some(current) = current else {
        return Err(WallstoreError::WallpaperError("No wallpaper applied".to_string()));
    };

    println!("Wallpaper already applied.");
    if let Some(cached) = session.handle.cached_theme(current).await? {
        let overrides = session.handle.overrides().await?;
        output::print_theme(current, &overrides.apply(cached.analysis), overrides);
    }
    Ok(())
}

async fn execute_watch(session: &Session) -> Result<(), WallstoreError> {
    let subscription = session.handle.subscribe_all(|event| {
        tracing::info!(event = event.name(), "store event");
        match serde_json::to_string(event) {
            Ok(line) => println!("{line}"),
            Err(err) => tracing::warn!(error = %err, "cannot serialize event"),
        }
    });

    session.indexed().await;
    tracing::info!("watching for wallpaper changes, press Ctrl-C to stop");
    let result = tokio::signal::ctrl_c().await;

    subscription.unsubscribe();
    result.map_err(WallstoreError::from)
}
