//! Wallstore - wallpaper index, theme analysis cache and debounced theming
//! pipeline for desktop shells.
//!
//! The [`wallpaper::WallpaperStore`] actor owns the index, the theme cache and
//! the analysis pipeline. Consumers talk to it through a cloneable
//! [`wallpaper::WallpaperStoreHandle`] and observe it through [`events`].

pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod platform;
pub mod schema;
pub mod wallpaper;

use tracing_subscriber::EnvFilter;

/// Default log filter when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "wallstore=info";

/// Installs the global `tracing` subscriber, writing to stderr.
///
/// `RUST_LOG` overrides the default filter. Calling this more than once is harmless.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}
