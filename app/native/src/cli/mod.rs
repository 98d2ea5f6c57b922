//! Command-line interface for Wallstore.
//!
//! Every command spawns a store over the persisted settings, performs its
//! work and disposes the store before exiting.

mod commands;
mod output;
mod session;

use clap::Parser;
pub use commands::Cli;

use crate::error::WallstoreError;

/// Parses the command line and runs the selected command.
///
/// # Errors
///
/// Returns an error if the command fails.
pub fn run() -> Result<(), WallstoreError> {
    let cli = Cli::parse();
    cli.execute()
}
