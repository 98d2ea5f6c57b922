//! CLI command definitions using Clap.
//!
//! This module defines all CLI commands and their arguments, organized into
//! domain-specific submodules:
//!
//! - `wallpaper` - listing, searching, setting and watching wallpapers
//! - `theme` - manual theme overrides and the current theme
//! - `cache` - theme cache management

use std::future::Future;
use std::io;
use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Generator, Shell, generate};

use crate::error::WallstoreError;
use crate::schema;

pub mod cache;
pub mod theme;
pub mod wallpaper;

pub use cache::CacheCommands;
pub use theme::ThemeCommands;
pub use wallpaper::WallpaperCommands;

/// Application version from Cargo.toml.
const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Wallstore CLI - wallpaper index and theme management.
#[derive(Parser, Debug)]
#[command(name = "wallstore")]
#[command(author, version = APP_VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to a custom configuration file.
    ///
    /// Overrides the default configuration file search paths.
    /// Supports JSONC format (JSON with comments).
    #[arg(long, short, global = true, value_name = "PATH")]
    pub config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
#[command(next_display_order = None)]
pub enum Commands {
    #[command(flatten)]
    Wallpaper(WallpaperCommands),

    /// Theme override commands.
    ///
    /// Force light or dark mode or a color scheme on top of the automatic
    /// analysis, or show the theme of a wallpaper.
    #[command(subcommand)]
    Theme(ThemeCommands),

    /// Theme cache management commands.
    #[command(subcommand)]
    Cache(CacheCommands),

    /// Output Wallstore configuration JSON Schema.
    ///
    /// Outputs a JSON Schema to stdout that describes the structure of the
    /// Wallstore configuration file. Can be redirected to a file for use with
    /// editors that support JSON Schema validation.
    Schema,

    /// Generate shell completions.
    ///
    /// Outputs shell completion script to stdout for the specified shell.
    ///
    /// Usage:
    ///   eval "$(wallstore completions --shell zsh)"
    ///   wallstore completions --shell fish > ~/.config/fish/completions/wallstore.fish
    #[command(verbatim_doc_comment)]
    Completions {
        /// The shell to generate completions for.
        #[arg(long, short, value_enum)]
        shell: Shell,
    },
}

impl Cli {
    /// Returns the custom config path if specified via --config flag.
    #[must_use]
    pub fn config_path(&self) -> Option<PathBuf> { self.config.as_ref().map(PathBuf::from) }

    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command execution fails.
    pub fn execute(&self) -> Result<(), WallstoreError> {
        let config_path = self.config_path();
        if let Some(path) = config_path.as_ref().filter(|path| !path.exists()) {
            return Err(WallstoreError::ConfigError(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }
        let config_path = config_path.as_deref();

        match &self.command {
            Commands::Wallpaper(cmd) => block_on(wallpaper::execute(cmd, config_path)),
            Commands::Theme(cmd) => block_on(theme::execute(cmd, config_path)),
            Commands::Cache(cmd) => block_on(cache::execute(cmd, config_path)),

            Commands::Schema => {
                println!("{}", schema::print_schema());
                Ok(())
            }

            Commands::Completions { shell } => {
                Self::print_completions(*shell);
                Ok(())
            }
        }
    }

    /// Print shell completions to stdout.
    fn print_completions<G: Generator>(generator: G) {
        let mut cmd = Self::command();
        generate(generator, &mut cmd, "wallstore", &mut io::stdout());
    }
}

/// Runs a store command to completion on a current-thread runtime.
fn block_on<F>(future: F) -> Result<(), WallstoreError>
where
    F: Future<Output = Result<(), WallstoreError>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    runtime.block_on(future)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_schema() {
        let cli = Cli::try_parse_from(["wallstore", "schema"]).unwrap();
        assert!(matches!(cli.command, Commands::Schema));
    }

    #[test]
    fn test_cli_parses_completions() {
        let cli = Cli::try_parse_from(["wallstore", "completions", "--shell", "zsh"]).unwrap();
        assert!(matches!(cli.command, Commands::Completions { shell: Shell::Zsh }));
    }

    #[test]
    fn test_cli_parses_flattened_wallpaper_commands() {
        let cli = Cli::try_parse_from(["wallstore", "list", "--json"]).unwrap();
        assert!(matches!(cli.command, Commands::Wallpaper(WallpaperCommands::List { json: true })));

        let cli = Cli::try_parse_from(["wallstore", "set", "--random"]).unwrap();
        assert!(matches!(cli.command, Commands::Wallpaper(WallpaperCommands::Set { .. })));
    }

    #[test]
    fn test_cli_global_config_flag() {
        let cli = Cli::try_parse_from(["wallstore", "cache", "clear", "--config", "/tmp/w.jsonc"])
            .unwrap();
        assert_eq!(cli.config_path(), Some(PathBuf::from("/tmp/w.jsonc")));
        assert!(matches!(cli.command, Commands::Cache(CacheCommands::Clear)));
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let cli = Cli::try_parse_from(["wallstore", "--config", "/nonexistent/w.jsonc", "schema"])
            .unwrap();
        assert!(matches!(cli.execute(), Err(WallstoreError::ConfigError(_))));
    }

    #[test]
    fn test_cli_rejects_unknown_command() {
        assert!(Cli::try_parse_from(["wallstore", "unknown"]).is_err());
    }

    #[test]
    fn test_cli_definition_is_valid() { Cli::command().debug_assert(); }
}
