//! Theme cache CLI commands.

use std::path::Path;

use clap::Subcommand;

use crate::cli::session::{EventStream, Session};
use crate::error::WallstoreError;

/// Cache subcommands.
#[derive(Subcommand, Debug)]
#[command(next_display_order = None)]
pub enum CacheCommands {
    /// Clear the theme cache.
    ///
    /// Removes every stored theme analysis. Wallpapers are analyzed again the
    /// next time they are applied.
    Clear,
}

/// Execute cache subcommands.
pub async fn execute(cmd: &CacheCommands, config_path: Option<&Path>) -> Result<(), WallstoreError> {
    let session = Session::open(config_path, false)?;

    let result = match cmd {
        CacheCommands::Clear => {
            let mut events = EventStream::subscribe(&session.handle);
            session.handle.clear_theme_cache().await;

            let errors = events.take_errors();
            if errors.is_empty() {
                println!("Theme cache cleared.");
                Ok(())
            } else {
                Err(WallstoreError::WallpaperError(errors.join("; ")))
            }
        }
    };

    session.close().await;
    result
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    struct TestCli {
        #[command(subcommand)]
        command: CacheCommands,
    }

    #[test]
    fn test_cache_clear_parse() {
        let cli = TestCli::try_parse_from(["test", "clear"]).unwrap();
        assert!(matches!(cli.command, CacheCommands::Clear));
    }

    #[test]
    fn test_cache_requires_subcommand() {
        assert!(TestCli::try_parse_from(["test"]).is_err());
    }
}
