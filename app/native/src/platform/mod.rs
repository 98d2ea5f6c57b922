//! Platform helpers: path expansion and executable lookup.
//!
//! - [`path`] - `~` expansion and relative path resolution
//! - [`command`] - locating external tools on the search path

pub mod command;
pub mod path;

pub use command::resolve_binary;
pub use path::{expand, expand_and_resolve};
