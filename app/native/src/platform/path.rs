//! Shell-like path expansion for user-supplied locations.
//!
//! Settings and configuration files carry paths such as `~/Pictures/Wallpapers`
//! or `bin/chromash`; these helpers turn them into usable filesystem paths.

use std::path::{Path, PathBuf};

/// Expands a leading `~` to the home directory.
///
/// Surrounding whitespace is trimmed; an empty input yields an empty path.
/// Relative paths are returned unchanged.
#[must_use]
pub fn expand(path: &str) -> PathBuf {
    let path = path.trim();

    if path.is_empty() {
        return PathBuf::new();
    }

    PathBuf::from(shellexpand::tilde(path).as_ref())
}

/// Expands `~` and resolves relative paths against `base_dir`.
#[must_use]
pub fn expand_and_resolve(path: &str, base_dir: &Path) -> PathBuf {
    let expanded = expand(path);

    if expanded.as_os_str().is_empty() || expanded.is_absolute() {
        return expanded;
    }

    base_dir.join(expanded)
}

/// Returns `true` when the final component of `path` is dot-prefixed.
#[must_use]
pub fn is_hidden(path: &Path) -> bool {
    path.file_name().is_some_and(|name| name.to_string_lossy().starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_empty_and_whitespace() {
        assert_eq!(expand(""), PathBuf::new());
        assert_eq!(expand("   "), PathBuf::new());
    }

    #[test]
    fn test_expand_keeps_absolute_and_relative() {
        assert_eq!(expand("/srv/walls"), PathBuf::from("/srv/walls"));
        assert_eq!(expand("walls/nature"), PathBuf::from("walls/nature"));
    }

    #[test]
    fn test_expand_tilde() {
        let result = expand("~/Pictures/Wallpapers");
        assert!(!result.to_string_lossy().starts_with('~'));
        assert!(result.ends_with("Pictures/Wallpapers"));
    }

    #[test]
    fn test_expand_and_resolve_relative() {
        let base = Path::new("/home/user/.config/wallstore");
        assert_eq!(
            expand_and_resolve(" bin/chromash ", base),
            PathBuf::from("/home/user/.config/wallstore/bin/chromash")
        );
    }

    #[test]
    fn test_expand_and_resolve_absolute_and_empty() {
        let base = Path::new("/base");
        assert_eq!(expand_and_resolve("/usr/bin/tool", base), PathBuf::from("/usr/bin/tool"));
        assert_eq!(expand_and_resolve("", base), PathBuf::new());
    }

    #[test]
    fn test_is_hidden() {
        assert!(is_hidden(Path::new("/walls/.cache")));
        assert!(!is_hidden(Path::new("/walls/.cache/forest.png")));
        assert!(!is_hidden(Path::new("/")));
    }
}
