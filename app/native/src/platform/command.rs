use std::env;
use std::path::{Path, PathBuf};

/// Resolve the absolute path to an executable binary.
///
/// Absolute (or `~`-prefixed) names are checked as-is. Bare names are searched in:
/// 1. Directories listed in `WALLSTORE_EXTRA_PATHS` (colon-separated).
/// 2. The current process `PATH`.
/// 3. Common per-user install locations (`~/.local/bin`, `~/.cargo/bin`, `~/bin`).
/// 4. System fallbacks (`/usr/local/bin`, `/usr/bin`).
///
/// # Errors
///
/// Returns a descriptive message when the binary cannot be found or is not executable.
pub fn resolve_binary(binary: &str) -> Result<PathBuf, String> {
    if binary.trim().is_empty() {
        return Err("Binary name cannot be empty".to_string());
    }

    let candidate = super::path::expand(binary);
    if candidate.is_absolute() {
        return if is_executable(&candidate) {
            Ok(candidate)
        } else {
            Err(format!("Binary at {} is not executable", candidate.display()))
        };
    }

    search_paths()
        .into_iter()
        .filter(|directory| !directory.as_os_str().is_empty())
        .map(|directory| directory.join(&candidate))
        .find(|path| is_executable(path))
        .ok_or_else(|| format!("Unable to locate executable '{binary}' in known search paths"))
}

/// Builds the ordered list of directories searched by [`resolve_binary`].
fn search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(extra) = env::var("WALLSTORE_EXTRA_PATHS") {
        paths.extend(extra.split(':').map(PathBuf::from));
    }

    if let Some(path_var) = env::var_os("PATH") {
        paths.extend(env::split_paths(&path_var));
    }

    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".local/bin"));
        paths.push(home.join(".cargo/bin"));
        paths.push(home.join("bin"));
    }

    paths.extend([PathBuf::from("/usr/local/bin"), PathBuf::from("/usr/bin")]);
    paths
}

fn is_executable(path: &Path) -> bool {
    let Ok(metadata) = std::fs::metadata(path) else {
        return false;
    };

    if !metadata.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o111 != 0
    }

    #[cfg(not(unix))]
    {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::resolve_binary;

    #[test]
    fn returns_err_for_empty_binary() {
        assert!(resolve_binary("").is_err());
        assert!(resolve_binary("  ").is_err());
    }

    #[test]
    fn resolve_binary_finds_system_binary() {
        if cfg!(unix) {
            let path = resolve_binary("sh").expect("sh should exist on unix");
            assert!(path.exists());
            assert!(path.ends_with("sh"));
        }
    }

    #[test]
    fn resolve_binary_fails_for_nonexistent() {
        assert!(resolve_binary("nonexistent_binary_12345").is_err());
    }

    #[test]
    fn resolve_binary_rejects_non_executable_absolute_path() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = resolve_binary(&file.path().to_string_lossy()).unwrap_err();
        assert!(err.contains("not executable"));
    }
}
