//! Wallpaper directory scanning and fuzzy search.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use natord::compare;

use super::types::WallpaperEntry;
use crate::platform::path::is_hidden;

/// Number of leading bytes read when sniffing extension-less files.
const SNIFF_LEN: usize = 32;

/// Returns whether `path` looks like an image.
///
/// Files with an extension are classified by it alone. Extension-less files
/// are sniffed by their magic bytes.
#[must_use]
pub fn is_image(path: &Path) -> bool {
    if path.extension().is_some() {
        return image::ImageFormat::from_path(path).is_ok();
    }

    let mut header = Vec::with_capacity(SNIFF_LEN);
    let read = fs::File::open(path)
        .and_then(|file| file.take(SNIFF_LEN as u64).read_to_end(&mut header));

    read.is_ok() && image::guess_format(&header).is_ok()
}

/// Recursively collects image files under `root`.
///
/// Files directly in `root` are at depth 0; subdirectories are entered while
/// their depth is at most `max_depth`. A missing or unreadable root yields no
/// entries. Results are naturally sorted by path.
#[must_use]
pub fn scan(root: &Path, max_depth: usize, include_hidden: bool) -> Vec<WallpaperEntry> {
    let mut images = Vec::new();
    collect(root, 0, max_depth, include_hidden, &mut images);

    images.sort_by(|a, b| compare(a.to_string_lossy().as_ref(), b.to_string_lossy().as_ref()));
    images.into_iter().map(WallpaperEntry::from_path).collect()
}

fn collect(dir: &Path, depth: usize, max_depth: usize, include_hidden: bool, out: &mut Vec<PathBuf>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            if depth == 0 {
                tracing::warn!(path = %dir.display(), error = %err, "cannot read wallpaper directory");
            }
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if !include_hidden && is_hidden(&path) {
            continue;
        }

        if path.is_dir() {
            if depth < max_depth {
                collect(&path, depth + 1, max_depth, include_hidden, out);
            }
        } else if path.is_file() && is_image(&path) {
            out.push(path);
        }
    }
}

/// Searchable snapshot of the scanned wallpapers.
///
/// The snapshot is immutable; [`WallpaperIndex::replace`] swaps it and
/// rebuilds the search keys in full.
pub struct WallpaperIndex {
    entries: Vec<WallpaperEntry>,
    keys: Vec<String>,
    matcher: SkimMatcherV2,
}

impl Default for WallpaperIndex {
    fn default() -> Self { Self::new(Vec::new()) }
}

impl std::fmt::Debug for WallpaperIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WallpaperIndex").field("entries", &self.entries.len()).finish()
    }
}

impl WallpaperIndex {
    #[must_use]
    pub fn new(entries: Vec<WallpaperEntry>) -> Self {
        let mut index = Self {
            entries: Vec::new(),
            keys: Vec::new(),
            matcher: SkimMatcherV2::default().ignore_case(),
        };
        index.replace(entries);
        index
    }

    /// Replaces the entry snapshot and rebuilds the search keys.
    pub fn replace(&mut self, entries: Vec<WallpaperEntry>) {
        self.keys = entries.iter().map(|entry| entry.display_name.clone()).collect();
        self.entries = entries;
    }

    #[must_use]
    pub fn entries(&self) -> &[WallpaperEntry] { &self.entries }

    #[must_use]
    pub fn len(&self) -> usize { self.entries.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Fuzzy-matches `query` against display names, best match first.
    ///
    /// Equal scores keep scan order. A blank query matches nothing.
    #[must_use]
    pub fn search(&self, query: &str, limit: usize) -> Vec<WallpaperEntry> {
        let query = query.trim();
        if query.is_empty() || limit == 0 {
            return Vec::new();
        }

        let mut scored: Vec<(i64, usize)> = self
            .keys
            .iter()
            .enumerate()
            .filter_map(|(idx, key)| self.matcher.fuzzy_match(key, query).map(|score| (score, idx)))
            .collect();

        // Stable sort keeps scan order for ties.
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        scored.into_iter().take(limit).map(|(_, idx)| self.entries[idx].clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n', 0, 0, 0, 13];

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    fn names(entries: &[WallpaperEntry]) -> Vec<&str> {
        entries.iter().map(|entry| entry.display_name.as_str()).collect()
    }

    #[test]
    fn test_is_image_by_extension() {
        assert!(is_image(Path::new("a.jpg")));
        assert!(is_image(Path::new("a.JPEG")));
        assert!(is_image(Path::new("a.png")));
        assert!(is_image(Path::new("a.webp")));
        assert!(!is_image(Path::new("a.txt")));
        assert!(!is_image(Path::new("a.jpg.tar")));
    }

    #[test]
    fn test_is_image_sniffs_extensionless_files() {
        let dir = tempfile::tempdir().unwrap();
        let png = dir.path().join("noext");
        fs::write(&png, PNG_MAGIC).unwrap();
        let text = dir.path().join("README");
        fs::write(&text, b"hello world").unwrap();

        assert!(is_image(&png));
        assert!(!is_image(&text));
    }

    #[test]
    fn test_scan_missing_root_is_empty() {
        assert!(scan(Path::new("/nonexistent/wallpapers/dir"), 2, false).is_empty());
    }

    #[test]
    fn test_scan_filters_sorts_and_respects_depth() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("wall10.png"));
        touch(&root.join("wall2.png"));
        touch(&root.join("notes.txt"));
        touch(&root.join(".hidden.png"));
        touch(&root.join(".secret/inside.png"));
        touch(&root.join("a/one.jpg"));
        touch(&root.join("a/b/two.jpg"));
        touch(&root.join("a/b/c/three.jpg"));

        let entries = scan(root, 2, false);
        assert_eq!(names(&entries), ["two.jpg", "one.jpg", "wall2.png", "wall10.png"]);

        let shallow = scan(root, 0, false);
        assert_eq!(names(&shallow), ["wall2.png", "wall10.png"]);

        let hidden = scan(root, 0, true);
        assert_eq!(names(&hidden), [".hidden.png", "wall2.png", "wall10.png"]);
    }

    #[test]
    fn test_search_blank_query_is_empty() {
        let index = WallpaperIndex::new(vec![WallpaperEntry::from_path("/w/forest.png")]);
        assert!(index.search("", 10).is_empty());
        assert!(index.search("   ", 10).is_empty());
    }

    #[test]
    fn test_search_respects_limit() {
        let entries = (0..10).map(|i| WallpaperEntry::from_path(format!("/w/forest-{i}.png")));
        let index = WallpaperIndex::new(entries.collect());
        assert_eq!(index.search("forest", 3).len(), 3);
    }

    #[test]
    fn test_search_is_case_insensitive_and_ranked() {
        let index = WallpaperIndex::new(vec![
            WallpaperEntry::from_path("/w/mountain-lake.png"),
            WallpaperEntry::from_path("/w/Lake.png"),
            WallpaperEntry::from_path("/w/desert.png"),
        ]);

        let results = index.search("LAKE", 10);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|entry| entry.display_name.to_lowercase().contains("lake")));
        assert!(index.search("zzz", 10).is_empty());
    }

    #[test]
    fn test_replace_rebuilds_search() {
        let mut index = WallpaperIndex::new(vec![WallpaperEntry::from_path("/w/old.png")]);
        index.replace(vec![WallpaperEntry::from_path("/w/new.png")]);

        assert!(index.search("old", 10).is_empty());
        assert_eq!(names(&index.search("new", 10)), ["new.png"]);
        assert_eq!(index.len(), 1);
    }
}
