// 🖼️ Image Library - cover images keyed by filename convention
//
// Cover images live in a flat directory and are associated with games by
// name, not by a database: a game named "Go" from 2020 matches any file
// whose stem equals "Go (2020)" case-insensitively, whatever the
// extension. This is a derived index - nothing is persisted.

use std::fs;
use std::path::{Path, PathBuf};

/// Filename-convention index over the cover image directory.
///
/// Matching is recomputed from a fresh directory listing on every call;
/// callers that want caching get it from the catalog store's snapshot.
#[derive(Debug, Clone)]
pub struct ImageLibrary {
    dir: PathBuf,
}

impl ImageLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        ImageLibrary { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The expected image stem for a game: `"{name} ({year})"`.
    ///
    /// Both parts are required by the convention - a record missing
    /// either can never have a matching image.
    pub fn expected_basename(name: Option<&str>, year: Option<i32>) -> Option<String> {
        match (name, year) {
            (Some(name), Some(year)) => Some(format!("{} ({})", name, year)),
            _ => None,
        }
    }

    /// Find the first image file matching a game, ignoring case and
    /// extension. Returns the filename inside the image directory.
    ///
    /// An unreadable image directory reads as "no images" - the catalog
    /// must stay usable without it.
    pub fn find_match(&self, name: Option<&str>, year: Option<i32>) -> Option<String> {
        let expected = Self::expected_basename(name, year)?.to_lowercase();

        let entries = fs::read_dir(&self.dir).ok()?;
        for entry in entries.flatten() {
            let filename = entry.file_name();
            let filename = filename.to_string_lossy();
            let stem = Path::new(filename.as_ref())
                .file_stem()
                .map(|s| s.to_string_lossy().to_lowercase());

            if stem.as_deref() == Some(expected.as_str()) {
                return Some(filename.into_owned());
            }
        }

        None
    }

    /// Does any cover image exist for this (name, year)?
    pub fn has_image(&self, name: Option<&str>, year: Option<i32>) -> bool {
        self.find_match(name, year).is_some()
    }

    /// Absolute-ish path of a file inside the image directory.
    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }
}

// ============================================================================
// TESTS
// ============================================================================
