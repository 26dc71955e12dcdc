// 📚 Catalog Store - cached, file-backed game catalog
//
// Loads every record file in the games directory into one in-memory
// snapshot, enriches each game with its cover-image status, and serves
// point lookups. The cache is cooperative: anything that writes a record
// or image file must call `invalidate()` before the next read is
// expected to see the change. There is no filesystem watching.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

use crate::images::ImageLibrary;
use crate::record::{is_yaml_file, load_record, Game};

// ============================================================================
// LOAD WARNINGS
// ============================================================================

/// One per-file problem encountered during a load.
///
/// The load itself never fails; callers inspect these to decide whether
/// anything is worth surfacing.
#[derive(Debug, Clone, Serialize)]
pub struct LoadWarning {
    pub file: String,
    pub reason: String,
}

impl LoadWarning {
    pub fn new(file: impl Into<String>, reason: impl ToString) -> Self {
        LoadWarning {
            file: file.into(),
            reason: reason.to_string(),
        }
    }
}

// ============================================================================
// CATALOG SNAPSHOT
// ============================================================================

/// Immutable result of one full catalog scan.
///
/// Replaced wholesale on invalidation - readers holding an `Arc` keep a
/// consistent view even while a fresh scan swaps in behind them.
#[derive(Debug, Serialize)]
pub struct CatalogSnapshot {
    /// All games, sorted by name (case-insensitive, id fallback).
    pub games: Vec<Game>,
    pub warnings: Vec<LoadWarning>,
    pub loaded_at: DateTime<Utc>,
}

impl CatalogSnapshot {
    /// Games without a cover image, in catalog (name) order.
    pub fn missing_images(&self) -> Vec<&Game> {
        self.games.iter().filter(|g| !g.has_image).collect()
    }
}

// ============================================================================
// CATALOG STORE
// ============================================================================

/// File-backed catalog with a process-wide cooperative cache.
pub struct CatalogStore {
    games_dir: PathBuf,
    images: ImageLibrary,
    cache: RwLock<Option<Arc<CatalogSnapshot>>>,
}

impl CatalogStore {
    pub fn new(games_dir: impl Into<PathBuf>, images: ImageLibrary) -> Self {
        CatalogStore {
            games_dir: games_dir.into(),
            images,
            cache: RwLock::new(None),
        }
    }

    pub fn games_dir(&self) -> &Path {
        &self.games_dir
    }

    pub fn images(&self) -> &ImageLibrary {
        &self.images
    }

    /// Load the full catalog, scanning the games directory on the first
    /// call and serving the cached snapshot afterwards.
    ///
    /// Never fails: an unreadable directory yields an empty snapshot
    /// with a warning, and broken record files are skipped one by one.
    pub fn load_all(&self) -> Arc<CatalogSnapshot> {
        if let Some(snapshot) = self.cache.read().unwrap().clone() {
            return snapshot;
        }

        let fresh = Arc::new(self.scan());

        let mut guard = self.cache.write().unwrap();
        // Another caller may have filled the cache while we were
        // scanning; keep theirs so repeated loads stay pointer-equal.
        if let Some(existing) = guard.clone() {
            return existing;
        }
        *guard = Some(fresh.clone());
        fresh
    }

    /// Point lookup by identity. Linear scan - the catalog is tens to
    /// low thousands of games, a secondary index is not worth carrying.
    pub fn get_by_id(&self, id: &str) -> Option<Game> {
        self.load_all().games.iter().find(|g| g.id == id).cloned()
    }

    /// The cover-image filename for a game, if the game exists and an
    /// image matching the `"{name} ({year})"` convention is present.
    pub fn image_file_for(&self, id: &str) -> Option<String> {
        let game = self.get_by_id(id)?;
        self.images.find_match(game.name.as_deref(), game.year)
    }

    /// The set of catalogued identities, for cross-referencing.
    pub fn known_ids(&self) -> HashSet<String> {
        self.load_all()
            .games
            .iter()
            .map(|g| g.id.clone())
            .collect()
    }

    /// Drop the cached snapshot. The next `load_all()` rescans.
    /// Idempotent - invalidating an empty cache is a no-op.
    pub fn invalidate(&self) {
        *self.cache.write().unwrap() = None;
        debug!("catalog cache invalidated");
    }

    /// One full pass over the games directory.
    fn scan(&self) -> CatalogSnapshot {
        let mut games: Vec<Game> = Vec::new();
        let mut warnings: Vec<LoadWarning> = Vec::new();
        // id → filename of the record that claimed it first
        let mut claimed: HashMap<String, String> = HashMap::new();

        let entries = match fs::read_dir(&self.games_dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(dir = %self.games_dir.display(), %err, "games directory unreadable");
                warnings.push(LoadWarning::new(self.games_dir.display().to_string(), err));
                return CatalogSnapshot {
                    games,
                    warnings,
                    loaded_at: Utc::now(),
                };
            }
        };

        // Lexicographic filename order makes the scan (and therefore
        // duplicate-id precedence) deterministic across filesystems.
        let mut files: Vec<String> = entries
            .flatten()
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| is_yaml_file(name))
            .collect();
        files.sort();

        for file in files {
            match load_record(&self.games_dir.join(&file)) {
                Ok(mut game) => {
                    if let Some(first) = claimed.get(&game.id) {
                        warn!(%file, id = %game.id, kept = %first, "duplicate game id, keeping first-seen record");
                        warnings.push(LoadWarning::new(
                            file.as_str(),
                            format!("duplicate id '{}' (already claimed by {})", game.id, first),
                        ));
                        continue;
                    }

                    game.has_image = self.images.has_image(game.name.as_deref(), game.year);
                    claimed.insert(game.id.clone(), file);
                    games.push(game);
                }
                Err(err) => {
                    warn!(%file, %err, "skipping unparseable record");
                    warnings.push(LoadWarning::new(file.as_str(), err));
                }
            }
        }

        games.sort_by(|a, b| {
            let (ka, kb) = (a.sort_key(), b.sort_key());
            ka.to_lowercase()
                .cmp(&kb.to_lowercase())
                .then_with(|| ka.cmp(kb))
        });

        debug!(games = games.len(), warnings = warnings.len(), "catalog scan complete");

        CatalogSnapshot {
            games,
            warnings,
            loaded_at: Utc::now(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Fixture: a games dir and an images dir under one temp root.
    fn store_with(records: &[(&str, &str)], images: &[&str]) -> (TempDir, CatalogStore) {
        let root = TempDir::new().unwrap();
        let games_dir = root.path().join("games");
        let images_dir = root.path().join("images");
        fs::create_dir(&games_dir).unwrap();
        fs::create_dir(&images_dir).unwrap();

        for (file, content) in records {
            fs::write(games_dir.join(file), content).unwrap();
        }
        for file in images {
            fs::write(images_dir.join(file), b"img").unwrap();
        }

        let store = CatalogStore::new(games_dir, ImageLibrary::new(images_dir));
        (root, store)
    }

    #[test]
    fn test_end_to_end_ant_before_bee_with_image() {
        let (_root, store) = store_with(
            &[
                ("bee.yaml", "id: bee\nname: Bee\nyear: 2019\n"),
                ("ant.yaml", "id: ant\nname: Ant\nyear: 2020\n"),
            ],
            &["Bee (2019).png"],
        );

        let snapshot = store.load_all();
        assert_eq!(snapshot.games.len(), 2);
        assert_eq!(snapshot.games[0].id, "ant");
        assert!(!snapshot.games[0].has_image);
        assert_eq!(snapshot.games[1].id, "bee");
        assert!(snapshot.games[1].has_image);
        assert!(snapshot.warnings.is_empty());

        println!("✅ End-to-end: Ant before Bee, Bee has image");
    }

    #[test]
    fn test_load_is_idempotent_until_invalidated() {
        let (_root, store) = store_with(&[("go.yaml", "id: go\nname: Go\n")], &[]);

        let first = store.load_all();
        let second = store.load_all();
        assert!(Arc::ptr_eq(&first, &second));

        store.invalidate();
        let third = store.load_all();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(third.games.len(), 1);
    }

    #[test]
    fn test_new_record_visible_only_after_invalidate() {
        let (root, store) = store_with(&[("go.yaml", "id: go\nname: Go\n")], &[]);

        assert_eq!(store.load_all().games.len(), 1);

        fs::write(
            root.path().join("games").join("chess.yaml"),
            "id: chess\nname: Chess\n",
        )
        .unwrap();

        // Cooperative cache: without invalidation the write is invisible.
        assert_eq!(store.load_all().games.len(), 1);

        store.invalidate();
        assert_eq!(store.load_all().games.len(), 2);

        println!("✅ Write-then-invalidate contract holds");
    }

    #[test]
    fn test_sort_order_case_insensitive() {
        let (_root, store) = store_with(
            &[
                ("a.yaml", "id: a\nname: Zeta\n"),
                ("b.yaml", "id: b\nname: alpha2\n"),
                ("c.yaml", "id: c\nname: Alpha\n"),
            ],
            &[],
        );

        let names: Vec<String> = store
            .load_all()
            .games
            .iter()
            .map(|g| g.name.clone().unwrap())
            .collect();
        assert_eq!(names, vec!["Alpha", "alpha2", "Zeta"]);
    }

    #[test]
    fn test_missing_directory_yields_empty_snapshot() {
        let store = CatalogStore::new(
            "/no/such/games/dir",
            ImageLibrary::new("/no/such/images/dir"),
        );

        let snapshot = store.load_all();
        assert!(snapshot.games.is_empty());
        assert_eq!(snapshot.warnings.len(), 1);
    }

    #[test]
    fn test_broken_record_skipped_with_warning() {
        let (_root, store) = store_with(
            &[
                ("good.yaml", "id: good\nname: Good Game\n"),
                ("broken.yaml", "id: [not\n  valid yaml"),
                ("anonymous.yaml", "name: No Identity\n"),
            ],
            &[],
        );

        let snapshot = store.load_all();
        assert_eq!(snapshot.games.len(), 1);
        assert_eq!(snapshot.games[0].id, "good");
        assert_eq!(snapshot.warnings.len(), 2);
    }

    #[test]
    fn test_duplicate_id_first_file_wins() {
        let (_root, store) = store_with(
            &[
                ("a-first.yaml", "id: go\nname: Go (first)\n"),
                ("b-second.yaml", "id: go\nname: Go (second)\n"),
            ],
            &[],
        );

        let snapshot = store.load_all();
        assert_eq!(snapshot.games.len(), 1);
        assert_eq!(snapshot.games[0].name.as_deref(), Some("Go (first)"));
        assert_eq!(snapshot.warnings.len(), 1);
        assert!(snapshot.warnings[0].reason.contains("duplicate id"));
    }

    #[test]
    fn test_nameless_record_loads_without_image() {
        let (_root, store) = store_with(
            &[("mystery.yaml", "id: mystery\nyear: 1999\n")],
            &["mystery (1999).png"],
        );

        let game = store.get_by_id("mystery").unwrap();
        // No name means the image convention can never match.
        assert!(!game.has_image);
        assert_eq!(store.image_file_for("mystery"), None);
    }

    #[test]
    fn test_get_by_id_exact_match() {
        let (_root, store) = store_with(&[("go.yaml", "id: go\nname: Go\n")], &[]);

        assert!(store.get_by_id("go").is_some());
        assert!(store.get_by_id("GO").is_none());
        assert!(store.get_by_id("chess").is_none());
    }

    #[test]
    fn test_image_file_for_resolves_filename() {
        let (_root, store) = store_with(
            &[("go.yaml", "id: go\nname: Go\nyear: 2020\n")],
            &["GO (2020).JPG"],
        );

        assert_eq!(store.image_file_for("go").as_deref(), Some("GO (2020).JPG"));
        assert_eq!(store.image_file_for("chess"), None);
    }

    #[test]
    fn test_missing_images_lists_uncovered_games_in_order() {
        let (_root, store) = store_with(
            &[
                ("ant.yaml", "id: ant\nname: Ant\nyear: 2020\n"),
                ("bee.yaml", "id: bee\nname: Bee\nyear: 2019\n"),
                ("cow.yaml", "id: cow\nname: Cow\nyear: 2021\n"),
            ],
            &["Bee (2019).png"],
        );

        let snapshot = store.load_all();
        let missing: Vec<&str> = snapshot
            .missing_images()
            .iter()
            .map(|g| g.id.as_str())
            .collect();
        assert_eq!(missing, vec!["ant", "cow"]);

        println!("✅ Missing-image report: ant and cow, catalog order");
    }

    #[test]
    fn test_known_ids() {
        let (_root, store) = store_with(
            &[
                ("ant.yaml", "id: ant\nname: Ant\n"),
                ("bee.yaml", "id: bee\nname: Bee\n"),
            ],
            &[],
        );

        let ids = store.known_ids();
        assert!(ids.contains("ant"));
        assert!(ids.contains("bee"));
        assert_eq!(ids.len(), 2);
    }
}
