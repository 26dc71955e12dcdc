// 🗂️ Master List - source-list reconciliation against the catalog
//
// Candidate games arrive on curated "source lists" (top-100 rankings,
// award shortlists, friends' recommendations), one YAML file per source.
// This index merges every list into one deduplicated candidate map with
// provenance, marks which candidates are already catalogued, and ranks
// the rest for research triage: the more lists name a game, the sooner
// it should get a proper record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

use crate::catalog::{CatalogStore, LoadWarning};
use crate::record::is_yaml_file;

// ============================================================================
// SOURCE LIST FILES
// ============================================================================

/// One source-list file as it appears on disk.
#[derive(Debug, Deserialize)]
struct SourceList {
    /// Human name of the source; the filename stands in when absent.
    #[serde(default)]
    source: Option<String>,

    #[serde(default)]
    games: Option<Vec<SourceEntry>>,
}

/// One entry inside a source list. Only the id is required; entries
/// without one are skipped.
#[derive(Debug, Deserialize)]
struct SourceEntry {
    #[serde(default)]
    id: Option<String>,

    #[serde(default)]
    name: Option<String>,

    #[serde(default)]
    year: Option<i32>,
}

// ============================================================================
// SOURCE CANDIDATE
// ============================================================================

/// A candidate game merged across all source lists.
#[derive(Debug, Clone, Serialize)]
pub struct SourceCandidate {
    pub id: String,

    /// Display name; falls back to the id when no list provided one.
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,

    /// Which sources named this candidate, in the order the lists were
    /// scanned. One entry per source name, never per file.
    pub sources: Vec<String>,

    pub source_count: usize,

    /// True iff a catalog record with the same id exists.
    pub researched: bool,
}

impl SourceCandidate {
    fn from_entry(id: String, entry: &SourceEntry) -> Self {
        let name = entry.name.clone().unwrap_or_else(|| id.clone());
        SourceCandidate {
            id,
            name,
            year: entry.year,
            sources: Vec::new(),
            source_count: 0,
            researched: false,
        }
    }

    fn add_source(&mut self, source: &str) {
        if !self.sources.iter().any(|s| s == source) {
            self.sources.push(source.to_string());
        }
    }
}

// ============================================================================
// MASTER LIST SNAPSHOT
// ============================================================================

/// Immutable result of one reconciliation pass.
#[derive(Debug, Serialize)]
pub struct MasterListSnapshot {
    pub total: usize,
    pub researched: usize,
    /// Ranked by source count descending, then name ascending.
    pub games: Vec<SourceCandidate>,
    pub warnings: Vec<LoadWarning>,
    pub generated_at: DateTime<Utc>,
}

// ============================================================================
// MASTER LIST INDEX
// ============================================================================

/// Cached reconciliation of all source lists against the catalog.
///
/// Same cooperative-cache contract as the catalog store: writers of list
/// files (or of catalog records, which flip `researched` flags) call
/// `invalidate()` and the next `load()` rebuilds the view.
pub struct MasterListIndex {
    lists_dir: PathBuf,
    catalog: Arc<CatalogStore>,
    cache: RwLock<Option<Arc<MasterListSnapshot>>>,
}

impl MasterListIndex {
    pub fn new(lists_dir: impl Into<PathBuf>, catalog: Arc<CatalogStore>) -> Self {
        MasterListIndex {
            lists_dir: lists_dir.into(),
            catalog,
            cache: RwLock::new(None),
        }
    }

    /// Build (or serve the cached) reconciled master list.
    ///
    /// Never fails: an unreadable lists directory yields an empty
    /// snapshot with a warning, malformed list files are skipped.
    pub fn load(&self) -> Arc<MasterListSnapshot> {
        if let Some(snapshot) = self.cache.read().unwrap().clone() {
            return snapshot;
        }

        let fresh = Arc::new(self.reconcile());

        let mut guard = self.cache.write().unwrap();
        if let Some(existing) = guard.clone() {
            return existing;
        }
        *guard = Some(fresh.clone());
        fresh
    }

    /// Drop the cached snapshot. Does not touch the catalog store's own
    /// cache - invalidate that separately when record files change.
    pub fn invalidate(&self) {
        *self.cache.write().unwrap() = None;
        debug!("master list cache invalidated");
    }

    fn reconcile(&self) -> MasterListSnapshot {
        let mut warnings: Vec<LoadWarning> = Vec::new();
        let mut candidates: Vec<SourceCandidate> = Vec::new();
        // id → position in `candidates`; keeps first-encounter order
        // while merging, final ranking happens after the merge.
        let mut by_id: HashMap<String, usize> = HashMap::new();

        let entries = match fs::read_dir(&self.lists_dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(dir = %self.lists_dir.display(), %err, "lists directory unreadable");
                warnings.push(LoadWarning::new(self.lists_dir.display().to_string(), err));
                return MasterListSnapshot {
                    total: 0,
                    researched: 0,
                    games: candidates,
                    warnings,
                    generated_at: Utc::now(),
                };
            }
        };

        // Deterministic scan order: lexicographic by filename. This
        // fixes both provenance order and first-seen name/year
        // precedence for candidates named by several lists.
        let mut files: Vec<String> = entries
            .flatten()
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| is_yaml_file(name))
            .collect();
        files.sort();

        for file in files {
            let list = match self.parse_list(&file) {
                Ok(list) => list,
                Err(reason) => {
                    warn!(%file, %reason, "skipping source list");
                    warnings.push(LoadWarning::new(file.as_str(), reason));
                    continue;
                }
            };

            let source_name = list.source.clone().unwrap_or_else(|| file.clone());
            let games = match list.games {
                Some(games) => games,
                None => {
                    warn!(%file, "source list has no games array");
                    warnings.push(LoadWarning::new(file.as_str(), "no games array"));
                    continue;
                }
            };

            for entry in games {
                let id = match entry.id.as_deref().map(str::trim) {
                    Some(id) if !id.is_empty() => id.to_string(),
                    _ => continue, // entries without an id are not candidates
                };

                match by_id.get(&id) {
                    Some(&idx) => {
                        // Merge: only provenance grows. The first-seen
                        // name/year stay authoritative.
                        candidates[idx].add_source(&source_name);
                    }
                    None => {
                        let mut candidate = SourceCandidate::from_entry(id.clone(), &entry);
                        candidate.add_source(&source_name);
                        by_id.insert(id, candidates.len());
                        candidates.push(candidate);
                    }
                }
            }
        }

        // Cross-reference against the catalog's identities.
        let known = self.catalog.known_ids();
        for candidate in &mut candidates {
            candidate.source_count = candidate.sources.len();
            candidate.researched = known.contains(&candidate.id);
        }

        // Triage ranking: most-nominated first, then alphabetical.
        candidates.sort_by(|a, b| {
            b.source_count
                .cmp(&a.source_count)
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
                .then_with(|| a.name.cmp(&b.name))
        });

        let total = candidates.len();
        let researched = candidates.iter().filter(|c| c.researched).count();

        debug!(total, researched, warnings = warnings.len(), "master list reconciled");

        MasterListSnapshot {
            total,
            researched,
            games: candidates,
            warnings,
            generated_at: Utc::now(),
        }
    }

    fn parse_list(&self, file: &str) -> Result<SourceList, String> {
        let content =
            fs::read_to_string(self.lists_dir.join(file)).map_err(|e| e.to_string())?;
        serde_yaml::from_str(&content).map_err(|e| e.to_string())
    }
}

// ============================================================================
// TESTS
// ============================================================================
