// 🎲 Game Records - YAML record files → Game values
//
// Every catalogued game lives in its own YAML file under the games
// directory. Records are parsed independently: one broken file never
// takes down the rest of the catalog.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

// ============================================================================
// RECORD ERRORS
// ============================================================================

/// Why a single record file could not become a catalog entry.
///
/// These never propagate past the load path - the store converts them
/// into warnings and keeps going.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("record has no id")]
    MissingId,
}

// ============================================================================
// GAME
// ============================================================================

/// One catalogued board game.
///
/// Everything except `id` is optional - record files are hand-edited and
/// grow fields over time. Unknown keys in the YAML are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    /// Unique identity (slug). The record filename usually matches it,
    /// but the field inside the file is authoritative.
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// First publication year. Needed (together with `name`) for the
    /// cover-image filename convention.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,

    /// Other names the game is known under (translations, reprints).
    #[serde(default)]
    pub alternate_names: Vec<String>,

    #[serde(default)]
    pub designer: Vec<String>,

    #[serde(default)]
    pub publisher: Vec<String>,

    #[serde(default)]
    pub categories: Vec<String>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playtime_minutes: Option<u32>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_age: Option<u8>,

    /// Player counts the box supports.
    #[serde(default)]
    pub possible_counts: Vec<u32>,

    /// Player counts the game is actually good at.
    #[serde(default)]
    pub true_counts: Vec<u32>,

    // ========================================================================
    // RATINGS / CLASSIFICATION (free-form curation fields)
    // ========================================================================
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules_complexity: Option<f64>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategic_depth: Option<f64>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feel: Option<String>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<String>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affinity: Option<String>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hotness: Option<f64>,

    // ========================================================================
    // DERIVED STATE (computed at load time, never read from the file)
    // ========================================================================
    /// Whether a cover image exists for this game. Computed against the
    /// image directory on every catalog (re)load.
    #[serde(skip_deserializing)]
    pub has_image: bool,
}

impl Game {
    /// Key used for alphabetical ordering and display.
    ///
    /// Falls back to the id when a record has no name, so nameless
    /// records still sort deterministically.
    pub fn sort_key(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// Parse one record file into a `Game`.
///
/// A record without an `id` field (or with an empty one) is rejected:
/// identity is the only required field.
pub fn load_record(path: &Path) -> Result<Game, RecordError> {
    let content = fs::read_to_string(path)?;
    let game: Game = serde_yaml::from_str(&content)?;

    if game.id.trim().is_empty() {
        return Err(RecordError::MissingId);
    }

    Ok(game)
}

/// True if a directory entry looks like a record/list file.
pub fn is_yaml_file(name: &str) -> bool {
    name.ends_with(".yaml") || name.ends_with(".yml")
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_record(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_parse_full_record() {
        let file = write_record(
            r#"
id: brass-birmingham
name: "Brass: Birmingham"
year: 2018
designer:
  - Gavan Brown
  - Matt Tolman
publisher:
  - Roxley
categories:
  - economic
description: Canal-era industry building.
playtime_minutes: 120
min_age: 14
possible_counts: [2, 3, 4]
true_counts: [3, 4]
rules_complexity: 3.9
strategic_depth: 4.5
feel: heavy euro
hotness: 8.7
"#,
        );

        let game = load_record(file.path()).unwrap();
        assert_eq!(game.id, "brass-birmingham");
        assert_eq!(game.name.as_deref(), Some("Brass: Birmingham"));
        assert_eq!(game.year, Some(2018));
        assert_eq!(game.designer.len(), 2);
        assert_eq!(game.true_counts, vec![3, 4]);
        assert_eq!(game.rules_complexity, Some(3.9));
        assert!(!game.has_image);

        println!("✅ Full record parsed");
    }

    #[test]
    fn test_minimal_record_id_only() {
        let file = write_record("id: mystery-game\n");
        let game = load_record(file.path()).unwrap();

        assert_eq!(game.id, "mystery-game");
        assert!(game.name.is_none());
        assert!(game.designer.is_empty());
        assert!(!game.has_image);
    }

    #[test]
    fn test_missing_id_rejected() {
        let file = write_record("name: Nameless\nyear: 2001\n");
        let err = load_record(file.path()).unwrap_err();
        assert!(matches!(err, RecordError::MissingId));
    }

    #[test]
    fn test_malformed_yaml_rejected() {
        let file = write_record("id: [unclosed\n  name: broken");
        let err = load_record(file.path()).unwrap_err();
        assert!(matches!(err, RecordError::Parse(_)));
    }

    #[test]
    fn test_has_image_in_file_is_ignored() {
        // has_image is derived state; a stray value in the file must not
        // leak through.
        let file = write_record("id: go\nname: Go\nhas_image: true\n");
        let game = load_record(file.path()).unwrap();
        assert!(!game.has_image);
    }

    #[test]
    fn test_sort_key_falls_back_to_id() {
        let file = write_record("id: nameless-slug\n");
        let game = load_record(file.path()).unwrap();
        assert_eq!(game.sort_key(), "nameless-slug");

        let file = write_record("id: go\nname: Go\n");
        let game = load_record(file.path()).unwrap();
        assert_eq!(game.sort_key(), "Go");
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let file = write_record("id: go\nname: Go\nbgg_rank: 12\nshelf_row: 3\n");
        let game = load_record(file.path()).unwrap();
        assert_eq!(game.id, "go");
    }
}
