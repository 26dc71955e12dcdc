// Game Shelf - Core Library
// File-backed board-game catalog with source-list reconciliation.
// Exposes the stores for use in the CLI, the API server, and tests.

pub mod catalog;
pub mod images;
pub mod master_list;
pub mod record;

// Re-export commonly used types
pub use catalog::{CatalogSnapshot, CatalogStore, LoadWarning};
pub use images::ImageLibrary;
pub use master_list::{MasterListIndex, MasterListSnapshot, SourceCandidate};
pub use record::{load_record, Game, RecordError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
