//! Error types for the catalog store and importer
//!
//! The costing engine itself never fails; these cover storage and import.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored row that cannot be turned back into a model
    #[error("Malformed data for item '{item}': {reason}")]
    Malformed { item: String, reason: String },

    #[error("Item not found: {0}")]
    ItemNotFound(String),

    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
