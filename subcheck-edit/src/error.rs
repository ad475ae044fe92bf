//! Error types for subcheck-edit.
//!
//! Conflicts are problems with the edit set itself (overlapping or
//! out-of-range edits); runtime errors are I/O and encoding failures.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EditError {
    #[error("edit conflict: {0}")]
    Conflict(#[from] ConflictError),

    #[error("runtime error: {0}")]
    Runtime(#[from] anyhow::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConflictError {
    #[error("edits {first} and {second} overlap")]
    Overlap { first: String, second: String },

    #[error("edit {start}..{end} is outside a {len}-byte file")]
    OutOfBounds { start: usize, end: usize, len: usize },

    #[error("edit boundary {offset} splits a UTF-8 character")]
    NotCharBoundary { offset: usize },
}

impl EditError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, EditError::Conflict(_))
    }
}

pub type EditResult<T> = Result<T, EditError>;
