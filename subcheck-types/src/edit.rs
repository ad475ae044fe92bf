use serde::{Deserialize, Serialize};

/// A byte-range replacement in a text file.
///
/// Remediation is expressed as a set of these so that everything outside the
/// edited ranges round-trips byte-for-byte. An insertion is an edit with
/// `start == end`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextEdit {
    pub start: usize,
    pub end: usize,
    pub replacement: String,

    /// Short description of the change, e.g. `WarningLevel=Level4 (Debug|x64)`.
    #[serde(default)]
    pub label: String,
}

impl TextEdit {
    pub fn replace(start: usize, end: usize, replacement: impl Into<String>) -> Self {
        Self {
            start,
            end,
            replacement: replacement.into(),
            label: String::new(),
        }
    }

    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self::replace(at, at, text)
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn is_insertion(&self) -> bool {
        self.start == self.end
    }

    pub fn overlaps(&self, other: &TextEdit) -> bool {
        // Two insertions at one offset are ambiguous; so is an insertion
        // strictly inside a replaced range.
        match (self.is_insertion(), other.is_insertion()) {
            (true, true) => self.start == other.start,
            (true, false) => other.start < self.start && self.start < other.end,
            (false, true) => self.start < other.start && other.start < self.end,
            (false, false) => self.start < other.end && other.start < self.end,
        }
    }
}
