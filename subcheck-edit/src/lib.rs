//! Edit engine for remediation.
//!
//! Responsibilities:
//! - Validate a set of [`TextEdit`]s against the text they target.
//! - Splice them in (everything outside the edited ranges is untouched).
//! - Persist the result once per file, skipping the write when nothing changed.

mod error;

pub use error::{ConflictError, EditError, EditResult};

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use subcheck_types::edit::TextEdit;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct ApplyOptions {
    /// Compute the new contents but don't write them.
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: Utf8PathBuf,
    pub edits_applied: usize,
    /// False when the edits left the file contents as they were.
    pub changed: bool,
    pub labels: Vec<String>,
}

fn label_of(edit: &TextEdit) -> String {
    if edit.label.is_empty() {
        format!("{}..{}", edit.start, edit.end)
    } else {
        edit.label.clone()
    }
}

/// Apply `edits` to `text`. Identical duplicates are collapsed; any other
/// overlap is a conflict.
pub fn apply_edits(text: &str, edits: &[TextEdit]) -> EditResult<String> {
    let mut ordered: Vec<&TextEdit> = Vec::with_capacity(edits.len());
    for edit in edits {
        let duplicate = ordered.iter().any(|e| {
            e.start == edit.start && e.end == edit.end && e.replacement == edit.replacement
        });
        if !duplicate {
            ordered.push(edit);
        }
    }

    for edit in &ordered {
        if edit.start > edit.end || edit.end > text.len() {
            return Err(ConflictError::OutOfBounds {
                start: edit.start,
                end: edit.end,
                len: text.len(),
            }
            .into());
        }
        for offset in [edit.start, edit.end] {
            if !text.is_char_boundary(offset) {
                return Err(ConflictError::NotCharBoundary { offset }.into());
            }
        }
    }

    for (i, a) in ordered.iter().enumerate() {
        if let Some(b) = ordered[i + 1..].iter().find(|b| a.overlaps(b)) {
            return Err(ConflictError::Overlap {
                first: label_of(a),
                second: label_of(b),
            }
            .into());
        }
    }

    // Back to front so earlier offsets stay valid.
    ordered.sort_by(|a, b| b.start.cmp(&a.start).then(b.end.cmp(&a.end)));
    let mut out = text.to_string();
    for edit in ordered {
        out.replace_range(edit.start..edit.end, &edit.replacement);
    }
    Ok(out)
}

/// Apply `edits` to the file at `root/rel` and write it back once.
pub fn apply_to_file(
    root: &Utf8Path,
    rel: &Utf8Path,
    edits: &[TextEdit],
    opts: &ApplyOptions,
) -> EditResult<FileChange> {
    let abs = if rel.is_absolute() {
        rel.to_path_buf()
    } else {
        root.join(rel)
    };

    let bytes = fs::read(&abs).with_context(|| format!("read {}", abs))?;
    let before = String::from_utf8(bytes).with_context(|| format!("{} is not UTF-8", abs))?;
    let after = apply_edits(&before, edits)?;

    let changed = after != before;
    if changed && !opts.dry_run {
        fs::write(&abs, &after).with_context(|| format!("write {}", abs))?;
    }
    debug!(path = %abs, edits = edits.len(), changed, dry_run = opts.dry_run, "applied edits");

    Ok(FileChange {
        path: rel.to_path_buf(),
        edits_applied: edits.len(),
        changed,
        labels: edits.iter().map(label_of).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn splices_back_to_front() {
        let text = "<A>1</A><B>2</B>";
        let edits = vec![TextEdit::replace(3, 4, "one"), TextEdit::replace(11, 12, "two")];
        assert_eq!(apply_edits(text, &edits).unwrap(), "<A>one</A><B>two</B>");
    }

    #[test]
    fn identical_duplicates_collapse() {
        let edits = vec![TextEdit::insert(2, "x"), TextEdit::insert(2, "x")];
        assert_eq!(apply_edits("ab", &edits).unwrap(), "abx");
    }

    #[test]
    fn conflicting_insertions_are_rejected() {
        let edits = vec![
            TextEdit::insert(2, "x").with_label("first"),
            TextEdit::insert(2, "y").with_label("second"),
        ];
        let err = apply_edits("ab", &edits).unwrap_err();
        assert!(err.is_conflict());
        assert!(err.to_string().contains("first and second"));
    }

    #[test]
    fn out_of_range_and_char_boundaries() {
        assert!(apply_edits("ab", &[TextEdit::replace(1, 5, "x")]).is_err());
        assert!(apply_edits("é", &[TextEdit::insert(1, "x")]).is_err());
    }

    #[test]
    fn empty_edit_set_is_identity() {
        assert_eq!(apply_edits("\u{feff}<Project/>", &[]).unwrap(), "\u{feff}<Project/>");
    }
}
