use anyhow::Context;
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use fs_err as fs;
use subcheck_types::edit::TextEdit;

/// Read-only access to a staged submission tree.
///
/// Paths are relative to [`TreeView::root`]. Rules only go through this trait
/// so they can be tested against an in-memory tree.
pub trait TreeView {
    fn root(&self) -> &Utf8Path;

    fn read_to_string(&self, rel: &Utf8Path) -> anyhow::Result<String>;

    fn exists(&self, rel: &Utf8Path) -> bool;

    /// Names of the immediate subdirectories of `rel`.
    fn subdirectories(&self, rel: &Utf8Path) -> anyhow::Result<Vec<String>>;
}

/// Receives remediation edits for a project once all of its configurations
/// have been evaluated.
pub trait ProjectSink {
    fn persist(&mut self, project: &Utf8Path, edits: &[TextEdit]) -> anyhow::Result<()>;
}

/// File-system backed `TreeView`.
#[derive(Debug, Clone)]
pub struct FsTreeView {
    root: Utf8PathBuf,
}

impl FsTreeView {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    fn abs(&self, rel: &Utf8Path) -> Utf8PathBuf {
        if rel.is_absolute() {
            rel.to_path_buf()
        } else {
            self.root.join(rel)
        }
    }
}

impl TreeView for FsTreeView {
    fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn read_to_string(&self, rel: &Utf8Path) -> anyhow::Result<String> {
        let abs = self.abs(rel);
        let bytes = fs::read(&abs).with_context(|| format!("read {}", abs))?;
        // Student files are frequently saved as ANSI; don't fail a text scan over it.
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn exists(&self, rel: &Utf8Path) -> bool {
        self.abs(rel).exists()
    }

    fn subdirectories(&self, rel: &Utf8Path) -> anyhow::Result<Vec<String>> {
        let abs = self.abs(rel);
        let mut out = Vec::new();
        for entry in fs::read_dir(&abs)? {
            let entry = entry.with_context(|| format!("list {}", abs))?;
            if entry.file_type().map(|t| t.is_dir()).unwrap_or(false)
                && let Ok(name) = entry.file_name().into_string()
            {
                out.push(name);
            }
        }
        out.sort();
        Ok(out)
    }
}

/// Join a Windows-style relative reference (`..\Shared\a.h`) onto `base`,
/// resolving `.` and `..` lexically.
pub fn join_normalized(base: &Utf8Path, reference: &str) -> Utf8PathBuf {
    let unified = reference.trim().replace('\\', "/");
    let joined = base.join(&unified);

    let mut out = Utf8PathBuf::new();
    for comp in joined.components() {
        match comp {
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_str()),
        }
    }
    out
}
