use crate::ports::{ProjectSink, TreeView};
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::{BTreeMap, BTreeSet};
use subcheck_types::edit::TextEdit;

/// In-memory staged tree. Directories are implied by file paths; empty
/// directories can be added explicitly.
pub(crate) struct MemTree {
    root: Utf8PathBuf,
    files: BTreeMap<String, String>,
    dirs: BTreeSet<String>,
}

impl MemTree {
    pub(crate) fn new(files: &[(&str, &str)]) -> Self {
        let mut tree = Self {
            root: Utf8PathBuf::from("."),
            files: BTreeMap::new(),
            dirs: BTreeSet::new(),
        };
        for (path, contents) in files {
            tree.files.insert(path.to_string(), contents.to_string());
            let mut parent = Utf8Path::new(path).parent();
            while let Some(p) = parent {
                if !p.as_str().is_empty() {
                    tree.dirs.insert(p.to_string());
                }
                parent = p.parent();
            }
        }
        tree
    }

    pub(crate) fn with_dirs(mut self, dirs: &[&str]) -> Self {
        for d in dirs {
            self.dirs.insert(d.to_string());
        }
        self
    }
}

impl TreeView for MemTree {
    fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn read_to_string(&self, rel: &Utf8Path) -> anyhow::Result<String> {
        self.files
            .get(rel.as_str())
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("missing {}", rel))
    }

    fn exists(&self, rel: &Utf8Path) -> bool {
        self.files.contains_key(rel.as_str()) || self.dirs.contains(rel.as_str())
    }

    fn subdirectories(&self, rel: &Utf8Path) -> anyhow::Result<Vec<String>> {
        let mut out = Vec::new();
        for d in &self.dirs {
            let p = Utf8Path::new(d);
            if p.parent().map(|x| x.as_str()) == Some(rel.as_str())
                && let Some(name) = p.file_name()
            {
                out.push(name.to_string());
            }
        }
        Ok(out)
    }
}

/// Records persisted edits instead of writing them.
#[derive(Default)]
pub(crate) struct RecordingSink {
    pub(crate) persisted: Vec<(Utf8PathBuf, Vec<TextEdit>)>,
    pub(crate) fail: bool,
}

impl ProjectSink for RecordingSink {
    fn persist(&mut self, project: &Utf8Path, edits: &[TextEdit]) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("read-only file system");
        }
        self.persisted.push((project.to_path_buf(), edits.to_vec()));
        Ok(())
    }
}

/// Apply edits the way the persistence layer does, for assertions.
pub(crate) fn apply(text: &str, edits: &[TextEdit]) -> String {
    let mut sorted: Vec<&TextEdit> = edits.iter().collect();
    sorted.sort_by(|a, b| b.start.cmp(&a.start).then(b.end.cmp(&a.end)));
    let mut out = text.to_string();
    for e in sorted {
        out.replace_range(e.start..e.end, &e.replacement);
    }
    out
}
