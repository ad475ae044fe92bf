//! Locate the solution (or CMake list) inside a staged tree.

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use glob::{MatchOptions, Pattern};
use subcheck_domain::Checklist;
use subcheck_types::check::check_ids;
use tracing::debug;

/// What the pipeline should analyze next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discovery {
    /// Path relative to the staged root.
    Solution(Utf8PathBuf),
    /// Path of the shallowest `CMakeLists.txt`, relative to the staged root.
    CMake(Utf8PathBuf),
    Nothing,
}

fn find_relative(root: &Utf8Path, file_pattern: &str) -> anyhow::Result<Vec<Utf8PathBuf>> {
    let pattern = format!("{}/**/{}", Pattern::escape(root.as_str()), file_pattern);
    let options = MatchOptions {
        case_sensitive: false,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    };

    let mut out = Vec::new();
    for entry in glob::glob_with(&pattern, options).context("build discovery pattern")? {
        let path = match entry {
            Ok(path) => path,
            Err(err) => {
                debug!(error = %err, "skipping unreadable path during discovery");
                continue;
            }
        };
        if !path.is_file() {
            continue;
        }
        let Ok(path) = Utf8PathBuf::from_path_buf(path) else {
            debug!("skipping non UTF-8 path during discovery");
            continue;
        };
        let rel = path.strip_prefix(root).unwrap_or(&path);
        out.push(Utf8PathBuf::from(rel.as_str().replace('\\', "/")));
    }
    out.sort();
    Ok(out)
}

/// Every `*.sln` below `root`, sorted.
pub fn find_solutions(root: &Utf8Path) -> anyhow::Result<Vec<Utf8PathBuf>> {
    find_relative(root, "*.sln")
}

/// Every `CMakeLists.txt` below `root`, shallowest first.
pub fn find_cmake_lists(root: &Utf8Path) -> anyhow::Result<Vec<Utf8PathBuf>> {
    let mut lists = find_relative(root, "CMakeLists.txt")?;
    lists.sort_by(|a, b| {
        a.components()
            .count()
            .cmp(&b.components().count())
            .then_with(|| a.cmp(b))
    });
    Ok(lists)
}

/// Report the solution count and pick what to analyze.
pub fn discover(list: &mut Checklist<'_>, root: &Utf8Path) -> anyhow::Result<Discovery> {
    let solutions = find_solutions(root)?;
    debug!(root = %root, count = solutions.len(), "discovered solutions");

    if let Some(first) = solutions.first() {
        list.assert(
            check_ids::SOLUTION_COUNT,
            0,
            solutions.len() == 1,
            "Found exactly one solution",
            Some(format!(" - found {} solutions.", solutions.len())),
        );
        return Ok(Discovery::Solution(first.clone()));
    }

    if let Some(lists) = find_cmake_lists(root)?.into_iter().next() {
        list.pass(check_ids::CMAKE_LISTS, 0, "Found CMakeLists.txt");
        return Ok(Discovery::CMake(lists));
    }

    list.fail(
        check_ids::SOLUTION_COUNT,
        0,
        "Found exactly one solution",
        Some(" - found 0 solutions.".to_string()),
    );
    Ok(Discovery::Nothing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use subcheck_domain::NullReporter;
    use tempfile::TempDir;

    fn tree(files: &[&str]) -> (TempDir, Utf8PathBuf) {
        let temp = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        for f in files {
            let path = root.join(f);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, "").unwrap();
        }
        (temp, root)
    }

    fn run(root: &Utf8Path) -> (Discovery, u64) {
        let mut sink = NullReporter;
        let mut list = Checklist::new(&mut sink);
        let found = discover(&mut list, root).unwrap();
        (found, list.issues())
    }

    #[test]
    fn single_solution_passes() {
        let (_t, root) = tree(&["Game/Game.sln", "Game/Game/Game.vcxproj"]);
        assert_eq!(run(&root), (Discovery::Solution("Game/Game.sln".into()), 0));
    }

    #[test]
    fn two_solutions_is_one_issue_and_first_wins() {
        let (_t, root) = tree(&["b/B.sln", "a/A.sln"]);
        assert_eq!(run(&root), (Discovery::Solution("a/A.sln".into()), 1));
    }

    #[test]
    fn cmake_list_is_used_when_no_solution() {
        let (_t, root) = tree(&["proj/src/CMakeLists.txt", "proj/CMakeLists.txt"]);
        assert_eq!(run(&root), (Discovery::CMake("proj/CMakeLists.txt".into()), 0));
    }

    #[test]
    fn empty_tree_is_one_issue() {
        let (_t, root) = tree(&["readme.txt"]);
        assert_eq!(run(&root), (Discovery::Nothing, 1));
    }
}
