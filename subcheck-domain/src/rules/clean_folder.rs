use crate::checklist::Checklist;
use crate::policy::RulePolicy;
use crate::ports::TreeView;
use camino::Utf8Path;
use subcheck_types::check::check_ids;
use tracing::warn;

/// Every forbidden subdirectory of `dir` counts as one issue.
pub fn check_clean_folder(
    list: &mut Checklist<'_>,
    policy: &RulePolicy,
    tree: &dyn TreeView,
    dir: &Utf8Path,
) -> u64 {
    let display = if dir.as_str().is_empty() {
        "."
    } else {
        dir.as_str()
    };

    let subdirs = tree.subdirectories(dir).unwrap_or_else(|err| {
        warn!(dir = %dir, error = %err, "cannot list folder");
        Vec::new()
    });
    let offending: Vec<&str> = subdirs
        .iter()
        .map(String::as_str)
        .filter(|name| policy.is_forbidden_folder(name))
        .collect();

    let description = format!("Folder {display} is clean");
    if offending.is_empty() {
        list.pass(check_ids::CLEAN_FOLDER, 0, description)
    } else {
        list.fail_weighted(
            check_ids::CLEAN_FOLDER,
            0,
            description,
            Some(format!(" - found {}", offending.join(", "))),
            offending.len() as u64,
        )
    }
}
