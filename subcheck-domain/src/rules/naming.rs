use crate::checklist::Checklist;
use crate::policy::RulePolicy;
use camino::Utf8Path;
use subcheck_types::check::check_ids;

/// The archive's file name must follow the course naming convention.
pub fn check_file_name(list: &mut Checklist<'_>, policy: &RulePolicy, archive: &Utf8Path) -> u64 {
    let name = archive.file_name().unwrap_or_default();
    list.assert(
        check_ids::FILE_NAME,
        0,
        !name.is_empty() && policy.naming_pattern.is_match(name),
        "File name",
        Some(format!(" - '{name}' does not follow the naming convention")),
    )
}
