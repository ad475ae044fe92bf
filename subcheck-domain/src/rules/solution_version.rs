use crate::checklist::Checklist;
use crate::policy::RulePolicy;
use regex::Regex;
use std::sync::OnceLock;
use subcheck_types::check::check_ids;
use subcheck_types::version::ToolVersion;

fn version_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^VisualStudioVersion\s*=\s*(\d+\.\d+\.\d+\.\d+)").expect("valid regex")
    })
}

/// The first `VisualStudioVersion = a.b.c.d` line must carry the required major version.
pub fn check_solution_version(list: &mut Checklist<'_>, policy: &RulePolicy, text: &str) -> u64 {
    let required = policy.vs_major_version;

    let declared = text.lines().find_map(|line| {
        version_line_re()
            .captures(line.trim_end())
            .and_then(|caps| caps[1].parse::<ToolVersion>().ok())
    });

    match declared {
        Some(version) => list.assert(
            check_ids::SOLUTION_VERSION,
            0,
            version.major == required,
            format!("Correct Visual Studio version ({required}): {version}"),
            None,
        ),
        None => list.fail(
            check_ids::SOLUTION_VERSION,
            0,
            format!("Correct Visual Studio version ({required})"),
            Some(" - no VisualStudioVersion line".to_string()),
        ),
    }
}
