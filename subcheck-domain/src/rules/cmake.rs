//! Raw-text checks on a `CMakeLists.txt`.

use crate::checklist::Checklist;
use crate::policy::{CMakeVersionPolicy, RulePolicy};
use regex::Regex;
use std::sync::OnceLock;
use subcheck_types::check::check_ids;
use subcheck_types::version::ToolVersion;

const DEPTH: u8 = 1;

fn minimum_required_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)cmake_minimum_required\s*\(\s*VERSION\s+(\d+(?:\.\d+){0,3})")
            .expect("valid regex")
    })
}

fn cxx_standard_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)set\s*\(\s*CMAKE_CXX_STANDARD\s+"?(\d+)"?|cxx_std_(\d+)"#)
            .expect("valid regex")
    })
}

fn compile_options_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)\b(?:add_compile_options|target_compile_options)\s*\(([^)]*)\)")
            .expect("valid regex")
    })
}

fn strict_level_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[/-](?:W4|Wall)\b").expect("valid regex"))
}

fn warnings_as_errors_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[/-]WX\b").expect("valid regex"))
}

/// Drop `#` comments so commented-out directives don't count.
fn strip_comments(text: &str) -> String {
    text.lines()
        .map(|line| match line.find('#') {
            Some(i) => &line[..i],
            None => line,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Declared `cmake_minimum_required` version, if any.
pub fn declared_minimum_version(text: &str) -> Option<ToolVersion> {
    let code = strip_comments(text);
    minimum_required_re()
        .captures(&code)
        .and_then(|caps| caps[1].parse().ok())
}

/// CMake path rules. `local` is the version reported by the installed
/// `cmake`, when known.
pub fn check_cmake_lists(
    list: &mut Checklist<'_>,
    policy: &RulePolicy,
    text: &str,
    local: Option<&ToolVersion>,
) -> u64 {
    let code = strip_comments(text);
    let mut issues = 0;

    issues += check_minimum_version(list, policy, &code, local);
    issues += check_language_standard(list, policy, &code);
    issues += check_compile_options(list, &code);
    issues
}

fn check_minimum_version(
    list: &mut Checklist<'_>,
    policy: &RulePolicy,
    code: &str,
    local: Option<&ToolVersion>,
) -> u64 {
    let minimum = &policy.min_cmake_version;
    let Some(declared) = minimum_required_re()
        .captures(code)
        .and_then(|caps| caps[1].parse::<ToolVersion>().ok())
    else {
        return list.fail(
            check_ids::CMAKE_MIN_VERSION,
            DEPTH,
            format!("CMake minimum version ({minimum})"),
            Some(" - no cmake_minimum_required(VERSION ...)".to_string()),
        );
    };

    let reason = match policy.cmake_version_policy {
        CMakeVersionPolicy::AtLeastMinimum => format!(" - older than {minimum}"),
        CMakeVersionPolicy::AtMostMinimum => format!(" - newer than {minimum}"),
    };
    let mut issues = list.assert(
        check_ids::CMAKE_MIN_VERSION,
        DEPTH,
        policy.cmake_version_policy.accepts(&declared, minimum),
        format!("CMake minimum version ({minimum}): {declared}"),
        Some(reason),
    );

    if let Some(local) = local {
        issues += list.assert(
            check_ids::CMAKE_LOCAL_VERSION,
            DEPTH,
            declared <= *local,
            format!("CMake {declared} is available locally ({local})"),
            Some(format!(" - installed cmake is {local}")),
        );
    }
    issues
}

fn check_language_standard(list: &mut Checklist<'_>, policy: &RulePolicy, code: &str) -> u64 {
    let required = policy.min_cxx_standard;
    let found: Vec<u32> = cxx_standard_re()
        .captures_iter(code)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .filter_map(|m| m.as_str().parse().ok())
        .collect();

    let description = format!("C++ standard is {required} or later");
    if found.is_empty() {
        return list.fail(
            check_ids::CMAKE_LANGUAGE_STANDARD,
            DEPTH,
            description,
            Some(" - missing".to_string()),
        );
    }
    let best = found.iter().copied().max().unwrap_or_default();
    list.assert(
        check_ids::CMAKE_LANGUAGE_STANDARD,
        DEPTH,
        best >= required,
        description,
        Some(format!(" - found '{best}'")),
    )
}

fn check_compile_options(list: &mut Checklist<'_>, code: &str) -> u64 {
    let description = "Compile options include /W4 and /WX";
    let bodies: Vec<&str> = compile_options_re()
        .captures_iter(code)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect();

    if bodies.is_empty() {
        return list.fail(
            check_ids::CMAKE_COMPILE_OPTIONS,
            DEPTH,
            description,
            Some(" - no add_compile_options or target_compile_options".to_string()),
        );
    }

    let strict = |b: &str| strict_level_re().is_match(b);
    let as_error = |b: &str| warnings_as_errors_re().is_match(b);
    if bodies.iter().any(|b| strict(b) && as_error(b)) {
        return list.pass(check_ids::CMAKE_COMPILE_OPTIONS, DEPTH, description);
    }

    let reason = match (bodies.iter().any(|b| strict(b)), bodies.iter().any(|b| as_error(b))) {
        (false, false) => " - missing /W4 and /WX",
        (true, false) => " - missing /WX",
        (false, true) => " - missing /W4",
        (true, true) => " - /W4 and /WX are not in the same directive",
    };
    list.fail(
        check_ids::CMAKE_COMPILE_OPTIONS,
        DEPTH,
        description,
        Some(reason.to_string()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checklist::NullReporter;
    use subcheck_types::check::Entry;

    const GOOD: &str = r#"
cmake_minimum_required(VERSION 3.26.0)
project(Minigin LANGUAGES CXX)
set(CMAKE_CXX_STANDARD 20)
add_executable(${PROJECT_NAME} main.cpp)
target_compile_options(${PROJECT_NAME} PRIVATE
    $<$<CXX_COMPILER_ID:MSVC>:/W4 /WX>
)
"#;

    fn run(text: &str, local: Option<ToolVersion>) -> (u64, Vec<Entry>) {
        let policy = RulePolicy::defaults().unwrap();
        let mut sink = NullReporter;
        let mut list = Checklist::new(&mut sink);
        let n = check_cmake_lists(&mut list, &policy, text, local.as_ref());
        (n, list.into_entries())
    }

    #[test]
    fn compliant_lists_pass() {
        let (n, entries) = run(GOOD, Some(ToolVersion::new(3, 28, 1)));
        assert_eq!(n, 0);
        assert_eq!(entries.len(), 4);
    }

    #[test]
    fn older_minimum_fails_under_default_policy() {
        let text = GOOD.replace("3.26.0", "3.20.0");
        let (n, entries) = run(&text, None);
        assert_eq!(n, 1);
        let Entry::Check(record) = &entries[0] else {
            panic!("expected a check");
        };
        assert_eq!(record.check_id, check_ids::CMAKE_MIN_VERSION);
        assert_eq!(record.reason.as_deref(), Some(" - older than 3.26.0"));
    }

    #[test]
    fn declared_version_newer_than_local_fails() {
        let (n, _) = run(GOOD, Some(ToolVersion::new(3, 25, 0)));
        assert_eq!(n, 1);
    }

    #[test]
    fn cxx_std_feature_counts() {
        let text = GOOD.replace(
            "set(CMAKE_CXX_STANDARD 20)",
            "target_compile_features(app PRIVATE cxx_std_23)",
        );
        assert_eq!(run(&text, None).0, 0);
        let text = GOOD.replace("set(CMAKE_CXX_STANDARD 20)", "set(CMAKE_CXX_STANDARD 17)");
        assert_eq!(run(&text, None).0, 1);
    }

    #[test]
    fn compile_options_need_both_flags_together() {
        let text = GOOD.replace("/W4 /WX", "/W4");
        assert_eq!(run(&text, None).0, 1);
        let text = GOOD.replace("$<$<CXX_COMPILER_ID:MSVC>:/W4 /WX>", "/Wall\n)\nadd_compile_options(/WX");
        assert_eq!(run(&text, None).0, 1);
        let text = GOOD.replace("/W4 /WX", "/Wall /WX");
        assert_eq!(run(&text, None).0, 0);
    }

    #[test]
    fn commented_directives_are_ignored() {
        let text = GOOD.replace("set(CMAKE_CXX_STANDARD 20)", "# set(CMAKE_CXX_STANDARD 20)");
        assert_eq!(run(&text, None).0, 1);
        assert_eq!(declared_minimum_version("# cmake_minimum_required(VERSION 3.1)\n"), None);
        assert_eq!(
            declared_minimum_version("cmake_minimum_required(VERSION 3.26...3.28)"),
            Some(ToolVersion::new(3, 26, 0))
        );
    }
}
