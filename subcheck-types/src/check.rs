use serde::{Deserialize, Serialize};

/// Outcome of a single rule invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Pass,
    Fail,
}

impl CheckStatus {
    pub fn is_pass(self) -> bool {
        matches!(self, CheckStatus::Pass)
    }
    pub fn is_fail(self) -> bool {
        matches!(self, CheckStatus::Fail)
    }
}

/// One evaluated rule, as printed on the console and stored in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRecord {
    /// Stable identifier of the rule that produced this record (see [`check_ids`]).
    pub check_id: String,

    /// Nesting level used for console indentation.
    #[serde(default)]
    pub depth: u8,

    pub description: String,
    pub status: CheckStatus,

    /// Human-readable failure reason, appended after the NOK marker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Contribution to the issue count. Always 0 for a pass, usually 1 for a
    /// failure; the clean-folder rule contributes one per offending folder.
    pub issues: u64,
}

impl CheckRecord {
    pub fn pass(check_id: &str, depth: u8, description: impl Into<String>) -> Self {
        Self {
            check_id: check_id.to_string(),
            depth,
            description: description.into(),
            status: CheckStatus::Pass,
            reason: None,
            issues: 0,
        }
    }

    pub fn fail(
        check_id: &str,
        depth: u8,
        description: impl Into<String>,
        reason: Option<String>,
        issues: u64,
    ) -> Self {
        Self {
            check_id: check_id.to_string(),
            depth,
            description: description.into(),
            status: CheckStatus::Fail,
            reason,
            issues,
        }
    }
}

/// A line of the checklist: either a plain heading or an evaluated check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entry {
    Heading { depth: u8, text: String },
    Check(CheckRecord),
}

/// Stable check identifiers.
pub mod check_ids {
    pub const FILE_NAME: &str = "submission.file_name";
    pub const ARCHIVE_FORMAT: &str = "submission.archive_format";
    pub const ARCHIVE_EXTRACT: &str = "submission.archive_extract";
    pub const SOLUTION_COUNT: &str = "discovery.solution_count";
    pub const CMAKE_LISTS: &str = "discovery.cmake_lists";
    pub const SOLUTION_VERSION: &str = "solution.version";
    pub const CLEAN_FOLDER: &str = "folder.clean";
    pub const PROJECT_EXISTS: &str = "project.exists";
    pub const PROJECT_PARSE: &str = "project.parse";
    pub const TOOLSET: &str = "config.toolset";
    pub const LANGUAGE_STANDARD: &str = "config.language_standard";
    pub const WARNING_LEVEL: &str = "config.warning_level";
    pub const WARNINGS_AS_ERRORS: &str = "config.warnings_as_errors";
    pub const HEADER_USING_NAMESPACE: &str = "header.using_namespace";
    pub const HEADER_EXISTS: &str = "header.exists";
    pub const PROJECT_SAVE: &str = "project.save";
    pub const CMAKE_MIN_VERSION: &str = "cmake.minimum_version";
    pub const CMAKE_LOCAL_VERSION: &str = "cmake.local_version";
    pub const CMAKE_LANGUAGE_STANDARD: &str = "cmake.language_standard";
    pub const CMAKE_COMPILE_OPTIONS: &str = "cmake.compile_options";
    pub const CMAKE_GENERATE: &str = "cmake.generate";
    pub const BUILD: &str = "build.rebuild";
    pub const OPEN_IDE: &str = "ide.open";
    pub const EDITOR_VERSION: &str = "ide.editor_version";
}
