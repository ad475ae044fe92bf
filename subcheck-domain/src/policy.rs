use regex::Regex;
use serde::{Deserialize, Serialize};
use subcheck_types::version::ToolVersion;

pub const DEFAULT_SUBMISSION_PATTERN: &str =
    r"[1,2,3]DAE[0,1,2]\d_Programming4_[0,1]\d_[a-zA-Z]+_[a-zA-Z]+(-\d)?\.zip$";

#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("invalid submission name pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("{field} must not be empty")]
    Empty { field: &'static str },
}

/// How `cmake_minimum_required(VERSION ...)` is compared to the configured minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CMakeVersionPolicy {
    /// Declared version must be at least the configured minimum.
    #[default]
    AtLeastMinimum,
    /// Declared version must not exceed the configured minimum, so the
    /// project stays configurable with the course toolchain.
    AtMostMinimum,
}

impl CMakeVersionPolicy {
    pub fn accepts(self, declared: &ToolVersion, minimum: &ToolVersion) -> bool {
        match self {
            CMakeVersionPolicy::AtLeastMinimum => declared >= minimum,
            CMakeVersionPolicy::AtMostMinimum => declared <= minimum,
        }
    }
}

/// Rule parameters, resolved from configuration.
#[derive(Debug, Clone)]
pub struct RulePolicy {
    pub naming_pattern: Regex,
    pub vs_major_version: u64,
    pub platform_toolset: String,
    pub configurations: Vec<String>,
    pub language_standards: Vec<String>,

    /// Lowest acceptable `LevelN`.
    pub min_warning_level: u32,
    /// Values accepted regardless of level, e.g. `EnableAllWarnings`.
    pub warning_level_aliases: Vec<String>,

    pub forbidden_folders: Vec<String>,
    pub min_cmake_version: ToolVersion,
    pub cmake_version_policy: CMakeVersionPolicy,
    pub min_cxx_standard: u32,

    /// Rewrite non-compliant warning settings in project files.
    pub remediate: bool,
}

impl RulePolicy {
    /// Course defaults with the given naming pattern.
    pub fn with_pattern(pattern: &str) -> Result<Self, PolicyError> {
        if pattern.trim().is_empty() {
            return Err(PolicyError::Empty {
                field: "naming pattern",
            });
        }
        let naming_pattern = Regex::new(pattern).map_err(|source| PolicyError::Pattern {
            pattern: pattern.to_string(),
            source,
        })?;

        Ok(Self {
            naming_pattern,
            vs_major_version: 17,
            platform_toolset: "v143".to_string(),
            configurations: vec!["Debug".to_string(), "Release".to_string()],
            language_standards: vec!["stdcpp20".to_string(), "stdcpplatest".to_string()],
            min_warning_level: 4,
            warning_level_aliases: vec!["EnableAllWarnings".to_string()],
            forbidden_folders: [
                "Debug", "Release", "Win32", "x64", "ARM64", ".vs", ".git", "build", "out",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            min_cmake_version: ToolVersion::new(3, 26, 0),
            cmake_version_policy: CMakeVersionPolicy::default(),
            min_cxx_standard: 20,
            remediate: false,
        })
    }

    pub fn defaults() -> Result<Self, PolicyError> {
        Self::with_pattern(DEFAULT_SUBMISSION_PATTERN)
    }

    pub fn is_recognized_configuration(&self, name: &str) -> bool {
        self.configurations.iter().any(|c| c == name)
    }

    pub fn is_forbidden_folder(&self, name: &str) -> bool {
        self.forbidden_folders
            .iter()
            .any(|f| f.eq_ignore_ascii_case(name))
    }

    pub fn accepts_language_standard(&self, value: &str) -> bool {
        self.language_standards
            .iter()
            .any(|s| s.eq_ignore_ascii_case(value.trim()))
    }

    pub fn accepts_warning_level(&self, value: &str) -> bool {
        let value = value.trim();
        if self
            .warning_level_aliases
            .iter()
            .any(|a| a.eq_ignore_ascii_case(value))
        {
            return true;
        }
        parse_level(value).is_some_and(|n| n >= self.min_warning_level)
    }

    /// Value written by remediation for a non-compliant warning level.
    pub fn remediation_warning_level(&self) -> String {
        format!("Level{}", self.min_warning_level)
    }

    pub fn warning_level_description(&self) -> String {
        format!("Warning level {}", self.min_warning_level)
    }
}

fn parse_level(value: &str) -> Option<u32> {
    let digits = value
        .strip_prefix("Level")
        .or_else(|| value.strip_prefix("level"))?;
    digits.parse().ok()
}
