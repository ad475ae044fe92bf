//! Configuration file loading for subcheck.
//!
//! Loads `subcheck.toml` (written with defaults on first run) and merges it
//! with CLI arguments (CLI takes precedence).

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use subcheck_core::settings::RunSettings;
use subcheck_core::{CMakeVersionPolicy, DEFAULT_SUBMISSION_PATTERN, PolicyError, RulePolicy};
use subcheck_types::version::ToolVersion;
use tracing::{debug, info, warn};

/// The config file name used when `--config` is not given.
pub const CONFIG_FILE_NAME: &str = "subcheck.toml";

/// Top-level configuration from subcheck.toml.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SubcheckConfig {
    pub submission: SubmissionConfig,
    pub visual_studio: VisualStudioConfig,
    pub folders: FoldersConfig,
    pub cmake: CMakeConfig,
    pub editor: EditorConfig,
    pub behavior: BehaviorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmissionConfig {
    /// Regex the archive file name must match.
    pub naming_pattern: String,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            naming_pattern: DEFAULT_SUBMISSION_PATTERN.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualStudioConfig {
    /// Required IDE major version (17 = Visual Studio 2022).
    pub major_version: u64,

    /// Installation directory or `devenv.exe`; discovered with vswhere when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub install_path: Option<Utf8PathBuf>,

    pub platform_toolset: String,

    /// Solution configurations the per-configuration rules apply to.
    pub configurations: Vec<String>,

    pub language_standards: Vec<String>,

    /// Lowest accepted `LevelN`.
    pub min_warning_level: u32,

    /// Warning level values accepted regardless of number.
    pub warning_level_aliases: Vec<String>,
}

impl Default for VisualStudioConfig {
    fn default() -> Self {
        Self {
            major_version: 17,
            install_path: None,
            platform_toolset: "v143".to_string(),
            configurations: vec!["Debug".to_string(), "Release".to_string()],
            language_standards: vec!["stdcpp20".to_string(), "stdcpplatest".to_string()],
            min_warning_level: 4,
            warning_level_aliases: vec!["EnableAllWarnings".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FoldersConfig {
    /// Build output and IDE folders that must not be submitted.
    pub forbidden: Vec<String>,
}

impl Default for FoldersConfig {
    fn default() -> Self {
        Self {
            forbidden: ["Debug", "Release", "Win32", "x64", "ARM64", ".vs", ".git", "build", "out"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CMakeConfig {
    pub min_version: ToolVersion,
    pub version_policy: CMakeVersionPolicy,
    pub min_cxx_standard: u32,
    pub generator: String,
}

impl Default for CMakeConfig {
    fn default() -> Self {
        Self {
            min_version: ToolVersion::new(3, 26, 0),
            version_policy: CMakeVersionPolicy::default(),
            min_cxx_standard: 20,
            generator: "Visual Studio 17 2022".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Minimum VS Code version for opening CMake projects.
    pub min_code_version: ToolVersion,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            min_code_version: ToolVersion::new(1, 82, 0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    pub build_after_report: bool,
    pub open_after_report: bool,
    pub use_temp_staging: bool,

    /// Upper bound for every spawned tool (devenv, cmake, vswhere, code).
    pub process_timeout_secs: u64,

    /// Where `build_<cfg>_<platform>.log` files are written.
    pub log_dir: Utf8PathBuf,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            build_after_report: false,
            open_after_report: false,
            use_temp_staging: true,
            process_timeout_secs: 600,
            log_dir: Utf8PathBuf::from("."),
        }
    }
}

impl SubcheckConfig {
    /// Rule parameters. Fails on an invalid pattern or empty required lists.
    pub fn rule_policy(&self) -> Result<RulePolicy, PolicyError> {
        let vs = &self.visual_studio;
        if vs.configurations.is_empty() {
            return Err(PolicyError::Empty {
                field: "visual_studio.configurations",
            });
        }
        if vs.language_standards.is_empty() {
            return Err(PolicyError::Empty {
                field: "visual_studio.language_standards",
            });
        }
        if vs.platform_toolset.trim().is_empty() {
            return Err(PolicyError::Empty {
                field: "visual_studio.platform_toolset",
            });
        }

        let mut policy = RulePolicy::with_pattern(&self.submission.naming_pattern)?;
        policy.vs_major_version = vs.major_version;
        policy.platform_toolset = vs.platform_toolset.clone();
        policy.configurations = vs.configurations.clone();
        policy.language_standards = vs.language_standards.clone();
        policy.min_warning_level = vs.min_warning_level;
        policy.warning_level_aliases = vs.warning_level_aliases.clone();
        policy.forbidden_folders = self.folders.forbidden.clone();
        policy.min_cmake_version = self.cmake.min_version;
        policy.cmake_version_policy = self.cmake.version_policy;
        policy.min_cxx_standard = self.cmake.min_cxx_standard;
        Ok(policy)
    }
}

/// Load and parse a subcheck.toml config file.
pub fn load_config(path: &Utf8Path) -> anyhow::Result<SubcheckConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config file {}", path))?;
    parse_config(&contents).with_context(|| format!("parse config file {}", path))
}

/// Parse a config file from a string.
pub fn parse_config(contents: &str) -> anyhow::Result<SubcheckConfig> {
    let config: SubcheckConfig = toml::from_str(contents).context("invalid TOML")?;
    Ok(config)
}

pub fn render_default_config() -> anyhow::Result<String> {
    toml::to_string_pretty(&SubcheckConfig::default()).context("serialize default config")
}

/// Load `path`, or write the defaults there and return them.
///
/// A failure to write the default file is logged, not fatal.
pub fn load_or_create_default(path: &Utf8Path) -> anyhow::Result<SubcheckConfig> {
    if path.exists() {
        debug!("found config file at {}", path);
        return load_config(path);
    }

    let contents = render_default_config()?;
    let write = || -> anyhow::Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, &contents)?;
        Ok(())
    };
    match write() {
        Ok(()) => info!("wrote default config to {}", path),
        Err(err) => warn!("cannot write default config to {}: {:#}", path, err),
    }
    Ok(SubcheckConfig::default())
}

/// Flags given on the command line.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub build: bool,
    pub open: bool,
    pub fix: bool,
    pub no_temp: bool,
    pub log_dir: Option<Utf8PathBuf>,
}

/// Builder for merging config file with CLI arguments.
pub struct ConfigMerger {
    config: SubcheckConfig,
}

impl ConfigMerger {
    pub fn new(config: SubcheckConfig) -> Self {
        Self { config }
    }

    /// CLI boolean flags switch behaviour on; they never switch the config off.
    pub fn merge_run_args(self, archive: Utf8PathBuf, cli: &CliOverrides) -> RunSettings {
        let behavior = self.config.behavior;
        RunSettings {
            archive,
            build_after_report: cli.build || behavior.build_after_report,
            open_after_report: cli.open || behavior.open_after_report,
            fix: cli.fix,
            use_temp_staging: !cli.no_temp && behavior.use_temp_staging,
            vs_major_version: self.config.visual_studio.major_version,
            vs_install_path: self.config.visual_studio.install_path,
            cmake_generator: self.config.cmake.generator,
            min_code_version: self.config.editor.min_code_version,
            process_timeout: Duration::from_secs(behavior.process_timeout_secs.max(1)),
            log_dir: cli.log_dir.clone().unwrap_or(behavior.log_dir),
            ..RunSettings::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_parse_full_config() {
        let contents = r#"
[submission]
naming_pattern = 'DAE\d+_.*\.zip$'

[visual_studio]
major_version = 17
install_path = 'C:\Program Files\Microsoft Visual Studio\2022\Community'
platform_toolset = "v143"
configurations = ["Debug"]
language_standards = ["stdcpplatest"]
min_warning_level = 3
warning_level_aliases = []

[folders]
forbidden = [".vs"]

[cmake]
min_version = "3.28"
version_policy = "at_most_minimum"
min_cxx_standard = 23
generator = "Ninja"

[editor]
min_code_version = "1.90.0"

[behavior]
build_after_report = true
process_timeout_secs = 30
log_dir = "logs"
"#;

        let config = parse_config(contents).unwrap();
        assert_eq!(config.visual_studio.configurations, vec!["Debug"]);
        assert_eq!(config.cmake.min_version, ToolVersion::new(3, 28, 0));
        assert_eq!(config.cmake.version_policy, CMakeVersionPolicy::AtMostMinimum);
        assert!(config.behavior.build_after_report);
        // Unset keys keep their defaults.
        assert!(config.behavior.use_temp_staging);

        let policy = config.rule_policy().unwrap();
        assert_eq!(policy.min_warning_level, 3);
        assert_eq!(policy.min_cxx_standard, 23);
        assert!(policy.naming_pattern.is_match("DAE10_x.zip"));
    }

    #[test]
    fn test_parse_empty_config() {
        let config = parse_config("").unwrap();
        assert_eq!(config.visual_studio.platform_toolset, "v143");
        assert_eq!(config.cmake.min_version, ToolVersion::new(3, 26, 0));
        assert!(config.rule_policy().is_ok());
    }

    #[test]
    fn test_malformed_values_are_errors() {
        assert!(parse_config("[cmake]\nmin_version = \"three\"").is_err());
        assert!(parse_config("[behavior\n").is_err());

        let config = parse_config("[submission]\nnaming_pattern = \"([\"").unwrap();
        assert!(matches!(config.rule_policy(), Err(PolicyError::Pattern { .. })));

        let config = parse_config("[visual_studio]\nconfigurations = []").unwrap();
        assert!(matches!(config.rule_policy(), Err(PolicyError::Empty { .. })));
    }

    #[test]
    fn test_default_config_round_trips() {
        let rendered = render_default_config().unwrap();
        let parsed = parse_config(&rendered).unwrap();
        assert_eq!(parsed.submission.naming_pattern, DEFAULT_SUBMISSION_PATTERN);
        assert_eq!(parsed.folders.forbidden.len(), 9);
        assert_eq!(parsed.editor.min_code_version, ToolVersion::new(1, 82, 0));
    }

    #[test]
    fn test_load_or_create_default_writes_file() {
        let temp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8");
        let path = root.join(CONFIG_FILE_NAME);

        let cfg = load_or_create_default(&path).expect("defaults");
        assert!(path.exists());
        assert_eq!(cfg.visual_studio.major_version, 17);

        std::fs::write(&path, "[visual_studio]\nmajor_version = 18\n").unwrap();
        let cfg = load_or_create_default(&path).expect("load");
        assert_eq!(cfg.visual_studio.major_version, 18);
    }

    #[test]
    fn test_cli_flags_override_file() {
        let mut config = SubcheckConfig::default();
        config.behavior.use_temp_staging = true;
        config.behavior.open_after_report = true;

        let cli = CliOverrides {
            build: true,
            no_temp: true,
            log_dir: Some("out/logs".into()),
            ..CliOverrides::default()
        };
        let settings = ConfigMerger::new(config).merge_run_args("a.zip".into(), &cli);
        assert!(settings.build_after_report);
        assert!(settings.open_after_report);
        assert!(!settings.use_temp_staging);
        assert!(settings.remediate());
        assert_eq!(settings.log_dir, Utf8PathBuf::from("out/logs"));
        assert_eq!(settings.process_timeout, Duration::from_secs(600));
    }
}
