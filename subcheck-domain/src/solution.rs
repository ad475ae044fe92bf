//! Visual Studio `.sln` model.
//!
//! Only what the rules need: project references, declared solution
//! configurations, and the per-project `ActiveCfg` mapping.

use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

const SOLUTION_FOLDER_TYPE: &str = "2150E333-8FDC-42A3-9474-1A3956D46DE8";

fn project_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^Project\("\{([^}]+)\}"\)\s*=\s*"([^"]*)"\s*,\s*"([^"]*)"\s*,\s*"\{([^}]+)\}""#)
            .expect("valid regex")
    })
}

fn active_cfg_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\{([^}]+)\}\.(.+)\.ActiveCfg\s*=\s*(.+?)\s*$").expect("valid regex")
    })
}

#[derive(Debug, thiserror::Error)]
pub enum SolutionParseError {
    #[error("not a Visual Studio solution file (missing format header)")]
    MissingHeader,
}

/// `Configuration|Platform` pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConfigKey {
    pub configuration: String,
    pub platform: String,
}

impl ConfigKey {
    pub fn new(configuration: impl Into<String>, platform: impl Into<String>) -> Self {
        Self {
            configuration: configuration.into(),
            platform: platform.into(),
        }
    }

    /// Parse `Debug|x64`. Surrounding whitespace is ignored.
    pub fn parse(text: &str) -> Option<Self> {
        let (cfg, plat) = text.split_once('|')?;
        let (cfg, plat) = (cfg.trim(), plat.trim());
        if cfg.is_empty() || plat.is_empty() {
            return None;
        }
        Some(Self::new(cfg, plat))
    }

    fn matches(&self, other: &ConfigKey) -> bool {
        self.configuration.eq_ignore_ascii_case(&other.configuration)
            && self.platform.eq_ignore_ascii_case(&other.platform)
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.configuration, self.platform)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRef {
    pub name: String,
    /// Path as written in the solution, usually with backslashes.
    pub relative_path: String,
    pub guid: String,
    pub type_guid: String,
}

#[derive(Debug, Clone, Default)]
pub struct Solution {
    pub projects: Vec<ProjectRef>,
    pub configurations: Vec<ConfigKey>,
    active_cfg: BTreeMap<(String, ConfigKey), ConfigKey>,
}

impl Solution {
    pub fn parse(text: &str) -> Result<Self, SolutionParseError> {
        let text = text.trim_start_matches('\u{feff}');
        if !text
            .lines()
            .take(5)
            .any(|l| l.contains("Microsoft Visual Studio Solution File"))
        {
            return Err(SolutionParseError::MissingHeader);
        }

        let mut solution = Solution::default();
        let mut section = Section::None;

        for raw in text.lines() {
            let line = raw.trim();

            if let Some(caps) = project_line_re().captures(line) {
                let type_guid = caps[1].to_ascii_uppercase();
                if type_guid != SOLUTION_FOLDER_TYPE {
                    solution.projects.push(ProjectRef {
                        name: caps[2].to_string(),
                        relative_path: caps[3].to_string(),
                        guid: caps[4].to_ascii_uppercase(),
                        type_guid,
                    });
                }
                continue;
            }

            if line.starts_with("GlobalSection(SolutionConfigurationPlatforms)") {
                section = Section::SolutionConfigs;
                continue;
            }
            if line.starts_with("GlobalSection(ProjectConfigurationPlatforms)") {
                section = Section::ProjectConfigs;
                continue;
            }
            if line.starts_with("EndGlobalSection") {
                section = Section::None;
                continue;
            }

            match section {
                Section::SolutionConfigs => {
                    if let Some((lhs, _)) = line.split_once('=')
                        && let Some(key) = ConfigKey::parse(lhs)
                        && !solution.configurations.contains(&key)
                    {
                        solution.configurations.push(key);
                    }
                }
                Section::ProjectConfigs => {
                    if let Some(caps) = active_cfg_re().captures(line)
                        && let (Some(sln), Some(proj)) =
                            (ConfigKey::parse(&caps[2]), ConfigKey::parse(&caps[3]))
                    {
                        solution
                            .active_cfg
                            .insert((caps[1].to_ascii_uppercase(), sln), proj);
                    }
                }
                Section::None => {}
            }
        }

        Ok(solution)
    }

    /// Project configuration built for `project` under solution configuration `key`.
    ///
    /// Falls back to the same names when the solution has no mapping, with
    /// the solution-only `x86` platform spelled `Win32`.
    pub fn project_configuration(&self, project: &ProjectRef, key: &ConfigKey) -> ConfigKey {
        let guid = project.guid.to_ascii_uppercase();
        if let Some(mapped) = self
            .active_cfg
            .iter()
            .find(|((g, sln), _)| *g == guid && sln.matches(key))
            .map(|(_, proj)| proj)
        {
            return mapped.clone();
        }

        let platform = if key.platform.eq_ignore_ascii_case("x86") {
            "Win32".to_string()
        } else {
            key.platform.clone()
        };
        ConfigKey::new(key.configuration.clone(), platform)
    }
}

#[derive(Clone, Copy)]
enum Section {
    None,
    SolutionConfigs,
    ProjectConfigs,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SLN: &str = "\u{feff}
Microsoft Visual Studio Solution File, Format Version 12.00
# Visual Studio Version 17
VisualStudioVersion = 17.5.33530.505
MinimumVisualStudioVersion = 10.0.40219.1
Project(\"{8BC9CEB8-8B4A-11D0-8D11-00A0C91BC942}\") = \"Game\", \"Game\\Game.vcxproj\", \"{1B2C3D4E-0000-0000-0000-000000000001}\"
EndProject
Project(\"{2150E333-8FDC-42A3-9474-1A3956D46DE8}\") = \"Docs\", \"Docs\", \"{1B2C3D4E-0000-0000-0000-000000000002}\"
EndProject
Global
\tGlobalSection(SolutionConfigurationPlatforms) = preSolution
\t\tDebug|x64 = Debug|x64
\t\tDebug|x86 = Debug|x86
\t\tRelease|x64 = Release|x64
\tEndGlobalSection
\tGlobalSection(ProjectConfigurationPlatforms) = postSolution
\t\t{1B2C3D4E-0000-0000-0000-000000000001}.Debug|x64.ActiveCfg = Debug|x64
\t\t{1B2C3D4E-0000-0000-0000-000000000001}.Debug|x64.Build.0 = Debug|x64
\t\t{1b2c3d4e-0000-0000-0000-000000000001}.Release|x64.ActiveCfg = Release|Win32
\tEndGlobalSection
EndGlobal
";

    #[test]
    fn parses_projects_and_skips_solution_folders() {
        let sln = Solution::parse(SLN).unwrap();
        assert_eq!(sln.projects.len(), 1);
        assert_eq!(sln.projects[0].name, "Game");
        assert_eq!(sln.projects[0].relative_path, "Game\\Game.vcxproj");
        assert_eq!(
            sln.configurations,
            vec![
                ConfigKey::new("Debug", "x64"),
                ConfigKey::new("Debug", "x86"),
                ConfigKey::new("Release", "x64"),
            ]
        );
    }

    #[test]
    fn active_cfg_mapping_wins_over_fallback() {
        let sln = Solution::parse(SLN).unwrap();
        let game = &sln.projects[0];
        assert_eq!(
            sln.project_configuration(game, &ConfigKey::new("Release", "x64")),
            ConfigKey::new("Release", "Win32")
        );
        assert_eq!(
            sln.project_configuration(game, &ConfigKey::new("Debug", "x86")),
            ConfigKey::new("Debug", "Win32")
        );
    }

    #[test]
    fn rejects_files_without_header() {
        assert!(matches!(
            Solution::parse("<Project />"),
            Err(SolutionParseError::MissingHeader)
        ));
    }

    #[test]
    fn config_key_parse_and_display() {
        let key = ConfigKey::parse(" Debug | Win32 ").unwrap();
        assert_eq!(key.to_string(), "Debug|Win32");
        assert!(ConfigKey::parse("Debug").is_none());
        assert!(ConfigKey::parse("|x64").is_none());
    }
}
