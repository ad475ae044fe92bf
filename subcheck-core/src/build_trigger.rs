//! Rebuilding and opening the submission once the report is done.

use crate::discovery::find_solutions;
use crate::ports::{ProcessRunner, ProcessSpec};
use crate::toolchain::{code_command, query_code_version};
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;
use subcheck_domain::{Checklist, ConfigKey, RulePolicy};
use subcheck_types::check::check_ids;
use subcheck_types::version::ToolVersion;
use tracing::{debug, info, warn};

fn summary_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^=+ Rebuild All: (\d+) succeeded, (\d+) failed, (\d+) skipped")
            .expect("valid regex")
    })
}

/// Counts from the `Rebuild All` line devenv writes at the end of a log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildSummary {
    pub succeeded: u32,
    pub failed: u32,
    pub skipped: u32,
}

pub fn log_file_name(key: &ConfigKey) -> String {
    format!("build_{}_{}.log", key.configuration, key.platform)
}

pub fn parse_build_summary(log: &str) -> Option<BuildSummary> {
    let caps = summary_re().captures(log)?;
    Some(BuildSummary {
        succeeded: caps[1].parse().ok()?,
        failed: caps[2].parse().ok()?,
        skipped: caps[3].parse().ok()?,
    })
}

/// devenv writes either UTF-8 or UTF-16LE depending on the console code page.
fn decode_log(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(b"\xFF\xFE") {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

/// Runs devenv, cmake and the editor for the post-report stage.
pub struct BuildTrigger<'a> {
    pub runner: &'a dyn ProcessRunner,
    pub timeout: Duration,
    pub log_dir: &'a Utf8Path,
}

impl BuildTrigger<'_> {
    /// Rebuild every recognized solution configuration. A failing
    /// configuration does not stop the remaining ones.
    pub fn rebuild_solution(
        &self,
        list: &mut Checklist<'_>,
        policy: &RulePolicy,
        devenv: &Utf8Path,
        solution: &Utf8Path,
        configurations: &[ConfigKey],
    ) -> u64 {
        let mut issues = 0;
        for key in configurations
            .iter()
            .filter(|k| policy.is_recognized_configuration(&k.configuration))
        {
            issues += self.rebuild_configuration(list, devenv, solution, key);
        }
        issues
    }

    fn rebuild_configuration(
        &self,
        list: &mut Checklist<'_>,
        devenv: &Utf8Path,
        solution: &Utf8Path,
        key: &ConfigKey,
    ) -> u64 {
        list.heading(0, format!("Building {key}"));
        let description = format!("Rebuild {key}");

        let log = self.log_dir.join(log_file_name(key));
        if log.exists()
            && let Err(err) = fs::remove_file(&log)
        {
            warn!(log = %log, error = %err, "cannot delete stale build log");
        }

        let spec = ProcessSpec::new(devenv.as_str(), self.timeout).args([
            solution.to_string(),
            "/Rebuild".to_string(),
            key.to_string(),
            "/Out".to_string(),
            log.to_string(),
        ]);
        if let Err(err) = self.runner.run(&spec) {
            return list.fail(check_ids::BUILD, 1, description, Some(format!(" - {err}")));
        }

        let summary = fs::read(&log)
            .map(|bytes| decode_log(&bytes))
            .ok()
            .and_then(|text| parse_build_summary(&text));
        match summary {
            None => list.fail(
                check_ids::BUILD,
                1,
                description,
                Some(" - build result unavailable".to_string()),
            ),
            Some(s) => {
                info!(config = %key, succeeded = s.succeeded, failed = s.failed, skipped = s.skipped, "rebuild finished");
                list.assert(
                    check_ids::BUILD,
                    1,
                    s.failed == 0,
                    description,
                    Some(format!(
                        " - {} succeeded, {} failed, {} skipped",
                        s.succeeded, s.failed, s.skipped
                    )),
                )
            }
        }
    }

    /// Generate a Visual Studio solution from `source_dir` into
    /// `<source_dir>/build` and return its path.
    pub fn generate_cmake(
        &self,
        list: &mut Checklist<'_>,
        generator: &str,
        source_dir: &Utf8Path,
    ) -> Option<Utf8PathBuf> {
        let build_dir = source_dir.join("build");
        let description = format!("Generate {generator} project");
        let spec = ProcessSpec::new("cmake", self.timeout)
            .args(["-G", generator, "-S", source_dir.as_str(), "-B", build_dir.as_str()])
            .captured();

        match self.runner.run(&spec) {
            Err(err) => {
                list.fail(check_ids::CMAKE_GENERATE, 0, description, Some(format!(" - {err}")));
                return None;
            }
            Ok(output) if !output.success() => {
                debug!(stderr = %output.stderr, "cmake generation failed");
                let code = output
                    .code
                    .map_or_else(|| "signal".to_string(), |c| c.to_string());
                list.fail(
                    check_ids::CMAKE_GENERATE,
                    0,
                    description,
                    Some(format!(" - exit code {code}")),
                );
                return None;
            }
            Ok(_) => {}
        }

        let generated = find_solutions(&build_dir)
            .ok()
            .and_then(|found| found.into_iter().next());
        match generated {
            Some(rel) => {
                list.pass(check_ids::CMAKE_GENERATE, 0, description);
                Some(build_dir.join(rel))
            }
            None => {
                list.fail(
                    check_ids::CMAKE_GENERATE,
                    0,
                    description,
                    Some(" - no solution generated".to_string()),
                );
                None
            }
        }
    }

    pub fn open_solution(
        &self,
        list: &mut Checklist<'_>,
        devenv: &Utf8Path,
        solution: &Utf8Path,
    ) -> u64 {
        let name = solution.file_name().unwrap_or(solution.as_str());
        let spec = ProcessSpec::new(devenv.as_str(), self.timeout).arg(solution.as_str());
        match self.runner.spawn_detached(&spec) {
            Ok(()) => list.pass(check_ids::OPEN_IDE, 0, format!("Open {name} in Visual Studio")),
            Err(err) => list.fail(
                check_ids::OPEN_IDE,
                0,
                format!("Open {name} in Visual Studio"),
                Some(format!(" - {err}")),
            ),
        }
    }

    /// Open a CMake folder in VS Code, provided the editor is recent enough.
    pub fn open_folder(
        &self,
        list: &mut Checklist<'_>,
        dir: &Utf8Path,
        min_version: &ToolVersion,
    ) -> u64 {
        let found = query_code_version(self.runner, self.timeout);
        let description = match &found {
            Some(v) => format!("VS Code version ({min_version}): {v}"),
            None => format!("VS Code version ({min_version})"),
        };
        let Some(version) = found else {
            return list.fail(
                check_ids::EDITOR_VERSION,
                0,
                description,
                Some(" - code not found".to_string()),
            );
        };
        if version < *min_version {
            return list.fail(
                check_ids::EDITOR_VERSION,
                0,
                description,
                Some(" - too old".to_string()),
            );
        }
        list.pass(check_ids::EDITOR_VERSION, 0, description);

        let spec = code_command(self.timeout).arg(dir.as_str());
        match self.runner.spawn_detached(&spec) {
            Ok(()) => list.pass(check_ids::OPEN_IDE, 0, format!("Open {dir} in VS Code")),
            Err(err) => list.fail(
                check_ids::OPEN_IDE,
                0,
                format!("Open {dir} in VS Code"),
                Some(format!(" - {err}")),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{ProcessError, ProcessOutput};
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use subcheck_domain::NullReporter;
    use tempfile::TempDir;

    const LOG: &str = "Build started...\r\n\
        1>------ Rebuild All started: Project: Game, Configuration: Debug x64 ------\r\n\
        ========== Rebuild All: 1 succeeded, 0 failed, 0 skipped ==========\r\n";

    /// Writes the given log text to the `/Out` path, or fails to launch.
    struct FakeDevenv {
        log: Option<String>,
        launch_error: bool,
        calls: RefCell<Vec<ProcessSpec>>,
    }

    impl FakeDevenv {
        fn writing(log: &str) -> Self {
            Self {
                log: Some(log.to_string()),
                launch_error: false,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl ProcessRunner for FakeDevenv {
        fn run(&self, spec: &ProcessSpec) -> Result<ProcessOutput, ProcessError> {
            self.calls.borrow_mut().push(spec.clone());
            if self.launch_error {
                return Err(ProcessError::NotFound {
                    program: spec.program.clone(),
                });
            }
            if let (Some(log), Some(pos)) = (&self.log, spec.args.iter().position(|a| a == "/Out")) {
                std::fs::write(&spec.args[pos + 1], log).unwrap();
            }
            Ok(ProcessOutput {
                code: Some(0),
                ..ProcessOutput::default()
            })
        }

        fn spawn_detached(&self, spec: &ProcessSpec) -> Result<(), ProcessError> {
            self.calls.borrow_mut().push(spec.clone());
            Ok(())
        }
    }

    fn log_dir() -> (TempDir, Utf8PathBuf) {
        let temp = TempDir::new().unwrap();
        let dir = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        (temp, dir)
    }

    fn configs() -> Vec<ConfigKey> {
        vec![
            ConfigKey::new("Debug", "x64"),
            ConfigKey::new("Release", "x64"),
            ConfigKey::new("Profile", "x64"),
        ]
    }

    fn rebuild(runner: &FakeDevenv, dir: &Utf8Path) -> u64 {
        let policy = RulePolicy::defaults().unwrap();
        let trigger = BuildTrigger {
            runner,
            timeout: Duration::from_secs(5),
            log_dir: dir,
        };
        let mut sink = NullReporter;
        let mut list = Checklist::new(&mut sink);
        trigger.rebuild_solution(
            &mut list,
            &policy,
            Utf8Path::new("devenv.exe"),
            Utf8Path::new("/stage/Game.sln"),
            &configs(),
        )
    }

    #[test]
    fn parses_summary_line() {
        assert_eq!(
            parse_build_summary(LOG),
            Some(BuildSummary {
                succeeded: 1,
                failed: 0,
                skipped: 0
            })
        );
        assert_eq!(parse_build_summary("Build started...\n"), None);
    }

    #[test]
    fn decodes_utf16_logs() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in LOG.encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        assert_eq!(decode_log(&bytes), LOG);
    }

    #[test]
    fn log_names_follow_configuration() {
        assert_eq!(log_file_name(&ConfigKey::new("Debug", "x64")), "build_Debug_x64.log");
    }

    #[test]
    fn successful_rebuilds_add_no_issues() {
        let (_t, dir) = log_dir();
        let runner = FakeDevenv::writing(LOG);
        assert_eq!(rebuild(&runner, &dir), 0);

        let calls = runner.calls.borrow();
        assert_eq!(calls.len(), 2, "unrecognized configurations are not built");
        assert_eq!(calls[0].args[0], "/stage/Game.sln");
        assert_eq!(calls[0].args[1..3], ["/Rebuild".to_string(), "Debug|x64".to_string()]);
        assert!(calls[0].args[4].ends_with("build_Debug_x64.log"));
    }

    #[test]
    fn failed_projects_are_an_issue_per_configuration() {
        let (_t, dir) = log_dir();
        let runner =
            FakeDevenv::writing("========== Rebuild All: 0 succeeded, 1 failed, 0 skipped ==========");
        assert_eq!(rebuild(&runner, &dir), 2);
    }

    #[test]
    fn missing_summary_and_launch_failures_are_issues() {
        let (_t, dir) = log_dir();
        std::fs::write(dir.join("build_Debug_x64.log"), LOG).unwrap();
        let runner = FakeDevenv {
            log: None,
            launch_error: false,
            calls: RefCell::new(Vec::new()),
        };
        assert_eq!(rebuild(&runner, &dir), 2, "stale logs are deleted before building");

        let runner = FakeDevenv {
            log: None,
            launch_error: true,
            calls: RefCell::new(Vec::new()),
        };
        assert_eq!(rebuild(&runner, &dir), 2);
        assert_eq!(runner.calls.borrow().len(), 2);
    }
}
