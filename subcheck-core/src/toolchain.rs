//! Locating and querying external tools: devenv, cmake and VS Code.

use crate::ports::{ProcessRunner, ProcessSpec};
use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;
use subcheck_types::version::ToolVersion;
use tracing::{debug, warn};

const DEVENV_IN_INSTALL: &str = "Common7/IDE/devenv.exe";
const VSWHERE_IN_PROGRAM_FILES: &str = "Microsoft Visual Studio/Installer/vswhere.exe";

fn cmake_version_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"cmake version (\d+(?:\.\d+){0,3})").expect("valid regex"))
}

/// `devenv.exe` inside a Visual Studio installation directory.
pub fn devenv_in(install_dir: &Utf8Path) -> Utf8PathBuf {
    install_dir.join(DEVENV_IN_INSTALL)
}

fn vswhere_program() -> String {
    std::env::var("ProgramFiles(x86)")
        .ok()
        .map(|dir| Utf8PathBuf::from(dir).join(VSWHERE_IN_PROGRAM_FILES))
        .filter(|path| path.is_file())
        .map(|path| path.into_string())
        .unwrap_or_else(|| "vswhere".to_string())
}

/// Find `devenv.exe` for Visual Studio `major`.
///
/// An explicit path (either `devenv.exe` itself or the installation
/// directory) is tried first; otherwise `vswhere` is asked for an
/// installation in `[major, major + 1)`.
pub fn locate_devenv(
    runner: &dyn ProcessRunner,
    explicit: Option<&Utf8Path>,
    major: u64,
    timeout: Duration,
) -> Option<Utf8PathBuf> {
    if let Some(path) = explicit {
        let candidate = if path
            .file_name()
            .is_some_and(|n| n.eq_ignore_ascii_case("devenv.exe"))
        {
            path.to_path_buf()
        } else {
            devenv_in(path)
        };
        if candidate.is_file() {
            debug!(devenv = %candidate, "using configured Visual Studio");
            return Some(candidate);
        }
        warn!(path = %path, "configured Visual Studio path has no devenv.exe; asking vswhere");
    }

    let range = format!("[{major},{})", major + 1);
    let spec = ProcessSpec::new(vswhere_program(), timeout)
        .args([
            "-latest",
            "-version",
            range.as_str(),
            "-property",
            "installationPath",
        ])
        .captured();
    let output = match runner.run(&spec) {
        Ok(output) if output.success() => output,
        Ok(output) => {
            debug!(code = ?output.code, "vswhere found nothing");
            return None;
        }
        Err(err) => {
            debug!(error = %err, "vswhere unavailable");
            return None;
        }
    };

    let install = output.stdout.lines().map(str::trim).find(|l| !l.is_empty())?;
    let devenv = devenv_in(Utf8Path::new(install));
    if devenv.is_file() {
        debug!(devenv = %devenv, "located Visual Studio via vswhere");
        Some(devenv)
    } else {
        warn!(install, "vswhere reported an installation without devenv.exe");
        None
    }
}

/// Parse `cmake --version` output.
pub fn parse_cmake_version(output: &str) -> Option<ToolVersion> {
    cmake_version_re()
        .captures(output)
        .and_then(|caps| caps[1].parse().ok())
}

pub fn query_cmake_version(runner: &dyn ProcessRunner, timeout: Duration) -> Option<ToolVersion> {
    let spec = ProcessSpec::new("cmake", timeout).arg("--version").captured();
    match runner.run(&spec) {
        Ok(output) => {
            let version = parse_cmake_version(&output.stdout);
            debug!(version = ?version.map(|v| v.to_string()), "local cmake");
            version
        }
        Err(err) => {
            debug!(error = %err, "cmake unavailable");
            None
        }
    }
}

/// `code` is a batch script on Windows, so it goes through `cmd /C`.
pub fn code_command(timeout: Duration) -> ProcessSpec {
    if cfg!(windows) {
        ProcessSpec::new("cmd", timeout).args(["/C", "code"])
    } else {
        ProcessSpec::new("code", timeout)
    }
}

/// First line of `code --version` is the editor version.
pub fn parse_code_version(output: &str) -> Option<ToolVersion> {
    output.lines().next().and_then(|l| l.trim().parse().ok())
}

pub fn query_code_version(runner: &dyn ProcessRunner, timeout: Duration) -> Option<ToolVersion> {
    let spec = code_command(timeout).arg("--version").captured();
    match runner.run(&spec) {
        Ok(output) if output.success() => parse_code_version(&output.stdout),
        Ok(_) => None,
        Err(err) => {
            debug!(error = %err, "code unavailable");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{ProcessError, ProcessOutput};
    use std::cell::RefCell;
    use tempfile::TempDir;

    struct Scripted {
        stdout: String,
        seen: RefCell<Vec<ProcessSpec>>,
    }

    impl ProcessRunner for Scripted {
        fn run(&self, spec: &ProcessSpec) -> Result<ProcessOutput, ProcessError> {
            self.seen.borrow_mut().push(spec.clone());
            Ok(ProcessOutput {
                code: Some(0),
                stdout: self.stdout.clone(),
                stderr: String::new(),
            })
        }

        fn spawn_detached(&self, _spec: &ProcessSpec) -> Result<(), ProcessError> {
            Ok(())
        }
    }

    fn scripted(stdout: &str) -> Scripted {
        Scripted {
            stdout: stdout.to_string(),
            seen: RefCell::new(Vec::new()),
        }
    }

    #[test]
    fn parses_cmake_version_banner() {
        let out = "cmake version 3.26.4\n\nCMake suite maintained and supported by Kitware.\n";
        assert_eq!(parse_cmake_version(out), Some(ToolVersion::new(3, 26, 4)));
        assert_eq!(parse_cmake_version("command not found"), None);
    }

    #[test]
    fn parses_code_version_first_line() {
        let out = "1.85.1\n0ee08df0cf4527e40edc9aa28f4b5bd38bbff2b2\nx64\n";
        assert_eq!(parse_code_version(out), Some(ToolVersion::new(1, 85, 1)));
        assert_eq!(parse_code_version(""), None);
    }

    #[test]
    fn vswhere_is_asked_for_the_major_range() {
        let temp = TempDir::new().unwrap();
        let install = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let devenv = devenv_in(&install);
        std::fs::create_dir_all(devenv.parent().unwrap()).unwrap();
        std::fs::write(&devenv, "").unwrap();

        let runner = scripted(&format!("{install}\r\n"));
        let found = locate_devenv(&runner, None, 17, Duration::from_secs(5));
        assert_eq!(found, Some(devenv));
        let seen = runner.seen.borrow();
        assert!(seen[0].args.contains(&"[17,18)".to_string()));
    }

    #[test]
    fn explicit_install_dir_skips_vswhere() {
        let temp = TempDir::new().unwrap();
        let install = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let devenv = devenv_in(&install);
        std::fs::create_dir_all(devenv.parent().unwrap()).unwrap();
        std::fs::write(&devenv, "").unwrap();

        let runner = scripted("");
        assert_eq!(
            locate_devenv(&runner, Some(&install), 17, Duration::from_secs(5)),
            Some(devenv.clone())
        );
        assert_eq!(
            locate_devenv(&runner, Some(&devenv), 17, Duration::from_secs(5)),
            Some(devenv)
        );
        assert!(runner.seen.borrow().is_empty());
    }

    #[test]
    fn missing_installation_is_none() {
        let runner = scripted("");
        assert_eq!(locate_devenv(&runner, None, 17, Duration::from_secs(5)), None);
    }
}
