//! Port traits abstracting external effects away from the pipeline.

use camino::{Utf8Path, Utf8PathBuf};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum StageError {
    /// Not a readable zip archive.
    #[error("{archive} is not a valid zip archive: {message}")]
    Format {
        archive: Utf8PathBuf,
        message: String,
    },

    /// Permission, lock or other I/O failure while writing the tree.
    #[error("cannot extract into {dest}: {source}")]
    Extract {
        dest: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Extracts a submission archive into a fresh directory.
pub trait ArchiveStager {
    /// `dest` is removed first if it exists.
    fn stage(&self, archive: &Utf8Path, dest: &Utf8Path) -> Result<(), StageError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<Utf8PathBuf>,
    pub timeout: Duration,
    /// Capture stdout/stderr; otherwise they are discarded.
    pub capture: bool,
}

impl ProcessSpec {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            timeout,
            capture: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn cwd(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn captured(mut self) -> Self {
        self.capture = true;
        self
    }

    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// `None` when terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("{program} was not found")]
    NotFound { program: String },

    #[error("permission denied launching {program}")]
    PermissionDenied { program: String },

    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} did not finish within {}s and was killed", .timeout.as_secs())]
    TimedOut { program: String, timeout: Duration },

    #[error("lost track of {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl ProcessError {
    pub fn from_spawn(program: &str, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::NotFound => ProcessError::NotFound {
                program: program.to_string(),
            },
            std::io::ErrorKind::PermissionDenied => ProcessError::PermissionDenied {
                program: program.to_string(),
            },
            _ => ProcessError::Launch {
                program: program.to_string(),
                source,
            },
        }
    }
}

/// Runs external tools.
pub trait ProcessRunner {
    /// Run to completion, killing the process when `spec.timeout` elapses.
    fn run(&self, spec: &ProcessSpec) -> Result<ProcessOutput, ProcessError>;

    /// Start and forget (IDE windows).
    fn spawn_detached(&self, spec: &ProcessSpec) -> Result<(), ProcessError>;
}
