//! Default port implementations.

use crate::ports::{
    ArchiveStager, ProcessError, ProcessOutput, ProcessRunner, ProcessSpec, StageError,
};
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use std::io::{ErrorKind, Read};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use subcheck_domain::ProjectSink;
use subcheck_edit::{ApplyOptions, FileChange, apply_to_file};
use subcheck_types::edit::TextEdit;
use tracing::{debug, warn};
use zip::result::ZipError;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Extracts zip archives. Entry paths that would escape the destination are skipped.
#[derive(Debug, Clone, Default)]
pub struct ZipStager;

impl ZipStager {
    fn classify(archive: &Utf8Path, dest: &Utf8Path, err: ZipError) -> StageError {
        match err {
            ZipError::Io(source)
                if !matches!(
                    source.kind(),
                    ErrorKind::InvalidData | ErrorKind::UnexpectedEof
                ) =>
            {
                StageError::Extract {
                    dest: dest.to_path_buf(),
                    source,
                }
            }
            other => StageError::Format {
                archive: archive.to_path_buf(),
                message: other.to_string(),
            },
        }
    }
}

impl ArchiveStager for ZipStager {
    fn stage(&self, archive: &Utf8Path, dest: &Utf8Path) -> Result<(), StageError> {
        let extract_err = |source: std::io::Error| StageError::Extract {
            dest: dest.to_path_buf(),
            source,
        };

        if dest.exists() {
            debug!(dest = %dest, "removing previous staging directory");
            fs::remove_dir_all(dest).map_err(extract_err)?;
        }

        let file = fs::File::open(archive).map_err(extract_err)?;
        let mut zip =
            zip::ZipArchive::new(file).map_err(|e| Self::classify(archive, dest, e))?;
        fs::create_dir_all(dest).map_err(extract_err)?;
        debug!(archive = %archive, entries = zip.len(), dest = %dest, "extracting");

        for i in 0..zip.len() {
            let mut entry = zip
                .by_index(i)
                .map_err(|e| Self::classify(archive, dest, e))?;
            let Some(rel) = entry.enclosed_name() else {
                warn!(entry = entry.name(), "skipping entry outside the destination");
                continue;
            };
            let out = dest.as_std_path().join(rel);

            if entry.is_dir() {
                fs::create_dir_all(&out).map_err(extract_err)?;
                continue;
            }
            if let Some(parent) = out.parent() {
                fs::create_dir_all(parent).map_err(extract_err)?;
            }
            let mut target = fs::File::create(&out).map_err(extract_err)?;
            std::io::copy(&mut entry, &mut target).map_err(|source| {
                if source.kind() == ErrorKind::InvalidData {
                    StageError::Format {
                        archive: archive.to_path_buf(),
                        message: source.to_string(),
                    }
                } else {
                    extract_err(source)
                }
            })?;
        }
        Ok(())
    }
}

/// Runs processes with `std::process`, polling for exit until the deadline.
#[derive(Debug, Clone, Default)]
pub struct SystemProcessRunner;

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<thread::JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            if let Err(err) = pipe.read_to_end(&mut buf) {
                debug!(error = %err, "pipe read ended early");
            }
            buf
        })
    })
}

fn collect(handle: Option<thread::JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

impl ProcessRunner for SystemProcessRunner {
    fn run(&self, spec: &ProcessSpec) -> Result<ProcessOutput, ProcessError> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args).stdin(Stdio::null());
        if let Some(cwd) = &spec.cwd {
            cmd.current_dir(cwd);
        }
        if spec.capture {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        } else {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }

        debug!(command = %spec.display(), timeout_secs = spec.timeout.as_secs(), "spawning");
        let mut child = cmd
            .spawn()
            .map_err(|e| ProcessError::from_spawn(&spec.program, e))?;
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let deadline = Instant::now() + spec.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    warn!(command = %spec.display(), "timed out; killing");
                    if let Err(err) = child.kill() {
                        debug!(error = %err, "kill failed (already exited?)");
                    }
                    // Reap so no zombie is left behind.
                    let _ = child.wait();
                    return Err(ProcessError::TimedOut {
                        program: spec.program.clone(),
                        timeout: spec.timeout,
                    });
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(source) => {
                    return Err(ProcessError::Wait {
                        program: spec.program.clone(),
                        source,
                    });
                }
            }
        };

        Ok(ProcessOutput {
            code: status.code(),
            stdout: collect(stdout),
            stderr: collect(stderr),
        })
    }

    fn spawn_detached(&self, spec: &ProcessSpec) -> Result<(), ProcessError> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Some(cwd) = &spec.cwd {
            cmd.current_dir(cwd);
        }
        debug!(command = %spec.display(), "launching detached");
        cmd.spawn()
            .map(|_| ())
            .map_err(|e| ProcessError::from_spawn(&spec.program, e))
    }
}

/// Persists remediation edits under a staged tree with `subcheck-edit`.
#[derive(Debug, Clone)]
pub struct EditProjectSink {
    root: Utf8PathBuf,
    opts: ApplyOptions,
    pub changes: Vec<FileChange>,
}

impl EditProjectSink {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self {
            root,
            opts: ApplyOptions::default(),
            changes: Vec::new(),
        }
    }
}

impl ProjectSink for EditProjectSink {
    fn persist(&mut self, project: &Utf8Path, edits: &[TextEdit]) -> anyhow::Result<()> {
        let change = apply_to_file(&self.root, project, edits, &self.opts)?;
        self.changes.push(change);
        Ok(())
    }
}
