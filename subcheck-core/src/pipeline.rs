//! The submission pipeline, extracted from the CLI.
//!
//! Stage → discover → rules → optional rebuild/open → cleanup. All external
//! effects go through the port traits; everything that goes wrong after the
//! archive has been found is reported as an issue, not an error.

use crate::adapters::EditProjectSink;
use crate::build_trigger::BuildTrigger;
use crate::discovery::{Discovery, discover};
use crate::ports::{ArchiveStager, ProcessRunner, StageError};
use crate::settings::{RunSettings, StagingMode};
use crate::staging::StagedSubmission;
use crate::toolchain::{locate_devenv, query_cmake_version};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use fs_err as fs;
use subcheck_domain::rules::{analyze_solution, check_clean_folder, check_cmake_lists, check_file_name};
use subcheck_domain::{Checklist, FsTreeView, Reporter, RulePolicy, Solution, TreeView};
use subcheck_types::check::{Entry, check_ids};
use subcheck_types::report::{SubmissionReport, ToolInfo};
use tracing::{debug, info, warn};

/// Conditions that stop the run before any analysis.
#[derive(Debug, thiserror::Error)]
pub enum FatalError {
    #[error("File not found: {0}")]
    ArchiveNotFound(Utf8PathBuf),

    #[error("Visual Studio {major} could not be found (set vs_install_path or install it)")]
    IdeNotFound { major: u64 },
}

/// Outcome of `run_submission`.
#[derive(Debug)]
pub struct RunOutcome {
    pub issues: u64,
    pub entries: Vec<Entry>,
    pub report: SubmissionReport,
    /// Project files rewritten by remediation (absolute when staged in place).
    pub remediated: Vec<Utf8PathBuf>,
    /// Staging directory left on disk, if any.
    pub staged_dir: Option<Utf8PathBuf>,
}

fn absolute(path: &Utf8Path) -> Utf8PathBuf {
    std::path::absolute(path)
        .ok()
        .and_then(|p| Utf8PathBuf::from_path_buf(p).ok())
        .unwrap_or_else(|| path.to_path_buf())
}

/// Run the whole pipeline for one archive.
///
/// Entries are streamed to `reporter` as they are produced; the returned
/// outcome carries the same entries plus the report document.
pub fn run_submission(
    settings: &RunSettings,
    policy: &RulePolicy,
    stager: &dyn ArchiveStager,
    runner: &dyn ProcessRunner,
    reporter: &mut dyn Reporter,
    tool: ToolInfo,
) -> Result<RunOutcome, FatalError> {
    let started_at = Utc::now();

    if !settings.archive.is_file() {
        return Err(FatalError::ArchiveNotFound(settings.archive.clone()));
    }

    let devenv = if settings.needs_ide() {
        let found = locate_devenv(
            runner,
            settings.vs_install_path.as_deref(),
            settings.vs_major_version,
            settings.process_timeout,
        );
        Some(found.ok_or(FatalError::IdeNotFound {
            major: settings.vs_major_version,
        })?)
    } else {
        None
    };

    let mut policy = policy.clone();
    policy.remediate = settings.remediate();

    let mut list = Checklist::new(reporter);
    list.heading(0, format!("Analyzing {}", settings.archive));
    check_file_name(&mut list, &policy, &settings.archive);

    let staged = StagedSubmission::new(
        settings.staging_dir(),
        settings.staging_mode() == StagingMode::Temporary,
    );
    let mut remediated = Vec::new();

    match stager.stage(&settings.archive, staged.dir()) {
        Ok(()) => {
            let stage = Stage {
                settings,
                policy: &policy,
                runner,
                devenv: devenv.as_deref(),
                root: staged.dir(),
            };
            remediated = stage.analyze(&mut list);
        }
        Err(StageError::Format { message, .. }) => {
            list.fail(
                check_ids::ARCHIVE_FORMAT,
                0,
                "File format (zip)",
                Some(format!(" - {message}")),
            );
        }
        Err(StageError::Extract { dest, source }) => {
            list.fail(
                check_ids::ARCHIVE_EXTRACT,
                0,
                format!("Unzip into {dest}"),
                Some(format!(" - {source}")),
            );
        }
    }

    let staged_dir = staged.finish();
    let issues = list.issues();
    let entries = list.into_entries();
    info!(archive = %settings.archive, issues, "submission analyzed");

    let mut report = SubmissionReport::new(tool, settings.archive.as_str(), &entries);
    report.run.started_at = Some(started_at);
    report.run.ended_at = Some(Utc::now());
    report.remediated = remediated.iter().map(|p| p.to_string()).collect();

    Ok(RunOutcome {
        issues,
        entries,
        report,
        remediated,
        staged_dir,
    })
}

/// Analysis of a successfully staged tree.
struct Stage<'a> {
    settings: &'a RunSettings,
    policy: &'a RulePolicy,
    runner: &'a dyn ProcessRunner,
    devenv: Option<&'a Utf8Path>,
    root: &'a Utf8Path,
}

impl Stage<'_> {
    fn trigger(&self) -> BuildTrigger<'_> {
        BuildTrigger {
            runner: self.runner,
            timeout: self.settings.process_timeout,
            log_dir: &self.settings.log_dir,
        }
    }

    fn analyze(&self, list: &mut Checklist<'_>) -> Vec<Utf8PathBuf> {
        let found = match discover(list, self.root) {
            Ok(found) => found,
            Err(err) => {
                warn!(root = %self.root, error = %err, "discovery failed");
                list.fail(
                    check_ids::SOLUTION_COUNT,
                    0,
                    "Found exactly one solution",
                    Some(format!(" - {err:#}")),
                );
                return Vec::new();
            }
        };

        match found {
            Discovery::Solution(sln) => self.analyze_solution(list, &sln),
            Discovery::CMake(lists) => {
                self.analyze_cmake(list, &lists);
                Vec::new()
            }
            Discovery::Nothing => Vec::new(),
        }
    }

    fn analyze_solution(&self, list: &mut Checklist<'_>, sln: &Utf8Path) -> Vec<Utf8PathBuf> {
        let tree = FsTreeView::new(self.root.to_path_buf());
        let mut sink = EditProjectSink::new(self.root.to_path_buf());
        let analysis = analyze_solution(list, self.policy, &tree, sln, &mut sink);
        let remediated = analysis
            .remediated
            .iter()
            .map(|p| self.root.join(p))
            .collect();

        let (Some(solution), Some(devenv)) = (&analysis.solution, self.devenv) else {
            return remediated;
        };
        let sln_abs = absolute(&self.root.join(sln));
        if self.settings.build_after_report {
            self.trigger().rebuild_solution(
                list,
                self.policy,
                devenv,
                &sln_abs,
                &solution.configurations,
            );
        }
        if self.settings.open_after_report {
            self.trigger().open_solution(list, devenv, &sln_abs);
        }
        remediated
    }

    fn analyze_cmake(&self, list: &mut Checklist<'_>, lists: &Utf8Path) {
        let tree = FsTreeView::new(self.root.to_path_buf());
        let lists_dir = lists.parent().unwrap_or(Utf8Path::new(""));
        check_clean_folder(list, self.policy, &tree, lists_dir);

        let text = match tree.read_to_string(lists) {
            Ok(text) => text,
            Err(err) => {
                list.fail(
                    check_ids::PROJECT_PARSE,
                    0,
                    format!("{lists} is readable"),
                    Some(format!(" - {err:#}")),
                );
                return;
            }
        };

        list.heading(0, format!("Analyzing {lists}"));
        let local = query_cmake_version(self.runner, self.settings.process_timeout);
        check_cmake_lists(list, self.policy, &text, local.as_ref());

        let source_dir = absolute(&self.root.join(lists_dir));
        if self.settings.build_after_report
            && let Some(devenv) = self.devenv
        {
            self.build_cmake(list, devenv, &source_dir);
        }
        if self.settings.open_after_report {
            self.trigger()
                .open_folder(list, &source_dir, &self.settings.min_code_version);
        }
    }

    fn build_cmake(&self, list: &mut Checklist<'_>, devenv: &Utf8Path, source_dir: &Utf8Path) {
        let trigger = self.trigger();
        let Some(sln) = trigger.generate_cmake(list, &self.settings.cmake_generator, source_dir)
        else {
            return;
        };

        let parsed = fs::read_to_string(&sln)
            .map_err(anyhow::Error::from)
            .and_then(|text| Solution::parse(&text).map_err(anyhow::Error::from));
        match parsed {
            Ok(solution) => {
                debug!(solution = %sln, configurations = solution.configurations.len(), "generated solution");
                trigger.rebuild_solution(list, self.policy, devenv, &sln, &solution.configurations);
            }
            Err(err) => {
                list.fail(
                    check_ids::PROJECT_PARSE,
                    0,
                    format!("Solution {sln} is readable"),
                    Some(format!(" - {err:#}")),
                );
            }
        }
    }
}
