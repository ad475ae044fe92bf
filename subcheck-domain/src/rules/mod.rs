//! Compliance rules and the per-solution driver.

mod clean_folder;
mod cmake;
mod configuration;
mod headers;
mod naming;
mod solution_version;

pub use clean_folder::check_clean_folder;
pub use cmake::{check_cmake_lists, declared_minimum_version};
pub use configuration::PropertyVerdict;
pub use headers::find_using_namespace;
pub use naming::check_file_name;
pub use solution_version::check_solution_version;

use crate::checklist::Checklist;
use crate::policy::RulePolicy;
use crate::ports::{ProjectSink, TreeView, join_normalized};
use crate::project::ProjectModel;
use crate::solution::{ProjectRef, Solution};
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::BTreeSet;
use subcheck_types::check::check_ids;
use subcheck_types::edit::TextEdit;
use tracing::{debug, info, warn};

/// What the solution pass leaves behind for later stages.
#[derive(Debug, Default)]
pub struct SolutionAnalysis {
    /// `None` when the solution file could not be read or parsed.
    pub solution: Option<Solution>,
    pub projects_analyzed: usize,
    /// Project files that remediation rewrote.
    pub remediated: Vec<Utf8PathBuf>,
}

/// Run every solution-path rule against `sln_path` (relative to the tree root).
pub fn analyze_solution(
    list: &mut Checklist<'_>,
    policy: &RulePolicy,
    tree: &dyn TreeView,
    sln_path: &Utf8Path,
    sink: &mut dyn ProjectSink,
) -> SolutionAnalysis {
    let mut analysis = SolutionAnalysis::default();
    let sln_dir = sln_path.parent().unwrap_or(Utf8Path::new(""));
    let sln_name = sln_path.file_name().unwrap_or(sln_path.as_str());

    let text = match tree.read_to_string(sln_path) {
        Ok(text) => text,
        Err(err) => {
            list.fail(
                check_ids::PROJECT_PARSE,
                0,
                format!("Solution {sln_name} is readable"),
                Some(format!(" - {err:#}")),
            );
            return analysis;
        }
    };

    check_solution_version(list, policy, &text);

    let mut cleaned = BTreeSet::new();
    cleaned.insert(sln_dir.to_path_buf());
    check_clean_folder(list, policy, tree, sln_dir);

    let solution = match Solution::parse(&text) {
        Ok(solution) => solution,
        Err(err) => {
            list.fail(
                check_ids::PROJECT_PARSE,
                0,
                format!("Solution {sln_name} is readable"),
                Some(format!(" - {err}")),
            );
            return analysis;
        }
    };
    debug!(
        solution = %sln_path,
        projects = solution.projects.len(),
        configurations = solution.configurations.len(),
        "parsed solution"
    );

    for project_ref in &solution.projects {
        let project_path = join_normalized(sln_dir, &project_ref.relative_path);
        let project_dir = project_path.parent().unwrap_or(Utf8Path::new("")).to_path_buf();
        let file_name = project_path
            .file_name()
            .unwrap_or(project_path.as_str())
            .to_string();

        if cleaned.insert(project_dir.clone()) {
            check_clean_folder(list, policy, tree, &project_dir);
        }

        if !tree.exists(&project_path) {
            list.fail(
                check_ids::PROJECT_EXISTS,
                0,
                format!("Project {file_name} could not be found"),
                None,
            );
            continue;
        }

        let model = match tree
            .read_to_string(&project_path)
            .map_err(|err| format!("{err:#}"))
            .and_then(|text| {
                ProjectModel::parse(&project_path, &text, tree).map_err(|err| err.to_string())
            }) {
            Ok(model) => model,
            Err(reason) => {
                list.fail(
                    check_ids::PROJECT_PARSE,
                    0,
                    format!("Project {file_name} is a valid project file"),
                    Some(format!(" - {reason}")),
                );
                continue;
            }
        };

        list.heading(0, format!("Analyzing {file_name}"));
        let edits = analyze_project(list, policy, tree, &solution, project_ref, &model);
        analysis.projects_analyzed += 1;

        if edits.is_empty() {
            continue;
        }
        match sink.persist(&project_path, &edits) {
            Ok(()) => {
                info!(project = %project_path, edits = edits.len(), "remediated project file");
                analysis.remediated.push(project_path);
            }
            Err(err) => {
                list.fail(
                    check_ids::PROJECT_SAVE,
                    0,
                    format!("Save {file_name}"),
                    Some(format!(" - {err:#}")),
                );
            }
        }
    }

    analysis.solution = Some(solution);
    analysis
}

/// Per-configuration rules for one project. Returns the remediation edits
/// gathered across all configurations (empty unless remediation is enabled).
pub fn analyze_project(
    list: &mut Checklist<'_>,
    policy: &RulePolicy,
    tree: &dyn TreeView,
    solution: &Solution,
    project_ref: &ProjectRef,
    model: &ProjectModel,
) -> Vec<TextEdit> {
    let mut edits = Vec::new();

    for key in solution
        .configurations
        .iter()
        .filter(|k| policy.is_recognized_configuration(&k.configuration))
    {
        let project_key = solution.project_configuration(project_ref, key);
        list.heading(1, format!("Configuration {project_key}"));

        if !model.configurations().is_empty() && !model.declares(&project_key) {
            warn!(project = %model.path(), config = %project_key, "configuration not declared by project");
        }

        let view = model.configuration(&project_key);
        configuration::check_configuration(list, policy, &view, &mut edits);
        headers::check_headers(list, tree, &view);
    }

    edits
}
