//! Domain logic: evaluate a staged submission against the course rules.
//!
//! This crate owns *what* is checked and how issues are counted. It does not
//! own staging, process spawning or writing project files back to disk; those
//! live in `subcheck-core` and `subcheck-edit`.

mod checklist;
mod policy;
mod ports;
mod project;
pub mod rules;
mod solution;

#[cfg(test)]
mod test_support;

pub use checklist::{Checklist, NullReporter, Reporter};
pub use policy::{CMakeVersionPolicy, DEFAULT_SUBMISSION_PATTERN, PolicyError, RulePolicy};
pub use ports::{FsTreeView, ProjectSink, TreeView, join_normalized};
pub use project::{
    ClCompileSlot, ConfigurationView, ProjectModel, ProjectParseError, Property, PropertyOrigin,
};
pub use solution::{ConfigKey, ProjectRef, Solution, SolutionParseError};
