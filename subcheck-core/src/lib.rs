//! Embeddable core library for subcheck.
//!
//! Provides a clap-free entry point that stages a submission archive, runs
//! the rule engine over it and optionally rebuilds or opens it.
//!
//! # Port traits
//!
//! External effects go through the traits in [`ports`]:
//! - [`ArchiveStager`](ports::ArchiveStager) extracts the archive
//! - [`ProcessRunner`](ports::ProcessRunner) spawns devenv, cmake, vswhere and code
//!
//! The [`adapters`] module provides the real implementations.
//!
//! # Entry point
//!
//! - [`run_submission`](pipeline::run_submission)

pub mod adapters;
pub mod build_trigger;
pub mod discovery;
pub mod pipeline;
pub mod ports;
pub mod settings;
pub mod staging;
pub mod toolchain;

// Re-export the domain types callers need so they don't depend on subcheck-domain directly.
pub use subcheck_domain::{
    CMakeVersionPolicy, DEFAULT_SUBMISSION_PATTERN, NullReporter, PolicyError, Reporter, RulePolicy,
};
