//! Shared DTOs for the subcheck workspace.
//!
//! # Design constraints
//! - Check records and reports are serialized to disk (`--report`).
//! - Be conservative with breaking changes.
//! - Prefer adding optional fields over changing semantics.

pub mod check;
pub mod edit;
pub mod report;
pub mod version;

/// Schema identifiers.
pub mod schema {
    pub const SUBCHECK_REPORT_V1: &str = "subcheck.report.v1";
}
