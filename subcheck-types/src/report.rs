use crate::check::{CheckRecord, CheckStatus, Entry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionReport {
    pub schema: String,
    pub tool: ToolInfo,
    pub run: RunInfo,

    /// Archive that was analyzed, as given on the command line.
    pub archive: String,

    pub verdict: Verdict,

    #[serde(default)]
    pub checks: Vec<CheckRecord>,

    /// Project files rewritten by remediation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remediated: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    pub status: CheckStatus,
    pub issues: u64,
    pub checks_passed: u64,
    pub checks_failed: u64,
}

impl Verdict {
    pub fn from_checks(checks: &[CheckRecord]) -> Self {
        let issues = checks.iter().map(|c| c.issues).sum();
        let checks_failed = checks.iter().filter(|c| c.status.is_fail()).count() as u64;
        Self {
            status: if issues == 0 {
                CheckStatus::Pass
            } else {
                CheckStatus::Fail
            },
            issues,
            checks_passed: checks.len() as u64 - checks_failed,
            checks_failed,
        }
    }
}

impl SubmissionReport {
    pub fn new(tool: ToolInfo, archive: impl Into<String>, entries: &[Entry]) -> Self {
        let checks: Vec<CheckRecord> = entries
            .iter()
            .filter_map(|e| match e {
                Entry::Check(c) => Some(c.clone()),
                Entry::Heading { .. } => None,
            })
            .collect();
        Self {
            schema: crate::schema::SUBCHECK_REPORT_V1.to_string(),
            tool,
            run: RunInfo::default(),
            archive: archive.into(),
            verdict: Verdict::from_checks(&checks),
            checks,
            remediated: Vec::new(),
        }
    }
}
