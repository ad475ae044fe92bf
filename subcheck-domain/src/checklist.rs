use subcheck_types::check::{CheckRecord, Entry};
use tracing::debug;

/// Sink for checklist lines as they are produced.
pub trait Reporter {
    fn emit(&mut self, entry: &Entry);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn emit(&mut self, _entry: &Entry) {}
}

/// Running list of evaluated checks and the issue count.
///
/// Every rule reports through here; the returned value is the number of
/// issues the call added, so callers can fold it into their own tallies.
pub struct Checklist<'r> {
    reporter: &'r mut dyn Reporter,
    entries: Vec<Entry>,
    issues: u64,
}

impl<'r> Checklist<'r> {
    pub fn new(reporter: &'r mut dyn Reporter) -> Self {
        Self {
            reporter,
            entries: Vec::new(),
            issues: 0,
        }
    }

    pub fn heading(&mut self, depth: u8, text: impl Into<String>) {
        self.push(Entry::Heading {
            depth,
            text: text.into(),
        });
    }

    pub fn pass(&mut self, check_id: &str, depth: u8, description: impl Into<String>) -> u64 {
        self.push(Entry::Check(CheckRecord::pass(check_id, depth, description)));
        0
    }

    pub fn fail(
        &mut self,
        check_id: &str,
        depth: u8,
        description: impl Into<String>,
        reason: Option<String>,
    ) -> u64 {
        self.fail_weighted(check_id, depth, description, reason, 1)
    }

    /// A failing line that counts for `issues` issues (at least one).
    pub fn fail_weighted(
        &mut self,
        check_id: &str,
        depth: u8,
        description: impl Into<String>,
        reason: Option<String>,
        issues: u64,
    ) -> u64 {
        let issues = issues.max(1);
        let record = CheckRecord::fail(check_id, depth, description, reason, issues);
        debug!(check = %record.check_id, issues, "check failed");
        self.issues += issues;
        self.push(Entry::Check(record));
        issues
    }

    pub fn assert(
        &mut self,
        check_id: &str,
        depth: u8,
        condition: bool,
        description: impl Into<String>,
        reason: Option<String>,
    ) -> u64 {
        if condition {
            self.pass(check_id, depth, description)
        } else {
            self.fail(check_id, depth, description, reason)
        }
    }

    pub fn issues(&self) -> u64 {
        self.issues
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<Entry> {
        self.entries
    }

    fn push(&mut self, entry: Entry) {
        self.reporter.emit(&entry);
        self.entries.push(entry);
    }
}
