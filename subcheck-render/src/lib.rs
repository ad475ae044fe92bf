//! Rendering helpers for the console checklist and the JSON report.

use owo_colors::OwoColorize;
use std::io::{IsTerminal, Write};
use subcheck_domain::Reporter;
use subcheck_types::check::{CheckRecord, Entry};
use subcheck_types::report::SubmissionReport;
use tracing::warn;

/// Colors are used when stdout is a terminal and `NO_COLOR` is unset.
pub fn use_colors() -> bool {
    std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal()
}

fn indent(depth: u8) -> String {
    "\t".repeat(depth as usize)
}

/// One checklist line, without trailing newline.
pub fn format_entry(entry: &Entry, color: bool) -> String {
    match entry {
        Entry::Heading { depth, text } => format!("{}{}", indent(*depth), text),
        Entry::Check(record) => format_check(record, color),
    }
}

fn format_check(record: &CheckRecord, color: bool) -> String {
    let prefix = format!("{}{}....", indent(record.depth), record.description);
    if record.status.is_pass() {
        let marker = if color {
            "OK".green().to_string()
        } else {
            "OK".to_string()
        };
        return format!("{prefix}{marker}");
    }

    let marker = if color {
        "NOK".red().to_string()
    } else {
        "NOK".to_string()
    };
    format!("{prefix}{marker}{}", record.reason.as_deref().unwrap_or(""))
}

pub fn summary_line(issues: u64) -> String {
    format!("Found {issues} issue(s).")
}

pub fn render_report_json(report: &SubmissionReport) -> anyhow::Result<String> {
    let mut out = serde_json::to_string_pretty(report)?;
    out.push('\n');
    Ok(out)
}

/// Streams checklist lines to a writer as they are produced.
pub struct ConsoleReporter<W: Write> {
    out: W,
    color: bool,
}

impl ConsoleReporter<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout(), use_colors())
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self { out, color }
    }

    /// Print a plain line that is not part of the checklist.
    pub fn line(&mut self, text: &str) {
        if let Err(err) = writeln!(self.out, "{text}") {
            warn!(error = %err, "console write failed");
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn emit(&mut self, entry: &Entry) {
        let line = format_entry(entry, self.color);
        self.line(&line);
    }
}
