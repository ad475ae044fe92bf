mod config;

use anyhow::Context;
use camino::Utf8PathBuf;
use clap::Parser;
use config::{CliOverrides, ConfigMerger};
use fs_err as fs;
use std::io::{BufRead, IsTerminal};
use std::process::ExitCode;
use subcheck_core::adapters::{SystemProcessRunner, ZipStager};
use subcheck_core::pipeline::run_submission;
use subcheck_render::{ConsoleReporter, render_report_json, summary_line};
use subcheck_types::report::ToolInfo;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "subcheck",
    version,
    about = "Checks a C++ course submission archive against the course rules."
)]
struct Cli {
    /// Submission archive. Several words are joined with spaces, so unquoted
    /// paths containing spaces still work.
    #[arg(value_name = "ARCHIVE", required = true, num_args = 1..)]
    archive: Vec<String>,

    /// Config file (created with defaults when missing).
    #[arg(long, default_value = config::CONFIG_FILE_NAME)]
    config: Utf8PathBuf,

    /// Fix warning settings, then rebuild every configuration with Visual Studio.
    #[arg(long, default_value_t = false)]
    build: bool,

    /// Open the extracted submission in Visual Studio (or VS Code for CMake) afterwards.
    #[arg(long, default_value_t = false)]
    open: bool,

    /// Fix warning settings in the extracted project files without building.
    #[arg(long, default_value_t = false)]
    fix: bool,

    /// Extract next to the archive instead of the temp directory, and keep it.
    #[arg(long, default_value_t = false)]
    no_temp: bool,

    /// Write a JSON report to this path.
    #[arg(long)]
    report: Option<Utf8PathBuf>,

    /// Directory for build logs.
    #[arg(long)]
    log_dir: Option<Utf8PathBuf>,

    /// Do not wait for a key press before exiting.
    #[arg(long, default_value_t = false)]
    no_pause: bool,

    /// Debug logging on stderr (ignored when RUST_LOG is set).
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    // RUST_LOG wins; otherwise warnings only, or debug output for our crates.
    let env_filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if verbose {
        EnvFilter::new("warn,subcheck=debug,subcheck_core=debug,subcheck_domain=debug,subcheck_edit=debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    // Usage errors exit with code 2 inside clap.
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let no_pause = cli.no_pause;

    let code = match real_main(cli) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(1),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(2)
        }
    };

    if !no_pause && std::io::stdin().is_terminal() {
        println!("Done, press a key to close.");
        let mut line = String::new();
        if let Err(err) = std::io::stdin().lock().read_line(&mut line) {
            debug!("stdin closed: {}", err);
        }
    }
    code
}

/// Returns the issue count.
fn real_main(cli: Cli) -> anyhow::Result<u64> {
    let archive = Utf8PathBuf::from(cli.archive.join(" "));

    let file_config = config::load_or_create_default(&cli.config)
        .with_context(|| format!("load {}", cli.config))?;
    let policy = file_config
        .rule_policy()
        .with_context(|| format!("invalid rule settings in {}", cli.config))?;
    let overrides = CliOverrides {
        build: cli.build,
        open: cli.open,
        fix: cli.fix,
        no_temp: cli.no_temp,
        log_dir: cli.log_dir,
    };
    let settings = ConfigMerger::new(file_config).merge_run_args(archive, &overrides);
    debug!(
        "run settings: build={}, open={}, fix={}, temp_staging={}, log_dir={}",
        settings.build_after_report,
        settings.open_after_report,
        settings.fix,
        settings.use_temp_staging,
        settings.log_dir
    );

    if !settings.log_dir.as_str().is_empty() {
        fs::create_dir_all(&settings.log_dir)
            .with_context(|| format!("create {}", settings.log_dir))?;
    }

    let tool = ToolInfo {
        name: "subcheck".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    let mut console = ConsoleReporter::stdout();
    let outcome = run_submission(
        &settings,
        &policy,
        &ZipStager,
        &SystemProcessRunner,
        &mut console,
        tool,
    )?;

    console.line(&summary_line(outcome.issues));

    if let Some(dir) = &outcome.staged_dir {
        info!("extracted submission kept at {}", dir);
    }
    for path in &outcome.remediated {
        info!("rewrote {}", path);
    }

    if let Some(path) = &cli.report {
        let json = render_report_json(&outcome.report)?;
        fs::write(path, json).with_context(|| format!("write {}", path))?;
        info!("wrote report to {}", path);
    }

    Ok(outcome.issues)
}
