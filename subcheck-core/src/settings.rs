//! Clap-free settings for a submission run.

use camino::{Utf8Path, Utf8PathBuf};
use std::time::Duration;
use subcheck_types::version::ToolVersion;

/// Where the archive is extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagingMode {
    /// `<tmp>/subcheck/<stem>`, removed after the run.
    Temporary,
    /// `<archive dir>/<stem>`, kept.
    BesideArchive,
}

#[derive(Debug, Clone)]
pub struct RunSettings {
    pub archive: Utf8PathBuf,

    // Behaviour
    pub build_after_report: bool,
    pub open_after_report: bool,
    /// Remediate without building.
    pub fix: bool,
    pub use_temp_staging: bool,

    // Toolchain
    pub vs_major_version: u64,
    pub vs_install_path: Option<Utf8PathBuf>,
    pub cmake_generator: String,
    pub min_code_version: ToolVersion,
    pub process_timeout: Duration,

    /// Directory for `build_<cfg>_<platform>.log` files.
    pub log_dir: Utf8PathBuf,
    pub temp_root: Utf8PathBuf,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            archive: Utf8PathBuf::new(),
            build_after_report: false,
            open_after_report: false,
            fix: false,
            use_temp_staging: true,
            vs_major_version: 17,
            vs_install_path: None,
            cmake_generator: "Visual Studio 17 2022".to_string(),
            min_code_version: ToolVersion::new(1, 82, 0),
            process_timeout: Duration::from_secs(600),
            log_dir: Utf8PathBuf::from("."),
            temp_root: Utf8PathBuf::from_path_buf(std::env::temp_dir())
                .unwrap_or_else(|_| Utf8PathBuf::from(".")),
        }
    }
}

impl RunSettings {
    pub fn remediate(&self) -> bool {
        self.build_after_report || self.fix
    }

    /// The IDE keeps the tree open, so opening forces staging beside the archive.
    pub fn staging_mode(&self) -> StagingMode {
        if self.use_temp_staging && !self.open_after_report {
            StagingMode::Temporary
        } else {
            StagingMode::BesideArchive
        }
    }

    pub fn staging_dir(&self) -> Utf8PathBuf {
        let stem = self.archive.file_stem().unwrap_or("submission");
        match self.staging_mode() {
            StagingMode::Temporary => self.temp_root.join("subcheck").join(stem),
            StagingMode::BesideArchive => self
                .archive
                .parent()
                .unwrap_or(Utf8Path::new(""))
                .join(stem),
        }
    }

    pub fn needs_ide(&self) -> bool {
        self.build_after_report || self.open_after_report
    }
}
