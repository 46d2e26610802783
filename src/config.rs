use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::util::expand_tilde;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub global: Global,
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub application: Application,
    #[serde(default)]
    pub bridge: Bridge,
    #[serde(default)]
    pub polling: Polling,
    #[serde(default)]
    pub timeouts: Timeouts,
    #[serde(default)]
    pub recovery: Recovery,
    #[serde(default)]
    pub batch: Batch,
    #[serde(default)]
    pub packaging: Packaging,
    #[serde(default)]
    pub fonts: Fonts,
    #[serde(default)]
    pub archive: Archive,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub debug: Debug,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("parsing config: {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let cfg: Config = toml::from_str(raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }

    /// A stable, normalization-friendly string for hashing.
    pub fn normalized_for_hash(&self) -> String {
        toml::to_string(self).unwrap_or_default()
    }

    pub fn archive_root(&self) -> PathBuf {
        expand_tilde(&self.paths.archive_root)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Global {
    pub print_summary: bool,
    pub verify_packages: bool,
}
impl Default for Global {
    fn default() -> Self {
        Self {
            print_summary: true,
            verify_packages: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Paths {
    pub archive_root: String,
    /// Where batch logs land. Empty means the archived project directory.
    pub log_dir: String,
}
impl Default for Paths {
    fn default() -> Self {
        Self {
            archive_root: "~/Documents/Archived_Projects".into(),
            log_dir: "".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Application {
    pub name: String,
    pub process_name: String,
    pub document_extension: String,
}
impl Default for Application {
    fn default() -> Self {
        Self {
            name: "Adobe InDesign 2025".into(),
            process_name: "Adobe InDesign 2025".into(),
            document_extension: "indd".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Bridge {
    pub osascript_exe: String,
    pub call_timeout_seconds: u64,
    pub keep_stderr: bool,
}
impl Default for Bridge {
    fn default() -> Self {
        Self {
            osascript_exe: "/usr/bin/osascript".into(),
            call_timeout_seconds: 30,
            keep_stderr: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Polling {
    pub max_checks: u32,
    pub interval_ms: u64,
}
impl Default for Polling {
    fn default() -> Self {
        Self {
            max_checks: 10,
            interval_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Ceiling for open through close of one document.
    pub job_seconds: u64,
    pub package_seconds: u64,
    pub quit_seconds: u64,
    pub kill_seconds: u64,
    pub terminate_wait_ms: u64,
}
impl Default for Timeouts {
    fn default() -> Self {
        Self {
            job_seconds: 90,
            package_seconds: 1200,
            quit_seconds: 30,
            kill_seconds: 10,
            terminate_wait_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextSource {
    StaticTexts,
    EntireContents,
    WindowTitle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dismissal {
    PrimaryButton,
    SecondaryButton,
    ConfirmKey,
    EscapeKey,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Recovery {
    pub text_sources: Vec<TextSource>,
    pub dismiss_order: Vec<Dismissal>,
}
impl Default for Recovery {
    fn default() -> Self {
        Self {
            text_sources: vec![
                TextSource::StaticTexts,
                TextSource::EntireContents,
                TextSource::WindowTitle,
            ],
            dismiss_order: vec![
                Dismissal::PrimaryButton,
                Dismissal::SecondaryButton,
                Dismissal::ConfirmKey,
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Batch {
    pub grace_seconds: u64,
    pub terminate_stale_on_start: bool,
}
impl Default for Batch {
    fn default() -> Self {
        Self {
            grace_seconds: 5,
            terminate_stale_on_start: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Packaging {
    pub suffix: String,
    pub copy_fonts: bool,
    pub copy_linked_graphics: bool,
    pub copy_profiles: bool,
    pub update_graphics: bool,
    pub include_hidden_layers: bool,
    pub ignore_preflight_errors: bool,
    pub include_idml: bool,
    pub include_pdf: bool,
    pub create_report: bool,
}
impl Default for Packaging {
    fn default() -> Self {
        Self {
            suffix: "_Packaged".into(),
            copy_fonts: true,
            copy_linked_graphics: true,
            copy_profiles: true,
            update_graphics: true,
            include_hidden_layers: true,
            ignore_preflight_errors: true,
            include_idml: false,
            include_pdf: false,
            create_report: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Fonts {
    pub enabled: bool,
    pub app_name: String,
    pub load_time_seconds: u64,
    pub refresh_wait_seconds: u64,
    pub hide_after_open: bool,
}
impl Default for Fonts {
    fn default() -> Self {
        Self {
            enabled: true,
            app_name: "Extensis Connect".into(),
            load_time_seconds: 10,
            refresh_wait_seconds: 4,
            hide_after_open: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Archive {
    pub copy_suffixes: Vec<String>,
    pub create_suffixes: Vec<String>,
    pub layout_suffix: String,
    pub printer_pdfs_suffix: String,
    pub print_prefix_suffix: String,
}
impl Default for Archive {
    fn default() -> Self {
        Self {
            copy_suffixes: vec![
                "Digital_Content".into(),
                "Logs".into(),
                "Manuscript".into(),
                "Office".into(),
            ],
            create_suffixes: vec!["Printer_PDFs".into(), "Layout".into()],
            layout_suffix: "Layout".into(),
            printer_pdfs_suffix: "Printer_PDFs".into(),
            print_prefix_suffix: "Print".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Output {
    pub write_log: bool,
    pub log_prefix: String,
    pub write_report_json: bool,
    pub report_filename: String,
}
impl Default for Output {
    fn default() -> Self {
        Self {
            write_log: true,
            log_prefix: "batch-log".into(),
            write_report_json: true,
            report_filename: "batch-report.json".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: false,
            file_path: "".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Debug {
    pub dump_effective_config: bool,
}
impl Default for Debug {
    fn default() -> Self {
        Self {
            dump_effective_config: false,
        }
    }
}
