//! Project folder archiving: the directory copies and creations that run
//! before the batch, plus discovery of the layout documents to package.

use crate::config::Config;
use crate::job::DocumentJob;
use crate::util::ensure_dir;
use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProjectNameError {
    #[error("project folder name {0:?} must look like <id>_<semester>_<last name>[_<print type>]")]
    TooFewParts(String),
}

/// Parsed project folder name, e.g. `11492_S24_Monroe_Color`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectName {
    pub id: String,
    pub semester: String,
    pub last_name: String,
    pub print_type: Option<String>,
}

impl ProjectName {
    pub fn parse(folder_name: &str) -> Result<Self, ProjectNameError> {
        let parts: Vec<&str> = folder_name.split('_').collect();
        if parts.len() < 3 || parts[..3].iter().any(|p| p.is_empty()) {
            return Err(ProjectNameError::TooFewParts(folder_name.to_string()));
        }
        Ok(Self {
            id: parts[0].to_string(),
            semester: parts[1].to_string(),
            last_name: parts[2].to_string(),
            print_type: parts.get(3).map(|s| s.to_string()),
        })
    }

    /// Name of the archived project directory: `<id>_<last name>`.
    pub fn archive_name(&self) -> String {
        format!("{}_{}", self.id, self.last_name)
    }

    pub fn subdir(&self, suffix: &str) -> String {
        format!("{}_{}", self.id, suffix)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Copied,
    Created,
    AlreadyExists,
    SourceNotFound,
    Error(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrefixCopy {
    pub copied: Vec<String>,
    pub skipped: Vec<(String, String)>,
}

/// Copy every immediate subdirectory of `source_root` whose name matches
/// `name_pattern` into `dest_root`. Existing destinations are left alone.
pub fn copy_named_subdirectories(
    source_root: &Path,
    dest_root: &Path,
    name_pattern: &Regex,
) -> Result<BTreeMap<String, EntryStatus>> {
    ensure_dir(dest_root)?;
    let mut status = BTreeMap::new();
    let entries = std::fs::read_dir(source_root)
        .with_context(|| format!("read_dir {}", source_root.display()))?;

    for entry in entries {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !entry.file_type()?.is_dir() || !name_pattern.is_match(&name) {
            continue;
        }
        let dest = dest_root.join(&name);
        let st = if dest.exists() {
            EntryStatus::AlreadyExists
        } else {
            match copy_tree(&entry.path(), &dest) {
                Ok(()) => EntryStatus::Copied,
                Err(e) => EntryStatus::Error(format!("{e:#}")),
            }
        };
        info!("{name}: {st:?}");
        status.insert(name, st);
    }
    Ok(status)
}

pub fn create_named_subdirectories(root: &Path, names: &[String]) -> BTreeMap<String, EntryStatus> {
    names
        .iter()
        .map(|name| {
            let path = root.join(name);
            let st = if path.is_dir() {
                EntryStatus::AlreadyExists
            } else {
                match ensure_dir(&path) {
                    Ok(()) => EntryStatus::Created,
                    Err(e) => EntryStatus::Error(format!("{e:#}")),
                }
            };
            debug!("{}: {st:?}", path.display());
            (name.clone(), st)
        })
        .collect()
}

/// Copy regular files in `source_dir` whose names start with `prefix`.
/// Files already present in `dest_dir` are skipped, not overwritten.
pub fn copy_files_by_prefix(source_dir: &Path, dest_dir: &Path, prefix: &str) -> Result<PrefixCopy> {
    ensure_dir(dest_dir)?;
    let mut out = PrefixCopy::default();
    let entries = std::fs::read_dir(source_dir)
        .with_context(|| format!("read_dir {}", source_dir.display()))?;

    for entry in entries {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with(prefix) || !entry.file_type()?.is_file() {
            continue;
        }
        let dest = dest_dir.join(&name);
        if dest.exists() {
            out.skipped.push((name, "already exists".into()));
            continue;
        }
        match std::fs::copy(entry.path(), &dest) {
            Ok(_) => out.copied.push(name),
            Err(e) => out.skipped.push((name, e.to_string())),
        }
    }
    out.copied.sort();
    out.skipped.sort();
    info!(
        "copied {} files with prefix {prefix}, skipped {}",
        out.copied.len(),
        out.skipped.len()
    );
    Ok(out)
}

fn copy_tree(src: &Path, dest: &Path) -> Result<()> {
    ensure_dir(dest)?;
    for entry in std::fs::read_dir(src).with_context(|| format!("read_dir {}", src.display()))? {
        let entry = entry?;
        let target = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_tree(&entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), &target)
                .with_context(|| format!("copy {}", entry.path().display()))?;
        }
    }
    Ok(())
}

/// Files of zero bytes under `root`, recursively.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SizeCheck {
    pub checked: usize,
    pub empty_files: Vec<PathBuf>,
}

impl SizeCheck {
    pub fn ok(&self) -> bool {
        self.empty_files.is_empty()
    }
}

pub fn verify_nonzero_file_sizes(root: &Path) -> Result<SizeCheck> {
    if !root.is_dir() {
        anyhow::bail!("not a directory: {}", root.display());
    }
    let mut check = SizeCheck::default();
    walk_sizes(root, &mut check)?;
    check.empty_files.sort();
    for f in &check.empty_files {
        warn!("empty file: {}", f.display());
    }
    Ok(check)
}

fn walk_sizes(dir: &Path, check: &mut SizeCheck) -> Result<()> {
    for entry in std::fs::read_dir(dir).with_context(|| format!("read_dir {}", dir.display()))? {
        let entry = entry?;
        let ft = entry.file_type()?;
        if ft.is_dir() {
            walk_sizes(&entry.path(), check)?;
        } else if ft.is_file() {
            check.checked += 1;
            if entry.metadata()?.len() == 0 {
                check.empty_files.push(entry.path());
            }
        }
    }
    Ok(())
}

/// Every `*.<extension>` file directly in `dir`, sorted by path.
pub fn discover_documents(dir: &Path, extension: &str) -> Result<Vec<DocumentJob>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("read_dir {}", dir.display()))? {
        let path = entry?.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(extension));
        if matches && path.is_file() {
            paths.push(std::path::absolute(&path).unwrap_or(path));
        }
    }
    paths.sort();
    Ok(paths.into_iter().map(DocumentJob::new).collect())
}

/// Where everything for one project goes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchivePlan {
    pub project: ProjectName,
    pub source_dir: PathBuf,
    pub archived_project_dir: PathBuf,
    pub source_layout_dir: PathBuf,
    pub archived_layout_dir: PathBuf,
    pub archived_printer_pdfs_dir: PathBuf,
}

impl ArchivePlan {
    pub fn new(cfg: &Config, source_dir: &Path) -> Result<Self> {
        let folder = source_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("project dir has no name: {}", source_dir.display()))?;
        let project = ProjectName::parse(&folder)?;
        let archived_project_dir = cfg.archive_root().join(project.archive_name());
        Ok(Self {
            source_layout_dir: source_dir.join(project.subdir(&cfg.archive.layout_suffix)),
            archived_layout_dir: archived_project_dir.join(project.subdir(&cfg.archive.layout_suffix)),
            archived_printer_pdfs_dir: archived_project_dir
                .join(project.subdir(&cfg.archive.printer_pdfs_suffix)),
            archived_project_dir,
            source_dir: source_dir.to_path_buf(),
            project,
        })
    }

    /// Anchored pattern matching the subdirectories to carry over.
    pub fn copy_pattern(&self, cfg: &Config) -> Result<Regex> {
        let alts = cfg
            .archive
            .copy_suffixes
            .iter()
            .map(|s| regex::escape(s))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = format!("^{}_(?:{})$", regex::escape(&self.project.id), alts);
        Regex::new(&pattern).with_context(|| format!("building pattern {pattern}"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveOutcome {
    pub copied: BTreeMap<String, EntryStatus>,
    pub created: BTreeMap<String, EntryStatus>,
    pub print_files: PrefixCopy,
}

/// Run the whole archive step for `plan`.
pub fn archive_project(cfg: &Config, plan: &ArchivePlan) -> Result<ArchiveOutcome> {
    ensure_dir(&plan.archived_project_dir)?;
    info!(
        "archiving {} -> {}",
        plan.source_dir.display(),
        plan.archived_project_dir.display()
    );

    let mut copied = copy_named_subdirectories(
        &plan.source_dir,
        &plan.archived_project_dir,
        &plan.copy_pattern(cfg)?,
    )?;
    for suffix in &cfg.archive.copy_suffixes {
        let name = plan.project.subdir(suffix);
        if !copied.contains_key(&name) {
            warn!("{name} not found in source directory");
            copied.insert(name, EntryStatus::SourceNotFound);
        }
    }

    let names: Vec<String> = cfg
        .archive
        .create_suffixes
        .iter()
        .map(|s| plan.project.subdir(s))
        .collect();
    let created = create_named_subdirectories(&plan.archived_project_dir, &names);

    let prefix = plan.project.subdir(&cfg.archive.print_prefix_suffix);
    let print_files = if plan.source_layout_dir.is_dir() {
        copy_files_by_prefix(
            &plan.source_layout_dir,
            &plan.archived_printer_pdfs_dir,
            &prefix,
        )?
    } else {
        warn!(
            "layout directory does not exist: {}",
            plan.source_layout_dir.display()
        );
        PrefixCopy::default()
    };

    Ok(ArchiveOutcome {
        copied,
        created,
        print_files,
    })
}
