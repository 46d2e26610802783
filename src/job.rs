use crate::classify::{DialogOutcome, LinkCount};
use crate::config::{Dismissal, TextSource};
use crate::util::display_name;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    Launching,
    Opened,
    PollingDialog,
    Classifying,
    Recovering,
    Closing,
    Packaging,
    Done,
    Failed,
    TimedOut,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed | JobStatus::TimedOut)
    }

    pub fn is_in_flight(self) -> bool {
        !self.is_terminal() && self != JobStatus::Pending
    }
}

/// One document to open, triage, and package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentJob {
    path: PathBuf,
    display_name: String,
    status: JobStatus,
}

impl DocumentJob {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let display_name = display_name(&path);
        Self {
            path,
            display_name,
            status: JobStatus::Pending,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// File stem used to name the package folder.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.display_name.clone())
    }

    pub(crate) fn set_status(&mut self, status: JobStatus) {
        self.status = status;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobOutcome {
    Success,
    MissingLinks,
    Error,
    Timeout,
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobOutcome::Success => "Success",
            JobOutcome::MissingLinks => "MissingLinks",
            JobOutcome::Error => "Error",
            JobOutcome::Timeout => "Timeout",
        };
        f.write_str(s)
    }
}

/// Why a job did not succeed.
#[derive(Debug, Clone, Error)]
pub enum JobError {
    #[error("could not open document: {0}")]
    Launch(String),

    #[error("{0}")]
    Dialog(String),

    #[error("document reports missing links (count: {0})")]
    MissingLinks(LinkCount),

    #[error("packaging failed: {0}")]
    Packaging(String),

    #[error("{0}")]
    Timeout(String),
}

impl JobError {
    pub fn outcome(&self) -> JobOutcome {
        match self {
            JobError::MissingLinks(_) => JobOutcome::MissingLinks,
            JobError::Timeout(_) => JobOutcome::Timeout,
            JobError::Launch(_) | JobError::Dialog(_) | JobError::Packaging(_) => {
                JobOutcome::Error
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub job: DocumentJob,
    pub outcome: JobOutcome,
    pub message: String,
    pub package_path: Option<PathBuf>,
    pub dialog: Option<DialogOutcome>,
    pub text_source: Option<TextSource>,
    pub recovery: Option<Dismissal>,
    pub elapsed_ms: u64,
}

impl JobResult {
    pub fn link_count(&self) -> Option<LinkCount> {
        self.dialog.as_ref().and_then(|d| d.count)
    }
}
