use crate::job::{JobOutcome, JobResult};
use crate::util::{ensure_dir, file_stamp};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::{Path, PathBuf};

/// Append-only record of one batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub batch_id: String,
    pub started: String,
    pub finished: Option<String>,
    results: Vec<JobResult>,
    pub log_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub missing_links: Vec<MissingLinksEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MissingLinksEntry {
    pub document: String,
    pub count: String,
}

impl BatchReport {
    pub fn new(batch_id: impl Into<String>, started: impl Into<String>) -> Self {
        Self {
            batch_id: batch_id.into(),
            started: started.into(),
            finished: None,
            results: Vec::new(),
            log_path: None,
        }
    }

    pub(crate) fn push(&mut self, result: JobResult) {
        self.results.push(result);
    }

    pub fn results(&self) -> &[JobResult] {
        &self.results
    }

    fn count(&self, outcome: JobOutcome) -> usize {
        self.results.iter().filter(|r| r.outcome == outcome).count()
    }

    pub fn succeeded(&self) -> usize {
        self.count(JobOutcome::Success)
    }

    /// Error and MissingLinks outcomes. Timeouts are tracked separately.
    pub fn failed(&self) -> usize {
        self.count(JobOutcome::Error) + self.count(JobOutcome::MissingLinks)
    }

    pub fn timed_out(&self) -> usize {
        self.count(JobOutcome::Timeout)
    }

    pub fn missing_links(&self) -> impl Iterator<Item = &JobResult> {
        self.results
            .iter()
            .filter(|r| r.outcome == JobOutcome::MissingLinks)
    }

    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            total: self.results.len(),
            succeeded: self.succeeded(),
            failed: self.failed(),
            timed_out: self.timed_out(),
            missing_links: self
                .missing_links()
                .map(|r| MissingLinksEntry {
                    document: r.job.display_name().to_string(),
                    count: link_count_text(r),
                })
                .collect(),
        }
    }

    pub fn render_log(&self) -> String {
        let mut s = String::new();
        let _ = writeln!(
            s,
            "Archival Automation batch log - generated {} (batch {})",
            self.finished.as_deref().unwrap_or(&self.started),
            self.batch_id
        );

        for r in &self.results {
            let _ = writeln!(s);
            let _ = writeln!(s, "Processing: {}", r.job.path().display());
            let _ = writeln!(s, "Outcome: {} - {}", r.outcome, r.message);
            if r.outcome == JobOutcome::MissingLinks {
                let _ = writeln!(s, "Missing links: {}", link_count_text(r));
            }
        }

        let summary = self.summary();
        let _ = writeln!(s);
        let _ = writeln!(s, "Summary");
        let _ = writeln!(s, "Succeeded: {}", summary.succeeded);
        let _ = writeln!(s, "Failed: {}", summary.failed);
        let _ = writeln!(s, "Timed out: {}", summary.timed_out);
        if summary.missing_links.is_empty() {
            let _ = writeln!(s, "Documents with missing links: none");
        } else {
            let _ = writeln!(s, "Documents with missing links:");
            for entry in &summary.missing_links {
                let _ = writeln!(s, "  - {}: {}", entry.document, entry.count);
            }
        }
        s
    }

    /// Append the rendered log to `<dir>/<prefix>-<stamp>.txt`.
    pub fn write_log(&self, dir: &Path, prefix: &str) -> Result<PathBuf> {
        ensure_dir(dir)?;
        let path = dir.join(format!("{prefix}-{}.txt", file_stamp()));
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("open log: {}", path.display()))?;
        file.write_all(self.render_log().as_bytes())
            .with_context(|| format!("write log: {}", path.display()))?;
        Ok(path)
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let doc = serde_json::json!({
            "summary": self.summary(),
            "report": self,
        });
        std::fs::write(path, serde_json::to_string_pretty(&doc)?)
            .with_context(|| format!("write report: {}", path.display()))
    }
}

fn link_count_text(r: &JobResult) -> String {
    r.link_count()
        .map(|c| c.to_string())
        .unwrap_or_else(|| "unknown".into())
}
