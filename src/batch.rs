use crate::bridge::{script, Bridge};
use crate::config::Config;
use crate::job::{DocumentJob, JobOutcome, JobStatus};
use crate::machine::JobMachine;
use crate::report::BatchReport;
use crate::supervisor::ProcessSupervisor;
use crate::util::{now_rfc3339, sha256_hex};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, warn};

type Observer<'a> = Box<dyn FnMut(usize, JobStatus) + 'a>;

/// Runs jobs one at a time against the single shared application instance.
pub struct BatchOrchestrator<'a, B: Bridge> {
    cfg: &'a Config,
    bridge: &'a B,
    package_root: PathBuf,
    log_dir: Option<PathBuf>,
    observer: Option<Observer<'a>>,
}

impl<'a, B: Bridge> BatchOrchestrator<'a, B> {
    /// Packages land under `package_root`, one folder per document.
    pub fn new(cfg: &'a Config, bridge: &'a B, package_root: impl Into<PathBuf>) -> Self {
        Self {
            cfg,
            bridge,
            package_root: package_root.into(),
            log_dir: None,
            observer: None,
        }
    }

    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    /// Called with `(job index, new status)` on every transition.
    pub fn with_observer(mut self, observer: impl FnMut(usize, JobStatus) + 'a) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn package_root(&self) -> &Path {
        &self.package_root
    }

    pub fn run_batch(&mut self, jobs: Vec<DocumentJob>) -> BatchReport {
        let mut jobs = jobs;
        let mut report = BatchReport::new(fingerprint(self.cfg, &jobs), now_rfc3339());
        if jobs.is_empty() {
            info!("no documents to process");
            return report;
        }

        let app = &self.cfg.application.name;
        let process = &self.cfg.application.process_name;
        let machine = JobMachine::new(self.cfg, self.bridge);
        let supervisor = ProcessSupervisor::new(self.cfg, self.bridge);
        let grace = Duration::from_secs(self.cfg.batch.grace_seconds);
        let total = jobs.len();

        info!("batch {} starting with {} documents", report.batch_id, total);

        for i in 0..total {
            debug_assert!(jobs.iter().all(|j| !j.status().is_in_flight()));

            if self.cfg.batch.terminate_stale_on_start {
                supervisor.ensure_clean(app, process);
            }

            info!("[{}/{}] {}", i + 1, total, jobs[i].display_name());
            let observer = &mut self.observer;
            let mut observe = |job: &DocumentJob| {
                if let Some(f) = observer.as_mut() {
                    f(i, job.status());
                }
            };
            let result = machine.run(&mut jobs[i], &self.package_root, &mut observe);
            let timed_out = result.outcome == JobOutcome::Timeout;
            report.push(result);

            self.reset_application(&supervisor, timed_out);
            if i + 1 < total {
                debug!("grace period {:?}", grace);
                std::thread::sleep(grace);
            }
        }

        report.finished = Some(now_rfc3339());
        self.persist(&mut report);

        info!(
            "batch {} done: succeeded={} failed={} timed_out={}",
            report.batch_id,
            report.succeeded(),
            report.failed(),
            report.timed_out()
        );
        report
    }

    /// Quit the application so the next job starts from a fresh process.
    /// A timed-out job was already killed.
    fn reset_application(&self, supervisor: &ProcessSupervisor<'_, B>, timed_out: bool) {
        if timed_out {
            return;
        }
        let timeout = Duration::from_secs(self.cfg.timeouts.quit_seconds);
        match self
            .bridge
            .execute(&script::quit(&self.cfg.application.name), timeout)
        {
            Ok(_) => debug!("application quit"),
            Err(e) => {
                warn!("graceful quit failed ({e}); forcing termination");
                supervisor.terminate(&self.cfg.application.process_name);
            }
        }
    }

    fn persist(&self, report: &mut BatchReport) {
        let Some(dir) = self.log_dir.as_deref() else {
            return;
        };
        if self.cfg.output.write_log {
            match report.write_log(dir, &self.cfg.output.log_prefix) {
                Ok(path) => {
                    info!("batch log: {}", path.display());
                    report.log_path = Some(path);
                }
                Err(e) => error!("failed to write batch log: {e:#}"),
            }
        }
        if self.cfg.output.write_report_json {
            let path = dir.join(&self.cfg.output.report_filename);
            if let Err(e) = report.write_json(&path) {
                error!("failed to write batch report: {e:#}");
            }
        }
    }
}

fn fingerprint(cfg: &Config, jobs: &[DocumentJob]) -> String {
    let mut material = cfg.normalized_for_hash();
    for job in jobs {
        material.push('\n');
        material.push_str(&job.path().display().to_string());
    }
    sha256_hex(material.as_bytes())[..16].to_string()
}
