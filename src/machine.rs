//! Per-document state machine: open, watch for a modal, triage it, close,
//! package. Every bridge call is bounded; a timeout anywhere ends the job as
//! `TimedOut` and kills the application.

use crate::bridge::{script, Bridge, BridgeError, BridgeOutput, Script};
use crate::classify::{classify, DialogKind, DialogOutcome, LinkCount};
use crate::config::{Config, Dismissal, TextSource};
use crate::job::{DocumentJob, JobError, JobOutcome, JobResult, JobStatus};
use crate::supervisor::ProcessSupervisor;
use crate::util::ensure_dir;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub struct JobMachine<'a, B: Bridge> {
    cfg: &'a Config,
    bridge: &'a B,
}

struct Ctx<'j, 'o> {
    job: &'j mut DocumentJob,
    observe: &'o mut dyn FnMut(&DocumentJob),
    deadline: Option<Instant>,
    dialog: Option<DialogOutcome>,
    text_source: Option<TextSource>,
    recovery: Option<Dismissal>,
    notes: Vec<String>,
}

impl Ctx<'_, '_> {
    fn enter(&mut self, status: JobStatus) {
        debug!(
            "{}: {:?} -> {:?}",
            self.job.display_name(),
            self.job.status(),
            status
        );
        self.job.set_status(status);
        (self.observe)(&*self.job);
    }

    fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }
}

impl<'a, B: Bridge> JobMachine<'a, B> {
    pub fn new(cfg: &'a Config, bridge: &'a B) -> Self {
        Self { cfg, bridge }
    }

    /// Drive `job` from `Pending` to a terminal status. Never fails: every
    /// problem is folded into the returned [`JobResult`].
    pub fn run(
        &self,
        job: &mut DocumentJob,
        package_root: &Path,
        observe: &mut dyn FnMut(&DocumentJob),
    ) -> JobResult {
        let started = Instant::now();
        let job_seconds = self.cfg.timeouts.job_seconds;
        let mut ctx = Ctx {
            job,
            observe,
            deadline: (job_seconds > 0).then(|| started + Duration::from_secs(job_seconds)),
            dialog: None,
            text_source: None,
            recovery: None,
            notes: Vec::new(),
        };

        info!("processing {}", ctx.job.path().display());
        let settled = self.drive(&mut ctx, package_root);

        let (status, outcome, mut message, package_path) = match settled {
            Ok(path) => (
                JobStatus::Done,
                JobOutcome::Success,
                format!("packaged to {}", path.display()),
                Some(path),
            ),
            Err(err) => {
                let status = match err {
                    JobError::Timeout(_) => JobStatus::TimedOut,
                    _ => JobStatus::Failed,
                };
                (status, err.outcome(), err.to_string(), None)
            }
        };
        for note in &ctx.notes {
            message.push_str("; ");
            message.push_str(note);
        }

        if status == JobStatus::TimedOut {
            let supervisor = ProcessSupervisor::new(self.cfg, self.bridge);
            if !supervisor.terminate(&self.cfg.application.process_name) {
                warn!("forced termination after timeout did not confirm");
            }
        }
        ctx.enter(status);

        info!("{}: {} ({})", ctx.job.display_name(), outcome, message);

        JobResult {
            job: ctx.job.clone(),
            outcome,
            message,
            package_path,
            dialog: ctx.dialog.take(),
            text_source: ctx.text_source,
            recovery: ctx.recovery,
            elapsed_ms: started.elapsed().as_millis() as u64,
        }
    }

    fn drive(&self, ctx: &mut Ctx<'_, '_>, package_root: &Path) -> Result<PathBuf, JobError> {
        let app = &self.cfg.application.name;

        ctx.enter(JobStatus::Launching);
        match self.call(ctx, &script::open_document(app, ctx.job.path())) {
            Ok(_) => {}
            Err(e) if e.is_timeout() => return Err(timed_out(ctx, &e)),
            Err(e) => return Err(JobError::Launch(e.to_string())),
        }
        ctx.enter(JobStatus::Opened);

        ctx.enter(JobStatus::PollingDialog);
        let verdict = if self.poll_for_dialog(ctx)? {
            ctx.enter(JobStatus::Classifying);
            let verdict = self.triage(ctx)?;
            ctx.enter(JobStatus::Recovering);
            ctx.recovery = self.dismiss(ctx)?;
            Some(verdict)
        } else {
            None
        };

        ctx.enter(JobStatus::Closing);
        self.close(ctx)?;

        ctx.enter(JobStatus::Packaging);
        let packaged = self.package(ctx.job, package_root);

        match (verdict, packaged) {
            (None, result) => result,
            (Some(verdict), Err(err @ JobError::Timeout(_))) => {
                ctx.notes.push(verdict.to_string());
                Err(err)
            }
            (Some(verdict), Ok(path)) => {
                ctx.notes
                    .push(format!("package written to {}", path.display()));
                Err(verdict)
            }
            (Some(verdict), Err(err)) => {
                ctx.notes.push(err.to_string());
                Err(verdict)
            }
        }
    }

    /// Bridge call bounded by the call ceiling and whatever is left of the
    /// job budget.
    fn call(&self, ctx: &Ctx<'_, '_>, script: &Script) -> Result<BridgeOutput, BridgeError> {
        let cap = Duration::from_secs(self.cfg.bridge.call_timeout_seconds);
        let timeout = match ctx.remaining() {
            Some(left) if left.is_zero() => return Err(BridgeError::Timeout(Duration::ZERO)),
            Some(left) => cap.min(left),
            None => cap,
        };
        self.bridge.execute(script, timeout)
    }

    fn poll_for_dialog(&self, ctx: &mut Ctx<'_, '_>) -> Result<bool, JobError> {
        let process = &self.cfg.application.process_name;
        let checks = self.cfg.polling.max_checks;
        let interval = Duration::from_millis(self.cfg.polling.interval_ms);

        for i in 0..checks {
            match self.call(ctx, &script::dialog_visible(process)) {
                Ok(out) if out.is_true() => {
                    info!("{}: dialog on check {}", ctx.job.display_name(), i + 1);
                    return Ok(true);
                }
                Ok(_) => {}
                Err(e) if e.is_timeout() => return Err(timed_out(ctx, &e)),
                Err(e) => warn!("dialog check {} failed: {e}", i + 1),
            }
            if i + 1 < checks {
                std::thread::sleep(interval);
            }
        }
        debug!("{}: no dialog after {checks} checks", ctx.job.display_name());
        Ok(false)
    }

    /// Read the dialog and turn it into the job's verdict.
    fn triage(&self, ctx: &mut Ctx<'_, '_>) -> Result<JobError, JobError> {
        let text = self.read_dialog_text(ctx)?;
        let mut outcome = classify(&text);
        let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");

        let verdict = match outcome.kind {
            DialogKind::MissingLinks => {
                JobError::MissingLinks(outcome.count.unwrap_or(LinkCount::Unknown))
            }
            DialogKind::MissingFonts => {
                JobError::Dialog(format!("document reports missing fonts: {flat}"))
            }
            DialogKind::None | DialogKind::Unknown => {
                outcome.kind = DialogKind::Unknown;
                if flat.is_empty() {
                    JobError::Dialog("unexpected dialog with unreadable text".into())
                } else {
                    JobError::Dialog(format!("unexpected dialog: {flat}"))
                }
            }
        };

        info!(
            "{}: dialog classified {:?} count={:?}",
            ctx.job.display_name(),
            outcome.kind,
            outcome.count
        );
        ctx.dialog = Some(outcome);
        Ok(verdict)
    }

    fn read_dialog_text(&self, ctx: &mut Ctx<'_, '_>) -> Result<String, JobError> {
        let process = &self.cfg.application.process_name;
        for &source in &self.cfg.recovery.text_sources {
            match self.call(ctx, &script::read_dialog(process, source)) {
                Ok(out) if !out.value().is_empty() => {
                    ctx.text_source = Some(source);
                    return Ok(out.value().to_string());
                }
                Ok(_) => debug!("text source {source:?} returned nothing"),
                Err(e) if e.is_timeout() => return Err(timed_out(ctx, &e)),
                Err(e) => debug!("text source {source:?} failed: {e}"),
            }
        }
        warn!("{}: dialog text unreadable", ctx.job.display_name());
        Ok(String::new())
    }

    /// Try each dismissal in order until one lands. Best-effort: running out
    /// of strategies is logged, not fatal.
    fn dismiss(&self, ctx: &mut Ctx<'_, '_>) -> Result<Option<Dismissal>, JobError> {
        let process = &self.cfg.application.process_name;
        for &how in &self.cfg.recovery.dismiss_order {
            match self.call(ctx, &script::dismiss(process, how)) {
                Ok(_) => {
                    info!("{}: dialog dismissed via {how:?}", ctx.job.display_name());
                    return Ok(Some(how));
                }
                Err(e) if e.is_timeout() => return Err(timed_out(ctx, &e)),
                Err(e) => debug!("dismissal {how:?} failed: {e}"),
            }
        }
        warn!(
            "{}: no dismissal strategy worked; closing anyway",
            ctx.job.display_name()
        );
        Ok(None)
    }

    fn close(&self, ctx: &mut Ctx<'_, '_>) -> Result<(), JobError> {
        match self.call(ctx, &script::close_documents(&self.cfg.application.name)) {
            Ok(_) => Ok(()),
            Err(e) if e.is_timeout() => Err(timed_out(ctx, &e)),
            Err(e) => {
                warn!("{}: close failed: {e}", ctx.job.display_name());
                Ok(())
            }
        }
    }

    fn package(&self, job: &DocumentJob, package_root: &Path) -> Result<PathBuf, JobError> {
        let dest = package_dir(self.cfg, package_root, job);
        ensure_dir(&dest).map_err(|e| JobError::Packaging(format!("{e:#}")))?;

        let timeout = Duration::from_secs(self.cfg.timeouts.package_seconds);
        let script = script::package_document(
            &self.cfg.application.name,
            job.path(),
            &dest,
            &self.cfg.packaging,
        );
        match self.bridge.execute(&script, timeout) {
            Ok(out) => {
                debug!("package script returned {}", out.value());
                Ok(dest)
            }
            Err(BridgeError::Timeout(t)) => Err(JobError::Timeout(format!(
                "packaging exceeded {}s",
                t.as_secs()
            ))),
            Err(BridgeError::Failed { stderr, .. }) => Err(JobError::Packaging(stderr)),
            Err(e) => Err(JobError::Packaging(e.to_string())),
        }
    }
}

/// `<root>/<document stem><suffix>`, where one document's package goes.
pub fn package_dir(cfg: &Config, package_root: &Path, job: &DocumentJob) -> PathBuf {
    package_root.join(format!("{}{}", job.stem(), cfg.packaging.suffix))
}

fn timed_out(ctx: &Ctx<'_, '_>, err: &BridgeError) -> JobError {
    JobError::Timeout(format!("timed out during {:?} ({err})", ctx.job.status()))
}
