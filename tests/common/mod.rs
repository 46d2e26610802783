#![allow(dead_code)]

use archival_automation::bridge::{Bridge, BridgeError, BridgeOutput, Script, ScriptKind};
use archival_automation::config::{Config, Dismissal, TextSource};
use archival_automation::job::DocumentJob;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

/// How one bridge step answers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Answer {
    #[default]
    Ok,
    Fail,
    /// Reported as a timeout straight away; nothing actually sleeps.
    Hang,
}

/// What the fake application does for one opened document.
#[derive(Debug, Clone, Default)]
pub struct Behavior {
    pub open: Answer,
    /// Wall-clock time the open takes before answering.
    pub open_delay: Duration,
    pub poll: Answer,
    pub dialog: Option<String>,
    /// Number of polls that see nothing before the dialog appears.
    pub dialog_after_checks: u32,
    pub blank_sources: Vec<TextSource>,
    pub failing_dismissals: Vec<Dismissal>,
    pub close: Answer,
    pub package: Answer,
    pub quit: Answer,
}

impl Behavior {
    pub fn clean() -> Self {
        Self::default()
    }

    pub fn dialog(text: &str) -> Self {
        Self {
            dialog: Some(text.to_string()),
            ..Self::default()
        }
    }

    pub fn hang_on_open() -> Self {
        Self {
            open: Answer::Hang,
            ..Self::default()
        }
    }
}

#[derive(Default)]
struct State {
    queue: VecDeque<Behavior>,
    current: Behavior,
    running: bool,
    open_documents: usize,
    max_open_documents: usize,
    polls: u32,
    dismissed: bool,
    calls: Vec<ScriptKind>,
    opened_sources: Vec<String>,
    timeouts_seen: Vec<(ScriptKind, Duration)>,
}

/// In-memory stand-in for the automation host. Each `OpenDocument` call
/// takes the next [`Behavior`] from the queue (clean once it runs dry).
#[derive(Default)]
pub struct MockBridge {
    state: Mutex<State>,
}

impl MockBridge {
    pub fn new(behaviors: impl IntoIterator<Item = Behavior>) -> Self {
        Self {
            state: Mutex::new(State {
                queue: behaviors.into_iter().collect(),
                ..State::default()
            }),
        }
    }

    pub fn already_running(self) -> Self {
        self.state.lock().unwrap().running = true;
        self
    }

    pub fn calls(&self) -> Vec<ScriptKind> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, kind: ScriptKind) -> usize {
        self.calls().iter().filter(|k| **k == kind).count()
    }

    /// Timeouts the bridge was handed for `kind`, in call order.
    pub fn timeouts_for(&self, kind: ScriptKind) -> Vec<Duration> {
        self.state
            .lock()
            .unwrap()
            .timeouts_seen
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, t)| *t)
            .collect()
    }

    pub fn opened_sources(&self) -> Vec<String> {
        self.state.lock().unwrap().opened_sources.clone()
    }

    pub fn max_open_documents(&self) -> usize {
        self.state.lock().unwrap().max_open_documents
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().unwrap().running
    }
}

fn answer(a: Answer, timeout: Duration, stdout: &str) -> Result<BridgeOutput, BridgeError> {
    match a {
        Answer::Ok => Ok(BridgeOutput::ok(stdout)),
        Answer::Fail => Err(BridgeError::Failed {
            exit_code: 1,
            stderr: "execution error (-1728)".into(),
        }),
        Answer::Hang => Err(BridgeError::Timeout(timeout)),
    }
}

impl Bridge for MockBridge {
    fn execute(&self, script: &Script, timeout: Duration) -> Result<BridgeOutput, BridgeError> {
        let mut st = self.state.lock().unwrap();
        st.calls.push(script.kind);
        st.timeouts_seen.push((script.kind, timeout));

        match script.kind {
            ScriptKind::Ping => Ok(BridgeOutput::ok("pong")),
            ScriptKind::IsRunning => Ok(BridgeOutput::ok(st.running.to_string())),
            ScriptKind::OpenDocument => {
                st.current = st.queue.pop_front().unwrap_or_default();
                st.polls = 0;
                st.dismissed = false;
                st.running = true;
                st.opened_sources.push(script.source.clone());
                if !st.current.open_delay.is_zero() {
                    std::thread::sleep(st.current.open_delay);
                }
                if st.current.open == Answer::Ok {
                    st.open_documents += 1;
                    st.max_open_documents = st.max_open_documents.max(st.open_documents);
                }
                answer(st.current.open, timeout, "requested")
            }
            ScriptKind::DialogVisible => {
                if st.current.poll != Answer::Ok {
                    return answer(st.current.poll, timeout, "");
                }
                st.polls += 1;
                let visible = st.current.dialog.is_some()
                    && !st.dismissed
                    && st.polls > st.current.dialog_after_checks;
                Ok(BridgeOutput::ok(visible.to_string()))
            }
            ScriptKind::ReadDialog(source) => {
                if st.current.blank_sources.contains(&source) {
                    return Ok(BridgeOutput::ok(""));
                }
                Ok(BridgeOutput::ok(st.current.dialog.clone().unwrap_or_default()))
            }
            ScriptKind::Dismiss(how) => {
                if st.current.failing_dismissals.contains(&how) {
                    return answer(Answer::Fail, timeout, "");
                }
                st.dismissed = true;
                Ok(BridgeOutput::ok("dismissed"))
            }
            ScriptKind::CloseDocuments => {
                if st.current.close == Answer::Ok {
                    st.open_documents = 0;
                }
                answer(st.current.close, timeout, "closed")
            }
            ScriptKind::Package => answer(st.current.package, timeout, "/packaged"),
            ScriptKind::Quit => {
                if st.current.quit == Answer::Ok {
                    st.running = false;
                    st.open_documents = 0;
                }
                answer(st.current.quit, timeout, "quit")
            }
            ScriptKind::ForceKill => {
                st.running = false;
                st.open_documents = 0;
                Ok(BridgeOutput::ok("killed"))
            }
            ScriptKind::FontActivate | ScriptKind::FontRefresh | ScriptKind::FontHide => {
                Ok(BridgeOutput::ok(""))
            }
        }
    }
}

/// Default config with every wait zeroed and the font manager off.
pub fn fast_config() -> Config {
    let mut cfg = Config::default();
    cfg.polling.max_checks = 3;
    cfg.polling.interval_ms = 0;
    cfg.batch.grace_seconds = 0;
    cfg.timeouts.terminate_wait_ms = 0;
    cfg.fonts.enabled = false;
    cfg.fonts.load_time_seconds = 0;
    cfg.fonts.refresh_wait_seconds = 0;
    cfg
}

pub fn jobs(dir: &Path, names: &[&str]) -> Vec<DocumentJob> {
    names
        .iter()
        .map(|n| DocumentJob::new(dir.join(n)))
        .collect()
}
