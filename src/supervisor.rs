use crate::bridge::{script, Bridge};
use crate::config::Config;
use std::time::Duration;
use tracing::{info, warn};

/// Forced termination of the layout application. Used on job timeouts and
/// before each job so no stale instance carries state into the next one.
pub struct ProcessSupervisor<'a, B: Bridge> {
    bridge: &'a B,
    kill_timeout: Duration,
    query_timeout: Duration,
    settle: Duration,
}

impl<'a, B: Bridge> ProcessSupervisor<'a, B> {
    pub fn new(cfg: &Config, bridge: &'a B) -> Self {
        Self {
            bridge,
            kill_timeout: Duration::from_secs(cfg.timeouts.kill_seconds),
            query_timeout: Duration::from_secs(cfg.bridge.call_timeout_seconds),
            settle: Duration::from_millis(cfg.timeouts.terminate_wait_ms),
        }
    }

    /// Kill `process_name` outright. True when the kill went through or the
    /// process was already gone.
    pub fn terminate(&self, process_name: &str) -> bool {
        let ok = match self
            .bridge
            .execute(&script::force_kill(process_name), self.kill_timeout)
        {
            Ok(out) => {
                info!("terminate {process_name}: {}", out.value());
                true
            }
            Err(err) => {
                warn!("terminate {process_name} failed: {err}");
                false
            }
        };
        std::thread::sleep(self.settle);
        ok
    }

    pub fn is_running(&self, app: &str) -> bool {
        match self.bridge.execute(&script::is_running(app), self.query_timeout) {
            Ok(out) => out.is_true(),
            Err(err) => {
                warn!("running check for {app} failed: {err}");
                false
            }
        }
    }

    /// Terminate only if something is still running.
    pub fn ensure_clean(&self, app: &str, process_name: &str) -> bool {
        if self.is_running(app) {
            warn!("{app} still running before job start; terminating");
            return self.terminate(process_name);
        }
        true
    }
}
