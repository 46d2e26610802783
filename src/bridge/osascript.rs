use super::{Bridge, BridgeError, BridgeOutput, Script};
use crate::config::Config;
use crate::util::expand_tilde;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Runs AppleScript through `osascript -`, feeding the source on stdin.
pub struct OsaScriptBridge {
    exe: PathBuf,
    keep_stderr: bool,
}

impl OsaScriptBridge {
    pub fn new(cfg: &Config) -> Self {
        Self {
            exe: expand_tilde(&cfg.bridge.osascript_exe),
            keep_stderr: cfg.bridge.keep_stderr,
        }
    }
}

impl Bridge for OsaScriptBridge {
    fn execute(&self, script: &Script, timeout: Duration) -> Result<BridgeOutput, BridgeError> {
        debug!("osascript {:?} timeout={:?}", script.kind, timeout);

        let mut child = Command::new(&self.exe)
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(script.source.as_bytes()) {
                warn!("osascript stdin write failed: {e}");
                let _ = child.kill();
                let _ = child.wait();
                return Err(e.into());
            }
            stdin.flush().ok();
        }

        let (status, stdout, stderr) = wait_with_timeout(&mut child, timeout)?;
        let stdout = String::from_utf8_lossy(&stdout).into_owned();
        let stderr = String::from_utf8_lossy(&stderr).trim().to_string();

        if self.keep_stderr && !stderr.is_empty() {
            debug!("osascript stderr {:?}: {}", script.kind, stderr);
        }

        let exit_code = status.code().unwrap_or(-1);
        if !status.success() {
            return Err(BridgeError::Failed { exit_code, stderr });
        }

        Ok(BridgeOutput {
            stdout,
            stderr,
            exit_code,
        })
    }
}

fn wait_with_timeout(
    child: &mut Child,
    timeout: Duration,
) -> Result<(ExitStatus, Vec<u8>, Vec<u8>), BridgeError> {
    // Drain pipes while waiting so a chatty script can't block on a full buffer.
    let stdout_reader = child.stdout.take();
    let stderr_reader = child.stderr.take();

    let stdout_thread = std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut out) = stdout_reader {
            let _ = out.read_to_end(&mut buf);
        }
        buf
    });

    let stderr_thread = std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut err) = stderr_reader {
            let _ = err.read_to_end(&mut buf);
        }
        buf
    });

    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            let stdout = stdout_thread.join().unwrap_or_default();
            let stderr = stderr_thread.join().unwrap_or_default();
            return Ok((status, stdout, stderr));
        }

        if start.elapsed() > timeout {
            warn!("osascript timed out after {:?}", timeout);
            let _ = child.kill();
            let _ = child.wait();
            let _ = stdout_thread.join();
            let _ = stderr_thread.join();
            return Err(BridgeError::Timeout(timeout));
        }

        std::thread::sleep(Duration::from_millis(50));
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::bridge::ScriptKind;

    // `sh -` reads the script from stdin the same way `osascript -` does.
    fn sh_bridge() -> OsaScriptBridge {
        OsaScriptBridge {
            exe: PathBuf::from("/bin/sh"),
            keep_stderr: true,
        }
    }

    #[test]
    fn captures_stdout_on_success() {
        let out = sh_bridge()
            .execute(&Script::raw(ScriptKind::Ping, "echo pong"), Duration::from_secs(5))
            .unwrap();
        assert_eq!(out.value(), "pong");
        assert_eq!(out.exit_code, 0);
    }

    #[test]
    fn non_zero_exit_carries_stderr() {
        let err = sh_bridge()
            .execute(
                &Script::raw(ScriptKind::Ping, "echo broken >&2; exit 3"),
                Duration::from_secs(5),
            )
            .unwrap_err();
        match err {
            BridgeError::Failed { exit_code, stderr } => {
                assert_eq!(exit_code, 3);
                assert_eq!(stderr, "broken");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn host_that_never_reads_stdin_is_reaped() {
        // `true` exits without reading, so a large script hits a broken pipe.
        let bridge = OsaScriptBridge {
            exe: PathBuf::from("/bin/true"),
            keep_stderr: true,
        };
        let big = "x".repeat(4 << 20);
        match bridge.execute(&Script::raw(ScriptKind::Ping, big), Duration::from_secs(5)) {
            Err(BridgeError::Spawn(e)) => assert_eq!(e.kind(), std::io::ErrorKind::BrokenPipe),
            other => panic!("expected a broken pipe, got {other:?}"),
        }
    }

    #[test]
    fn slow_script_times_out() {
        let err = sh_bridge()
            .execute(&Script::raw(ScriptKind::Ping, "exec sleep 5"), Duration::from_millis(200))
            .unwrap_err();
        assert!(err.is_timeout());
    }
}
