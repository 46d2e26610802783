pub mod osascript;
pub mod script;

use crate::config::{Dismissal, TextSource};
use std::time::Duration;
use thiserror::Error;

pub use script::Script;

/// What a script is for. The bridge never interprets a script; the tag only
/// feeds diagnostics and lets test doubles answer by intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    Ping,
    IsRunning,
    OpenDocument,
    DialogVisible,
    ReadDialog(TextSource),
    Dismiss(Dismissal),
    CloseDocuments,
    Package,
    Quit,
    ForceKill,
    FontActivate,
    FontRefresh,
    FontHide,
}

#[derive(Debug, Clone, Default)]
pub struct BridgeOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl BridgeOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            ..Default::default()
        }
    }

    /// Trimmed stdout, which is how AppleScript hands back its `return` value.
    pub fn value(&self) -> &str {
        self.stdout.trim()
    }

    pub fn is_true(&self) -> bool {
        self.value().eq_ignore_ascii_case("true")
    }
}

#[derive(Debug, Error)]
pub enum BridgeError {
    /// The call outlived its budget. Whether the side effect happened is unknown.
    #[error("bridge call timed out after {0:?}")]
    Timeout(Duration),

    #[error("script exited with status {exit_code}: {stderr}")]
    Failed { exit_code: i32, stderr: String },

    #[error("failed to run automation host: {0}")]
    Spawn(#[from] std::io::Error),
}

impl BridgeError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, BridgeError::Timeout(_))
    }
}

pub trait Bridge {
    /// Run one script, bounded by `timeout`. Non-zero exit is `Failed`.
    fn execute(&self, script: &Script, timeout: Duration) -> Result<BridgeOutput, BridgeError>;
}

impl<B: Bridge + ?Sized> Bridge for &B {
    fn execute(&self, script: &Script, timeout: Duration) -> Result<BridgeOutput, BridgeError> {
        (**self).execute(script, timeout)
    }
}
