//! Runner error types.

use std::process::ExitStatus;
use std::time::Duration;

/// Errors produced while running a password-prompted command.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pseudo-terminal error: {0}")]
    Pty(#[from] nix::errno::Errno),

    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("timed out after {after:?} waiting for {waiting_for}")]
    Timeout {
        waiting_for: &'static str,
        after: Duration,
    },

    #[error("password prompt received but no password is configured")]
    PasswordRequired,

    #[error("`{command}` failed: {status}")]
    Exit { command: String, status: ExitStatus },
}
