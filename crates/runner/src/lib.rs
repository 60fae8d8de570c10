//! Password-prompted command execution.
//!
//! `rsync` and `ssh` read passwords from the controlling terminal, not
//! from stdin, so commands are spawned on a pseudo-terminal. The runner
//! watches the output for a `password:` prompt, answers it once, then
//! waits for the command to finish.
//!
//! # Flow
//!
//! 1. **Spawn** — start the command as a session leader on a fresh pty
//! 2. **Expect** — wait for a prompt, end of output, or the timeout
//! 3. **Answer** — send the password if a prompt appeared
//! 4. **Reap** — collect the exit status; only status zero is success

mod command;
mod error;
mod prompt;
mod pty;
mod runner;

use std::time::Duration;

pub use command::{CommandLine, shell_quote};
pub use error::RunnerError;
pub use prompt::{PASSWORD_PROMPT, PromptMatch, PromptWatcher};
pub use runner::{Password, PasswordRunner, RunnerConfig};

/// Default per-phase timeout for a prompted command.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
