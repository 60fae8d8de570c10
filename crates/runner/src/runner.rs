//! The password-prompted runner.

use std::fmt;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::command::CommandLine;
use crate::error::RunnerError;
use crate::prompt::{PromptMatch, PromptWatcher};
use crate::pty;

/// A password held in memory. `Debug` never prints it.
#[derive(Clone)]
pub struct Password(String);

impl Password {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

/// Runner settings.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Applies separately to waiting for the prompt and waiting for completion.
    pub timeout: Duration,
    /// Copy the child's output to stdout while waiting.
    pub echo: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            timeout: crate::DEFAULT_TIMEOUT,
            echo: true,
        }
    }
}

/// Runs commands that may ask for a password on their terminal.
#[derive(Debug, Clone)]
pub struct PasswordRunner {
    config: RunnerConfig,
    password: Option<Password>,
}

impl PasswordRunner {
    /// Creates a runner. With no password, any prompt fails the command.
    pub fn new(config: RunnerConfig, password: Option<Password>) -> Self {
        Self { config, password }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Runs `command` to completion. Succeeds only on exit status zero.
    pub async fn run(&self, command: &CommandLine) -> Result<(), RunnerError> {
        info!(command = %command, "running");

        let pair = pty::open()?;
        let mut child = pty::spawn(command, pair.slave)?;

        let writer_fd = pair.master.try_clone()?;
        let mut reader = tokio::fs::File::from_std(std::fs::File::from(pair.master));
        let mut writer = tokio::fs::File::from_std(std::fs::File::from(writer_fd));

        let mut watcher = PromptWatcher::new(self.config.echo);
        let answered = answer_prompt(
            &mut watcher,
            &mut reader,
            &mut writer,
            self.password.as_ref(),
            self.config.timeout,
        )
        .await;

        if let Err(e) = answered {
            warn!(command = %command, error = %e, "command aborted");
            pty::terminate(&mut child).await;
            return Err(e);
        }

        let status = match tokio::time::timeout(self.config.timeout, child.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                pty::terminate(&mut child).await;
                return Err(RunnerError::Timeout {
                    waiting_for: "process exit",
                    after: self.config.timeout,
                });
            }
        };

        if status.success() {
            debug!(command = %command, "command succeeded");
            Ok(())
        } else {
            Err(RunnerError::Exit {
                command: command.to_string(),
                status,
            })
        }
    }
}

/// Whether the password was sent during an interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Interaction {
    Answered,
    NoPrompt,
}

/// Drives one prompt/answer exchange until end of output.
pub(crate) async fn answer_prompt<R, W>(
    watcher: &mut PromptWatcher,
    reader: &mut R,
    writer: &mut W,
    password: Option<&Password>,
    timeout: Duration,
) -> Result<Interaction, RunnerError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    match watcher.expect_prompt(reader, timeout).await? {
        PromptMatch::Eof => {
            debug!("completed without password prompt");
            Ok(Interaction::NoPrompt)
        }
        PromptMatch::Timeout => Err(RunnerError::Timeout {
            waiting_for: "password prompt or completion",
            after: timeout,
        }),
        PromptMatch::Prompt => {
            let password = password.ok_or(RunnerError::PasswordRequired)?;
            writer.write_all(password.expose().as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
            debug!("password sent");

            match watcher.drain(reader, timeout).await? {
                PromptMatch::Timeout => Err(RunnerError::Timeout {
                    waiting_for: "completion after password",
                    after: timeout,
                }),
                _ => Ok(Interaction::Answered),
            }
        }
    }
}
