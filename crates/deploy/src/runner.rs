//! Command runner seam.

use std::future::Future;
use std::pin::Pin;

use stackdeploy_runner::{CommandLine, PasswordRunner, RunnerError};

/// Runs one external command to completion.
///
/// Using a trait keeps the deploy flow testable without `rsync`, `ssh`
/// or a pseudo-terminal.
pub trait CommandRunner: Send + Sync {
    fn execute<'a>(
        &'a self,
        command: &'a CommandLine,
    ) -> Pin<Box<dyn Future<Output = Result<(), RunnerError>> + Send + 'a>>;
}

impl CommandRunner for PasswordRunner {
    fn execute<'a>(
        &'a self,
        command: &'a CommandLine,
    ) -> Pin<Box<dyn Future<Output = Result<(), RunnerError>> + Send + 'a>> {
        Box::pin(self.run(command))
    }
}
