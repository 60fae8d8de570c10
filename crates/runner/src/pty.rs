//! Pseudo-terminal plumbing for spawned commands.

use std::os::fd::OwnedFd;
use std::process::Stdio;

use nix::pty::{OpenptyResult, Winsize, openpty};
use nix::sys::signal::{Signal, killpg};
use nix::unistd::Pid;
use tokio::process::{Child, Command};

use crate::command::CommandLine;
use crate::error::RunnerError;

/// Wide enough that rsync progress lines do not wrap.
const WINSIZE: Winsize = Winsize {
    ws_row: 24,
    ws_col: 200,
    ws_xpixel: 0,
    ws_ypixel: 0,
};

/// Opens a new pty pair.
pub(crate) fn open() -> Result<OpenptyResult, RunnerError> {
    Ok(openpty(&WINSIZE, None)?)
}

/// Spawns `command` with the pty slave as its controlling terminal.
///
/// The slave fd is consumed: once the child holds its copies, the parent
/// must not keep one, otherwise the master never sees end of output.
pub(crate) fn spawn(command: &CommandLine, slave: OwnedFd) -> Result<Child, RunnerError> {
    let spawn_err = |source| RunnerError::Spawn {
        program: command.program().to_string(),
        source,
    };

    let stdin = slave.try_clone().map_err(spawn_err)?;
    let stdout = slave.try_clone().map_err(spawn_err)?;

    let mut cmd = Command::new(command.program());
    cmd.args(command.arguments())
        .stdin(Stdio::from(stdin))
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(slave))
        .kill_on_drop(true);

    // SAFETY: only async-signal-safe calls (setsid, ioctl) run between
    // fork and exec.
    unsafe {
        cmd.pre_exec(|| {
            nix::unistd::setsid()?;
            if nix::libc::ioctl(0, nix::libc::TIOCSCTTY as _, 0) == -1 {
                return Err(std::io::Error::last_os_error());
            }
            Ok(())
        });
    }

    cmd.spawn().map_err(spawn_err)
}

/// Kills the child's whole process group and reaps it.
///
/// `rsync` forks its own `ssh`, so killing only the direct child could
/// leave the transport holding the terminal open.
pub(crate) async fn terminate(child: &mut Child) {
    if let Some(id) = child.id() {
        if let Err(e) = killpg(Pid::from_raw(id as i32), Signal::SIGKILL) {
            tracing::debug!(pid = id, error = %e, "killpg failed, killing child only");
            let _ = child.start_kill();
        }
    }
    let _ = child.wait().await;
}
