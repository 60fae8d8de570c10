//! Data types for the deploy flow.

use std::fmt;

use stackdeploy_packager::{PackageConfig, SCRIPT_NAME};
use stackdeploy_runner::{CommandLine, shell_quote};

use crate::error::DeployError;

/// Where the package goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    pub user: String,
    pub host: String,
    /// Remote directory. May start with `~`, which the remote shell expands.
    pub path: String,
}

impl RemoteTarget {
    /// `user@host`.
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    /// Remote path with exactly one trailing slash.
    fn dir(&self) -> String {
        format!("{}/", self.path.trim_end_matches('/'))
    }

    /// Remote path as one word for the remote shell. A leading `~/` stays
    /// bare so it still expands; everything after it is quoted.
    pub fn shell_path(&self) -> String {
        match self.path.strip_prefix("~/") {
            Some("") => "~/".to_string(),
            Some(rest) => format!("~/{}", shell_quote(rest)),
            None if self.path == "~" => "~".to_string(),
            None => shell_quote(&self.path),
        }
    }
}

/// Everything a deployment needs, resolved up front.
#[derive(Debug, Clone)]
pub struct DeployPlan {
    pub remote: RemoteTarget,
    pub package: PackageConfig,
    /// Public URLs printed for manual verification after success.
    pub verification_urls: Vec<String>,
}

impl DeployPlan {
    /// Checks the plan before any stage runs.
    pub fn validate(&self) -> Result<(), DeployError> {
        let remote = &self.remote;
        for (field, value) in [
            ("remote user", &remote.user),
            ("remote host", &remote.host),
            ("remote path", &remote.path),
        ] {
            if value.trim().is_empty() {
                return Err(DeployError::Plan(format!("{field} is empty")));
            }
        }
        if remote.user.contains('@') || remote.host.contains(['@', ':', ' ']) {
            return Err(DeployError::Plan(format!(
                "malformed destination {}",
                remote.destination()
            )));
        }
        if remote.path.starts_with('-') || remote.path.contains(char::is_control) {
            return Err(DeployError::Plan(format!(
                "unusable remote path {:?}",
                remote.path
            )));
        }
        self.package.script.validate()?;
        Ok(())
    }

    pub fn app_name(&self) -> &str {
        &self.package.script.app_name
    }

    /// `rsync -avz --delete <scratch>/ user@host:<path>/`
    pub fn upload_command(&self) -> CommandLine {
        let local = format!(
            "{}/",
            self.package.scratch_dir.display().to_string().trim_end_matches('/')
        );
        let remote = format!("{}:{}", self.remote.destination(), self.remote.dir());
        CommandLine::new("rsync").args(["-avz", "--delete"]).arg(local).arg(remote)
    }

    /// `ssh user@host 'cd <path> && ./server-deploy.sh'`
    pub fn remote_command(&self) -> CommandLine {
        CommandLine::new("ssh")
            .arg(self.remote.destination())
            .arg(format!("cd {} && ./{SCRIPT_NAME}", self.remote.shell_path()))
    }
}

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Plan validation, before anything touches the filesystem.
    Plan,
    Package,
    Upload,
    RemoteExecute,
    Cleanup,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Plan => "plan",
            Stage::Package => "package",
            Stage::Upload => "upload",
            Stage::RemoteExecute => "remote-execute",
            Stage::Cleanup => "cleanup",
        };
        f.write_str(name)
    }
}

/// Progress event emitted during deployment.
#[derive(Debug, Clone, PartialEq)]
pub enum DeployEvent {
    /// The deployment began.
    Started { app_name: String },
    /// A stage began.
    StageStarted { stage: Stage },
    /// An external command is about to run.
    Running { command: String },
    /// The package was staged.
    Packaged { files: u64, bytes: u64 },
    /// A stage finished successfully.
    StageCompleted { stage: Stage },
    /// A stage failed; the pipeline stops.
    Failed { stage: Stage, error: String },
    /// Every stage succeeded.
    Completed,
}

/// Result of a successful deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployReport {
    pub app_name: String,
    pub files: u64,
    pub bytes: u64,
    pub verification_urls: Vec<String>,
}
