//! Deploy error types.

use stackdeploy_packager::PackageError;
use stackdeploy_runner::RunnerError;

/// Errors produced during a deployment, one variant per failing stage.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("failed to create deployment package: {0}")]
    Package(#[from] PackageError),

    #[error("failed to upload files to server: {0}")]
    Upload(#[source] RunnerError),

    #[error("failed to run deployment script on server: {0}")]
    RemoteExecute(#[source] RunnerError),

    #[error("invalid deploy plan: {0}")]
    Plan(String),

    #[error("internal error: {0}")]
    Internal(String),
}
