//! Deploy flow: package, upload, remote restart, cleanup.
//!
//! This crate holds the orchestration only. External commands go
//! through the [`CommandRunner`] trait, implemented for the pty-based
//! [`PasswordRunner`](stackdeploy_runner::PasswordRunner) and replaced
//! by mocks in tests.
//!
//! # Pipeline
//!
//! 1. **Package** — stage the project into the scratch directory
//! 2. **Upload** — `rsync -avz --delete` the package to the server
//! 3. **Remote** — run `server-deploy.sh` over ssh
//! 4. **Cleanup** — remove the scratch directory
//!
//! A failing stage stops the pipeline. Nothing is rolled back on the server.

pub mod deploy;
pub mod error;
pub mod runner;
pub mod types;

pub use deploy::{DeployOrchestrator, exit_code};
pub use error::DeployError;
pub use runner::CommandRunner;
pub use types::{DeployEvent, DeployPlan, DeployReport, RemoteTarget, Stage};
