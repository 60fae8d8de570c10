//! Deploy orchestrator.
//!
//! Runs the stages in order, emits progress events, and always removes
//! the scratch directory once packaging has produced one.

use std::sync::Arc;

use stackdeploy_packager::{Package, Packager};
use stackdeploy_runner::CommandLine;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::error::DeployError;
use crate::runner::CommandRunner;
use crate::types::{DeployEvent, DeployPlan, DeployReport, Stage};

/// Orchestrates one deployment.
pub struct DeployOrchestrator {
    plan: DeployPlan,
    runner: Arc<dyn CommandRunner>,
    events_tx: mpsc::Sender<DeployEvent>,
    events_rx: Option<mpsc::Receiver<DeployEvent>>,
}

impl DeployOrchestrator {
    pub fn new(plan: DeployPlan, runner: Arc<dyn CommandRunner>) -> Self {
        let (events_tx, events_rx) = mpsc::channel(64);
        Self {
            plan,
            runner,
            events_tx,
            events_rx: Some(events_rx),
        }
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<DeployEvent>> {
        self.events_rx.take()
    }

    pub fn plan(&self) -> &DeployPlan {
        &self.plan
    }

    /// Runs the pipeline: package, upload, remote execute, cleanup.
    ///
    /// The first failing stage ends the run. Cleanup still runs when a
    /// package exists; a cleanup failure is only logged.
    pub async fn deploy(&self) -> Result<DeployReport, DeployError> {
        self.emit(DeployEvent::Started {
            app_name: self.plan.app_name().to_string(),
        })
        .await;

        if let Err(e) = self.plan.validate() {
            return Err(self.fail(Stage::Plan, e).await);
        }

        let package = self.package().await?;
        let shipped = self.ship().await;
        self.cleanup(&package).await;
        shipped?;

        self.emit(DeployEvent::Completed).await;
        info!(app = %self.plan.app_name(), "deploy completed");

        Ok(DeployReport {
            app_name: self.plan.app_name().to_string(),
            files: package.summary.files,
            bytes: package.summary.bytes,
            verification_urls: self.plan.verification_urls.clone(),
        })
    }

    async fn package(&self) -> Result<Package, DeployError> {
        self.emit(DeployEvent::StageStarted {
            stage: Stage::Package,
        })
        .await;

        let packager = Packager::new(self.plan.package.clone());
        let built = tokio::task::spawn_blocking(move || packager.build())
            .await
            .map_err(|e| DeployError::Internal(format!("packaging task failed: {e}")));

        let package = match built {
            Ok(Ok(package)) => package,
            Ok(Err(e)) => return Err(self.fail(Stage::Package, e.into()).await),
            Err(e) => return Err(self.fail(Stage::Package, e).await),
        };

        self.emit(DeployEvent::Packaged {
            files: package.summary.files,
            bytes: package.summary.bytes,
        })
        .await;
        self.emit(DeployEvent::StageCompleted {
            stage: Stage::Package,
        })
        .await;
        Ok(package)
    }

    async fn ship(&self) -> Result<(), DeployError> {
        let upload = self.plan.upload_command();
        self.run_stage(Stage::Upload, &upload, DeployError::Upload)
            .await?;

        let remote = self.plan.remote_command();
        self.run_stage(Stage::RemoteExecute, &remote, DeployError::RemoteExecute)
            .await
    }

    async fn run_stage(
        &self,
        stage: Stage,
        command: &CommandLine,
        wrap: fn(stackdeploy_runner::RunnerError) -> DeployError,
    ) -> Result<(), DeployError> {
        self.emit(DeployEvent::StageStarted { stage }).await;
        self.emit(DeployEvent::Running {
            command: command.to_string(),
        })
        .await;

        match self.runner.execute(command).await {
            Ok(()) => {
                self.emit(DeployEvent::StageCompleted { stage }).await;
                Ok(())
            }
            Err(e) => Err(self.fail(stage, wrap(e)).await),
        }
    }

    async fn cleanup(&self, package: &Package) {
        self.emit(DeployEvent::StageStarted {
            stage: Stage::Cleanup,
        })
        .await;

        let root = package.clone();
        match tokio::task::spawn_blocking(move || root.cleanup()).await {
            Ok(Ok(())) => {
                self.emit(DeployEvent::StageCompleted {
                    stage: Stage::Cleanup,
                })
                .await;
            }
            Ok(Err(e)) => {
                warn!(path = %package.root.display(), error = %e, "failed to remove scratch directory");
            }
            Err(e) => {
                warn!(error = %e, "cleanup task failed");
            }
        }
    }

    async fn fail(&self, stage: Stage, err: DeployError) -> DeployError {
        error!(%stage, error = %err, "deploy failed");
        self.emit(DeployEvent::Failed {
            stage,
            error: err.to_string(),
        })
        .await;
        err
    }

    async fn emit(&self, event: DeployEvent) {
        let _ = self.events_tx.send(event).await;
    }
}

/// Process exit code for a deployment result: 0 on success, 1 otherwise.
pub fn exit_code(result: &Result<DeployReport, DeployError>) -> u8 {
    match result {
        Ok(_) => 0,
        Err(_) => 1,
    }
}
