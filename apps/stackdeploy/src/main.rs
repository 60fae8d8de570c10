//! stackdeploy entry point.
//!
//! Takes no arguments. Configuration comes from `deploy.toml` and the
//! environment; see [`config`].

mod config;
mod report;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use stackdeploy_deploy::{DeployOrchestrator, exit_code};
use stackdeploy_runner::PasswordRunner;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

fn main() -> ExitCode {
    // Logs go to stderr so they do not interleave with progress on stdout.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting stackdeploy");

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Deployment failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<ExitCode> {
    let config = Config::load()?;
    config.validate()?;

    let workdir = std::env::current_dir().context("failed to resolve working directory")?;
    let password = config::password_from_env();
    if password.is_none() {
        tracing::warn!(
            env = config::PASSWORD_ENV,
            "no password set, relying on key-based ssh"
        );
    }

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(deploy(config, &workdir, password))
}

async fn deploy(
    config: Config,
    workdir: &std::path::Path,
    password: Option<stackdeploy_runner::Password>,
) -> anyhow::Result<ExitCode> {
    let plan = config.to_plan(workdir);
    let runner = Arc::new(PasswordRunner::new(config.runner_config(), password));

    let mut orchestrator = DeployOrchestrator::new(plan, runner);
    let events = orchestrator
        .take_events()
        .context("event receiver already taken")?;
    let printer = tokio::spawn(report::print_events(events));

    let result = orchestrator.deploy().await;

    // Dropping the orchestrator closes the channel so the printer finishes.
    drop(orchestrator);
    printer.await.context("progress printer panicked")?;

    print!("{}", report::summary(&result));
    Ok(ExitCode::from(exit_code(&result)))
}
