//! Human-readable progress and summary output.

use stackdeploy_deploy::{DeployError, DeployEvent, DeployReport, Stage};
use tokio::sync::mpsc;

/// Prints events until the orchestrator drops its sender.
pub async fn print_events(mut events: mpsc::Receiver<DeployEvent>) {
    while let Some(event) = events.recv().await {
        if let Some(line) = describe(&event) {
            println!("{line}");
        }
    }
}

/// One progress line per event. Completion events of most stages stay silent.
pub fn describe(event: &DeployEvent) -> Option<String> {
    let line = match event {
        DeployEvent::Started { app_name } => {
            format!("Starting {app_name} deployment...")
        }
        DeployEvent::StageStarted { stage } => match stage {
            Stage::Plan => return None,
            Stage::Package => "Creating deployment package...".into(),
            Stage::Upload => "Uploading files to server...".into(),
            Stage::RemoteExecute => "Running deployment script on server...".into(),
            Stage::Cleanup => "Cleaning up...".into(),
        },
        DeployEvent::Running { command } => format!("Running: {command}"),
        DeployEvent::Packaged { files, bytes } => {
            format!("Packaged {files} files ({})", format_bytes(*bytes))
        }
        DeployEvent::Failed { stage, error } => format!("[{stage}] {error}"),
        DeployEvent::StageCompleted { .. } | DeployEvent::Completed => return None,
    };
    Some(line)
}

/// Final summary block.
pub fn summary(result: &Result<DeployReport, DeployError>) -> String {
    match result {
        Ok(report) => {
            let mut out = format!("\n{} deployment complete!\n\nTest URLs:\n", report.app_name);
            for url in &report.verification_urls {
                out.push_str("  ");
                out.push_str(url);
                out.push('\n');
            }
            out
        }
        Err(e) => format!("\nDeployment failed: {e}\n"),
    }
}

fn format_bytes(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = KIB * 1024;
    match bytes {
        b if b >= MIB => format!("{:.1} MiB", b as f64 / MIB as f64),
        b if b >= KIB => format!("{:.1} KiB", b as f64 / KIB as f64),
        b => format!("{b} B"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_stage_start() {
        let line = describe(&DeployEvent::StageStarted {
            stage: Stage::Upload,
        });
        assert_eq!(line.as_deref(), Some("Uploading files to server..."));
    }

    #[test]
    fn describe_running_and_failure() {
        let line = describe(&DeployEvent::Running {
            command: "ssh a@b 'cd x && ./server-deploy.sh'".into(),
        })
        .unwrap();
        assert!(line.starts_with("Running: ssh"));

        let line = describe(&DeployEvent::Failed {
            stage: Stage::Upload,
            error: "failed to upload files to server".into(),
        })
        .unwrap();
        assert_eq!(line, "[upload] failed to upload files to server");
    }

    #[test]
    fn describe_plan_failure() {
        let line = describe(&DeployEvent::Failed {
            stage: Stage::Plan,
            error: "invalid deploy plan: remote host is empty".into(),
        })
        .unwrap();
        assert_eq!(line, "[plan] invalid deploy plan: remote host is empty");
    }

    #[test]
    fn completion_events_are_silent() {
        assert!(describe(&DeployEvent::Completed).is_none());
        assert!(
            describe(&DeployEvent::StageCompleted {
                stage: Stage::Cleanup
            })
            .is_none()
        );
    }

    #[test]
    fn summary_lists_urls() {
        let report = DeployReport {
            app_name: "Stack Blog MVP".into(),
            files: 10,
            bytes: 2048,
            verification_urls: vec![
                "https://cpeio.online".into(),
                "https://cpeio.online/admin".into(),
            ],
        };
        let text = summary(&Ok(report));
        assert!(text.contains("Stack Blog MVP deployment complete!"));
        assert!(text.contains("  https://cpeio.online\n"));
        assert!(text.contains("  https://cpeio.online/admin\n"));
    }

    #[test]
    fn summary_on_failure() {
        let err = DeployError::Plan("remote host is empty".into());
        let text = summary(&Err(err));
        assert!(text.contains("Deployment failed: invalid deploy plan: remote host is empty"));
    }

    #[test]
    fn byte_formatting() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KiB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MiB");
    }
}
