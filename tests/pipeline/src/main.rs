fn main() {
    println!("Run `cargo test -p pipeline-e2e` to execute end-to-end deploy tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::future::Future;
    use std::path::{Path, PathBuf};
    use std::pin::Pin;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use stackdeploy_deploy::{
        CommandRunner, DeployError, DeployOrchestrator, DeployPlan, RemoteTarget, exit_code,
    };
    use stackdeploy_packager::PackageConfig;
    use stackdeploy_runner::{
        CommandLine, Password, PasswordRunner, RunnerConfig, RunnerError,
    };
    use tempfile::TempDir;

    const PASSWORD: &str = "s3cret";

    /// Stands in for rsync and ssh with local shell scripts that prompt
    /// for a password on the pty, so the real runner is exercised.
    struct StubServer {
        runner: PasswordRunner,
        remote_dir: PathBuf,
        upload_fails: bool,
        calls: Mutex<Vec<String>>,
    }

    impl StubServer {
        fn new(remote_dir: &Path, upload_fails: bool) -> Arc<Self> {
            let runner = PasswordRunner::new(
                RunnerConfig {
                    timeout: Duration::from_secs(10),
                    echo: false,
                },
                Some(Password::new(PASSWORD)),
            );
            Arc::new(Self {
                runner,
                remote_dir: remote_dir.to_path_buf(),
                upload_fails,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn translate(&self, command: &CommandLine) -> CommandLine {
            let remote = self.remote_dir.display();
            let login = format!(
                r#"printf "deployer@example.net's password: "; read pw; [ "$pw" = "{PASSWORD}" ] || exit 5"#
            );
            let body = match command.program() {
                "rsync" if self.upload_fails => {
                    "echo 'rsync: connection unexpectedly closed'; exit 12".to_string()
                }
                "rsync" => {
                    let local = &command.arguments()[2];
                    format!(r#"cp -R "{local}." "{remote}/""#)
                }
                "ssh" => format!(
                    r#"cd "{remote}" && test -x ./server-deploy.sh && grep -q "localhost:3000" server-deploy.sh"#
                ),
                other => format!("echo 'unexpected program {other}'; exit 99"),
            };
            CommandLine::new("sh")
                .arg("-c")
                .arg(format!("{login}; {body}"))
        }
    }

    impl CommandRunner for StubServer {
        fn execute<'a>(
            &'a self,
            command: &'a CommandLine,
        ) -> Pin<Box<dyn Future<Output = Result<(), RunnerError>> + Send + 'a>> {
            Box::pin(async move {
                self.calls
                    .lock()
                    .unwrap()
                    .push(command.program().to_string());
                let stub = self.translate(command);
                self.runner.run(&stub).await
            })
        }
    }

    fn create_project() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::write(root.join("app.js"), b"require('./routes')").unwrap();
        fs::write(root.join("package.json"), b"{\"name\":\"stack-blog\"}").unwrap();
        fs::write(root.join(".env"), b"LOCAL_SECRET=1").unwrap();
        fs::write(root.join(".env.production"), b"NODE_ENV=production").unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join(".git").join("HEAD"), b"ref: refs/heads/main").unwrap();
        fs::create_dir_all(root.join("routes")).unwrap();
        fs::write(root.join("routes").join("index.js"), b"module.exports = {}").unwrap();
        dir
    }

    fn plan(project: &Path, scratch_dir: &Path) -> DeployPlan {
        DeployPlan {
            remote: RemoteTarget {
                user: "deployer".into(),
                host: "example.net".into(),
                path: "~/public_html/site".into(),
            },
            package: PackageConfig::new(project, scratch_dir),
            verification_urls: vec!["https://site.example".into()],
        }
    }

    #[tokio::test]
    async fn full_deploy_through_pty() {
        let project = create_project();
        let scratch = TempDir::new().unwrap();
        let remote = TempDir::new().unwrap();
        let scratch_dir = scratch.path().join("pkg");

        let server = StubServer::new(remote.path(), false);
        let orch = DeployOrchestrator::new(plan(project.path(), &scratch_dir), server.clone());

        let result = orch.deploy().await;
        assert!(result.is_ok(), "deploy failed: {result:?}");
        assert_eq!(exit_code(&result), 0);
        assert_eq!(server.calls(), ["rsync", "ssh"]);

        // The "server" received a clean package.
        let remote = remote.path();
        assert!(remote.join("app.js").is_file());
        assert!(remote.join("routes").join("index.js").is_file());
        assert!(remote.join("server-deploy.sh").is_file());
        assert!(!remote.join(".git").exists());
        assert_eq!(
            fs::read_to_string(remote.join(".env")).unwrap(),
            "NODE_ENV=production"
        );

        assert!(!scratch_dir.exists());
    }

    #[tokio::test]
    async fn failing_upload_stops_before_remote_execute() {
        let project = create_project();
        let scratch = TempDir::new().unwrap();
        let remote = TempDir::new().unwrap();
        let scratch_dir = scratch.path().join("pkg");

        let server = StubServer::new(remote.path(), true);
        let orch = DeployOrchestrator::new(plan(project.path(), &scratch_dir), server.clone());

        let result = orch.deploy().await;
        match &result {
            Err(DeployError::Upload(RunnerError::Exit { status, .. })) => {
                assert_eq!(status.code(), Some(12));
            }
            other => panic!("expected upload failure, got {other:?}"),
        }
        assert_eq!(exit_code(&result), 1);
        assert_eq!(server.calls(), ["rsync"]);
        assert!(fs::read_dir(remote.path()).unwrap().next().is_none());
        assert!(!scratch_dir.exists());
    }
}
