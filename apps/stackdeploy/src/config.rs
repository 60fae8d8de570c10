//! Deploy configuration.
//!
//! Read from `deploy.toml` in the working directory (or the file named by
//! `STACKDEPLOY_CONFIG`). Every field is optional; a missing file means
//! all defaults. The password is never stored here, it comes from
//! `STACKDEPLOY_PASSWORD`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use stackdeploy_deploy::{DeployPlan, RemoteTarget};
use stackdeploy_packager::{DEFAULT_EXCLUDES, PackageConfig, RestartScript};
use stackdeploy_runner::{Password, RunnerConfig};

/// Environment variable naming an alternative config file.
pub const CONFIG_ENV: &str = "STACKDEPLOY_CONFIG";

/// Environment variable holding the SSH password.
pub const PASSWORD_ENV: &str = "STACKDEPLOY_PASSWORD";

const DEFAULT_CONFIG_FILE: &str = "deploy.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub remote_user: String,
    pub remote_host: String,
    pub remote_path: String,

    /// Per-phase timeout for rsync and ssh, in seconds.
    pub timeout_secs: u64,

    /// Copy rsync/ssh output to the terminal.
    pub echo_output: bool,

    /// Project tree to ship, relative to the working directory.
    pub source_dir: PathBuf,

    /// Scratch directory. Defaults to `<tmp>/stack_blog_deploy`.
    pub scratch_dir: Option<PathBuf>,

    /// Production env file, relative to `source_dir`.
    pub env_file: PathBuf,

    pub excludes: Vec<String>,

    pub app_name: String,
    pub port: u16,
    pub process_pattern: String,
    pub session_name: String,
    pub entry_point: String,
    pub log_file: String,

    /// Public site root used to build verification URLs.
    pub site_url: String,
    pub verify_paths: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        let script = RestartScript::default();
        Self {
            remote_user: "certifiedhq".into(),
            remote_host: "certifiedhq.pairserver.com".into(),
            remote_path: "~/public_html/cpeio.online".into(),
            timeout_secs: 60,
            echo_output: true,
            source_dir: PathBuf::from("."),
            scratch_dir: None,
            env_file: PathBuf::from(".env.production"),
            excludes: DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect(),
            app_name: script.app_name,
            port: script.port,
            process_pattern: script.process_pattern,
            session_name: script.session_name,
            entry_point: script.entry_point,
            log_file: script.log_file,
            site_url: "https://cpeio.online".into(),
            verify_paths: vec![
                "/".into(),
                "/admin".into(),
                "/rss.xml".into(),
                "/api/status".into(),
            ],
        }
    }
}

impl Config {
    /// Loads `$STACKDEPLOY_CONFIG` or `./deploy.toml`, falling back to defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::load_from(&path)
    }

    /// Loads `path` if it exists, otherwise returns defaults.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.timeout_secs > 0, "timeout_secs must be greater than zero");
        anyhow::ensure!(!self.site_url.trim().is_empty(), "site_url is empty");
        Ok(())
    }

    pub fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            echo: self.echo_output,
        }
    }

    /// Scratch directory, defaulting under the system temp dir.
    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("stack_blog_deploy"))
    }

    /// Verification URLs: `site_url` joined with each of `verify_paths`.
    pub fn verification_urls(&self) -> Vec<String> {
        let base = self.site_url.trim_end_matches('/');
        self.verify_paths
            .iter()
            .map(|p| match p.trim_start_matches('/') {
                "" => base.to_string(),
                rest => format!("{base}/{rest}"),
            })
            .collect()
    }

    /// Resolves the deploy plan. Relative paths resolve against `workdir`.
    pub fn to_plan(&self, workdir: &Path) -> DeployPlan {
        let resolve = |path: PathBuf| {
            if path.is_absolute() {
                path
            } else {
                workdir.join(path)
            }
        };

        let mut package = PackageConfig::new(
            resolve(self.source_dir.clone()),
            resolve(self.scratch_dir()),
        );
        package.env_file = self.env_file.clone();
        package.excludes = self.excludes.clone();
        package.script = RestartScript {
            app_name: self.app_name.clone(),
            port: self.port,
            process_pattern: self.process_pattern.clone(),
            session_name: self.session_name.clone(),
            entry_point: self.entry_point.clone(),
            log_file: self.log_file.clone(),
        };

        DeployPlan {
            remote: RemoteTarget {
                user: self.remote_user.clone(),
                host: self.remote_host.clone(),
                path: self.remote_path.clone(),
            },
            package,
            verification_urls: self.verification_urls(),
        }
    }
}

/// Reads the password from [`PASSWORD_ENV`].
pub fn password_from_env() -> Option<Password> {
    password_from(std::env::var(PASSWORD_ENV).ok())
}

fn password_from(value: Option<String>) -> Option<Password> {
    value.filter(|v| !v.is_empty()).map(Password::new)
}
