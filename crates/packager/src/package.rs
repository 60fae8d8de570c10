//! The packaging stage as a whole.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::PackageError;
use crate::exclude::{DEFAULT_EXCLUDES, ExcludeSet};
use crate::script::RestartScript;
use crate::stage::{StageSummary, stage_tree};

/// Name the production env file gets inside the package.
const PACKAGED_ENV_NAME: &str = ".env";

/// Inputs of the packaging stage.
#[derive(Debug, Clone)]
pub struct PackageConfig {
    /// Project tree to ship.
    pub source_dir: PathBuf,
    /// Scratch directory; wiped and recreated on every build.
    pub scratch_dir: PathBuf,
    /// Production env file, relative to `source_dir` unless absolute.
    pub env_file: PathBuf,
    /// rsync-style exclude patterns.
    pub excludes: Vec<String>,
    pub script: RestartScript,
}

impl PackageConfig {
    /// Config with the default exclude list and restart script.
    pub fn new(source_dir: impl Into<PathBuf>, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            scratch_dir: scratch_dir.into(),
            env_file: PathBuf::from(".env.production"),
            excludes: DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect(),
            script: RestartScript::default(),
        }
    }

    fn env_file_path(&self) -> PathBuf {
        if self.env_file.is_absolute() {
            self.env_file.clone()
        } else {
            self.source_dir.join(&self.env_file)
        }
    }
}

/// A built deployment package.
#[derive(Debug, Clone)]
pub struct Package {
    /// Scratch directory holding the package.
    pub root: PathBuf,
    pub script_path: PathBuf,
    pub summary: StageSummary,
}

impl Package {
    /// Removes the scratch directory.
    pub fn cleanup(&self) -> std::io::Result<()> {
        remove_scratch_dir(&self.root)
    }
}

/// Builds deployment packages.
#[derive(Debug, Clone)]
pub struct Packager {
    config: PackageConfig,
}

impl Packager {
    pub fn new(config: PackageConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PackageConfig {
        &self.config
    }

    /// Runs the whole stage: reset, stage, env file, script.
    ///
    /// On error the scratch directory is left as it is.
    pub fn build(&self) -> Result<Package, PackageError> {
        let config = &self.config;
        config.script.validate()?;
        let excludes = ExcludeSet::new(&config.excludes)?;
        check_scratch_dir(&config.source_dir, &config.scratch_dir)?;

        let env_source = config.env_file_path();
        if !env_source.is_file() {
            return Err(PackageError::MissingEnvFile(env_source));
        }

        remove_scratch_dir(&config.scratch_dir)?;
        std::fs::create_dir_all(&config.scratch_dir)?;
        debug!(path = %config.scratch_dir.display(), "scratch directory created");

        let summary = stage_tree(&config.source_dir, &config.scratch_dir, &excludes)?;

        std::fs::copy(&env_source, config.scratch_dir.join(PACKAGED_ENV_NAME))?;
        let script_path = config.script.write_to(&config.scratch_dir)?;

        info!(
            path = %config.scratch_dir.display(),
            files = summary.files,
            bytes = summary.bytes,
            "package staged"
        );

        Ok(Package {
            root: config.scratch_dir.clone(),
            script_path,
            summary,
        })
    }
}

/// Refuses a scratch directory whose reset would delete the project.
///
/// The scratch directory may live inside the project (staging skips it),
/// but it must not be the project itself or one of its ancestors.
fn check_scratch_dir(source_dir: &Path, scratch_dir: &Path) -> Result<(), PackageError> {
    let source = std::fs::canonicalize(source_dir)
        .map_err(|_| PackageError::MissingSource(source_dir.to_path_buf()))?;
    let scratch = resolve_path(scratch_dir)?;

    if source.starts_with(&scratch) {
        return Err(PackageError::ScratchOverlapsSource {
            scratch: scratch_dir.to_path_buf(),
            project: source_dir.to_path_buf(),
        });
    }
    Ok(())
}

/// Canonicalizes `path`, resolving the longest existing prefix when the
/// path itself does not exist yet.
fn resolve_path(path: &Path) -> std::io::Result<PathBuf> {
    match std::fs::canonicalize(path) {
        Ok(resolved) => Ok(resolved),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            match (path.parent(), path.file_name()) {
                (Some(parent), Some(name)) if !parent.as_os_str().is_empty() => {
                    Ok(resolve_path(parent)?.join(name))
                }
                (_, Some(name)) => Ok(std::env::current_dir()?.join(name)),
                _ => Err(e),
            }
        }
        Err(e) => Err(e),
    }
}

/// Removes a scratch directory. A missing directory is not an error.
pub fn remove_scratch_dir(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => {
            debug!(path = %path.display(), "scratch directory removed");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
