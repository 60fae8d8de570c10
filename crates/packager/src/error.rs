//! Packaging error types.

use std::path::PathBuf;

/// Errors produced while building the deployment package.
#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to walk project tree: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("invalid exclude pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("production env file not found: {}", .0.display())]
    MissingEnvFile(PathBuf),

    #[error("source directory not found: {}", .0.display())]
    MissingSource(PathBuf),

    #[error(
        "scratch directory {} would delete the project at {}",
        .scratch.display(),
        .project.display()
    )]
    ScratchOverlapsSource { scratch: PathBuf, project: PathBuf },

    #[error("invalid restart script value for {field}: {value:?}")]
    ScriptValue { field: &'static str, value: String },
}
