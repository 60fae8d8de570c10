//! Filtered tree copy.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::PackageError;
use crate::exclude::ExcludeSet;

/// Counts of what was staged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageSummary {
    pub files: u64,
    pub directories: u64,
    pub symlinks: u64,
    pub bytes: u64,
}

/// Copies `source` into `dest`, skipping anything `excludes` rejects.
///
/// `dest` must already exist. If it lies inside `source` it is skipped,
/// so the copy never recurses into itself. Permission bits are preserved;
/// symlinks are recreated as symlinks and never followed.
pub fn stage_tree(
    source: &Path,
    dest: &Path,
    excludes: &ExcludeSet,
) -> Result<StageSummary, PackageError> {
    if !source.is_dir() {
        return Err(PackageError::MissingSource(source.to_path_buf()));
    }

    let dest_canonical = fs::canonicalize(dest)?;
    let mut summary = StageSummary::default();

    let walker = WalkDir::new(source)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            let rel = relative(source, entry.path());
            let is_dir = entry.file_type().is_dir();
            if excludes.is_excluded(&rel, is_dir) {
                debug!(path = %rel.display(), "excluded");
                return false;
            }
            !(is_dir && is_same_dir(entry.path(), &dest_canonical))
        });

    for entry in walker {
        let entry = entry?;
        let rel = relative(source, entry.path());
        let target = dest.join(&rel);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
            summary.directories += 1;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
            summary.symlinks += 1;
        } else if file_type.is_file() {
            summary.bytes += fs::copy(entry.path(), &target)?;
            summary.files += 1;
        } else {
            warn!(path = %rel.display(), "skipping special file");
        }
    }

    Ok(summary)
}

fn relative(root: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(root).unwrap_or(path).to_path_buf()
}

fn is_same_dir(path: &Path, canonical: &Path) -> bool {
    fs::canonicalize(path).is_ok_and(|p| p == canonical)
}

#[cfg(unix)]
fn copy_symlink(link: &Path, target: &Path) -> Result<(), PackageError> {
    let pointee = fs::read_link(link)?;
    std::os::unix::fs::symlink(pointee, target)?;
    Ok(())
}

#[cfg(not(unix))]
fn copy_symlink(link: &Path, _target: &Path) -> Result<(), PackageError> {
    warn!(path = %link.display(), "symlinks are not staged on this platform");
    Ok(())
}
