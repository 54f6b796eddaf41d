//! Mirroring build output to the served destination.
//!
//! The destination is swapped rather than cleared in place: the new tree is
//! staged in a sibling temp directory, the live tree is renamed aside, the
//! staging tree renamed into its place, and the old tree deleted. A failure
//! while staging leaves the live destination untouched; the inconsistency
//! window shrinks to the two renames.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Errors staging or swapping the destination.
#[derive(Debug, Error)]
pub enum PublishError {
  /// Copying a source tree into the staging directory failed.
  #[error("failed to stage {path}: {source}")]
  Stage {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// Swapping the staged tree into the destination failed.
  #[error("failed to swap staged tree into {dest}: {source}")]
  Swap {
    dest: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Mirror `dist_dir` and `assets_dir` into `dest_dir`.
///
/// Assets are copied second and may overwrite build output. Returns the
/// number of files placed in the destination.
pub fn publish(dist_dir: &Path, assets_dir: &Path, dest_dir: &Path) -> Result<usize, PublishError> {
  let parent = dest_dir.parent().unwrap_or(Path::new("."));
  fs::create_dir_all(parent).map_err(|source| PublishError::Swap {
    dest: dest_dir.to_path_buf(),
    source,
  })?;

  let staging = tempfile::Builder::new()
    .prefix(".webdeploy-staging-")
    .tempdir_in(parent)
    .map_err(|source| PublishError::Stage {
      path: parent.to_path_buf(),
      source,
    })?;

  let mut copied = copy_tree(dist_dir, staging.path())?;
  copied += copy_tree(assets_dir, staging.path())?;
  debug!(files = copied, staging = %staging.path().display(), "staging complete");

  swap_into_place(staging.keep(), dest_dir)?;

  info!(files = copied, dest = %dest_dir.display(), "published");
  Ok(copied)
}

/// Recursively copy `src` into `dst`, returning the number of files copied.
fn copy_tree(src: &Path, dst: &Path) -> Result<usize, PublishError> {
  let stage_err = |source: io::Error| PublishError::Stage {
    path: src.to_path_buf(),
    source,
  };

  let mut copied = 0;
  for entry in WalkDir::new(src) {
    let entry = entry.map_err(|e| stage_err(io::Error::other(e)))?;
    let rel = entry
      .path()
      .strip_prefix(src)
      .map_err(|e| stage_err(io::Error::other(e)))?;
    let target = dst.join(rel);

    if entry.file_type().is_dir() {
      fs::create_dir_all(&target).map_err(stage_err)?;
    } else {
      if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(stage_err)?;
      }
      fs::copy(entry.path(), &target).map_err(stage_err)?;
      copied += 1;
    }
  }
  Ok(copied)
}

/// Rename the staged tree into the destination, moving any live tree aside
/// first and deleting it afterwards.
fn swap_into_place(staged: PathBuf, dest_dir: &Path) -> Result<(), PublishError> {
  let swap_err = |source: io::Error| PublishError::Swap {
    dest: dest_dir.to_path_buf(),
    source,
  };

  if !dest_dir.exists() {
    return fs::rename(&staged, dest_dir).map_err(swap_err);
  }

  let parent = dest_dir.parent().unwrap_or(Path::new("."));
  let old = parent.join(format!(".webdeploy-old-{}", std::process::id()));
  if old.exists() {
    fs::remove_dir_all(&old).map_err(swap_err)?;
  }

  fs::rename(dest_dir, &old).map_err(swap_err)?;

  if let Err(source) = fs::rename(&staged, dest_dir) {
    // Put the previous tree back so the destination keeps serving something
    if let Err(rollback) = fs::rename(&old, dest_dir) {
      warn!(error = %rollback, "failed to move previous destination back");
    }
    let _ = fs::remove_dir_all(&staged);
    return Err(swap_err(source));
  }

  if let Err(e) = fs::remove_dir_all(&old) {
    warn!(path = %old.display(), error = %e, "failed to delete previous destination tree");
  }
  Ok(())
}
