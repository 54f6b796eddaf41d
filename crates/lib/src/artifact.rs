//! Artifact discovery in the bundler output.
//!
//! The bundler embeds a content hash in the primary artifact's filename, so
//! the name is only known after the build. The server fragment needs the
//! stem to parametrize its rewrite rules.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::consts::WASM_ARTIFACT_SUFFIX;

/// Errors locating the primary artifact.
#[derive(Debug, Error)]
pub enum ArtifactError {
  /// Output directory could not be listed.
  #[error("failed to read output directory {path}: {source}")]
  ReadDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// No qualifying artifact in the output directory.
  #[error("no *_bg.wasm artifact found in {path}")]
  NotFound { path: PathBuf },
}

/// Find the content-hashed stem of the primary wasm artifact.
///
/// Scans the immediate entries of `dist_dir` for names ending in `_bg.wasm`
/// and strips that suffix. Directory listing order is not deterministic, so
/// when several names qualify the lexicographically smallest wins.
pub fn find_primary_artifact_stem(dist_dir: &Path) -> Result<String, ArtifactError> {
  let entries = fs::read_dir(dist_dir).map_err(|source| ArtifactError::ReadDir {
    path: dist_dir.to_path_buf(),
    source,
  })?;

  let mut candidates = Vec::new();
  for entry in entries {
    let entry = entry.map_err(|source| ArtifactError::ReadDir {
      path: dist_dir.to_path_buf(),
      source,
    })?;
    let name = entry.file_name();
    let Some(name) = name.to_str() else {
      continue;
    };
    if name.ends_with(WASM_ARTIFACT_SUFFIX) {
      candidates.push(name.to_string());
    }
  }

  candidates.sort();
  debug!(count = candidates.len(), "wasm artifact candidates");

  let first = candidates.into_iter().next().ok_or_else(|| ArtifactError::NotFound {
    path: dist_dir.to_path_buf(),
  })?;

  Ok(first[..first.len() - WASM_ARTIFACT_SUFFIX.len()].to_string())
}
