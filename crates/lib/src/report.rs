//! Deploy receipts.
//!
//! A successful run can record what it shipped: the hashed artifact stem,
//! the advertised asset size, and how much was copied. Written as pretty
//! JSON with write-temp-then-rename so a crash never leaves a torn receipt.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Current report format version.
pub const REPORT_VERSION: u32 = 1;

/// Receipt of a deploy run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployReport {
  pub version: u32,

  /// Hashed stem of the published artifact; absent for dry runs.
  pub artifact_stem: Option<String>,

  /// Byte size advertised in the server fragment.
  pub asset_size: u64,

  /// Files placed in the destination.
  pub files_published: usize,

  pub duration_ms: u64,
  pub finished_at_unix: u64,
  pub dry_run: bool,
}

/// Errors persisting or loading a report.
#[derive(Debug, Error)]
pub enum ReportError {
  #[error("failed to serialize report: {0}")]
  Serialize(#[from] serde_json::Error),

  #[error("failed to write report {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to read report {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Save a report, atomically replacing any prior one.
pub fn save_report(path: &Path, report: &DeployReport) -> Result<(), ReportError> {
  let content = serde_json::to_string_pretty(report)?;

  let temp_path = path.with_extension("json.tmp");
  let write_err = |source: io::Error| ReportError::Write {
    path: path.to_path_buf(),
    source,
  };
  fs::write(&temp_path, &content).map_err(write_err)?;
  fs::rename(&temp_path, path).map_err(write_err)?;

  Ok(())
}

/// Load the report at `path`, or `None` if there is none.
pub fn load_report(path: &Path) -> Result<Option<DeployReport>, ReportError> {
  let content = match fs::read_to_string(path) {
    Ok(content) => content,
    Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
    Err(source) => {
      return Err(ReportError::Read {
        path: path.to_path_buf(),
        source,
      });
    }
  };

  Ok(Some(serde_json::from_str(&content)?))
}
