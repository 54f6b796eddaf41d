//! Bundler invocation.
//!
//! The external bundler owns everything about the build; the contract here
//! is exit-code-only. Its stdio is inherited so build progress reaches the
//! terminal unchanged.

use std::io;
use std::path::Path;

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

/// Errors running the bundler.
#[derive(Debug, Error)]
pub enum BuildError {
  /// Bundler executable could not be spawned.
  #[error("failed to spawn {program}: {source}")]
  Spawn {
    program: String,
    #[source]
    source: io::Error,
  },

  /// Bundler exited with a non-zero status.
  #[error("{program} exited with status {code:?}")]
  ToolFailed { program: String, code: Option<i32> },
}

/// Run the bundler in `project_dir`, blocking until it exits.
pub async fn run_bundler(program: &str, args: &[String], project_dir: &Path) -> Result<(), BuildError> {
  info!(program = %program, args = ?args, dir = %project_dir.display(), "running bundler");

  let status = Command::new(program)
    .args(args)
    .current_dir(project_dir)
    .status()
    .await
    .map_err(|source| BuildError::Spawn {
      program: program.to_string(),
      source,
    })?;

  if !status.success() {
    return Err(BuildError::ToolFailed {
      program: program.to_string(),
      code: status.code(),
    });
  }

  debug!(program = %program, "bundler finished");
  Ok(())
}
