//! Deploy orchestration.
//!
//! The high-level `deploy` function drives the full pipeline:
//!
//! 1. Read the asset size
//! 2. Acquire the deploy lock
//! 3. Patch the build configuration and write the size file
//! 4. Run the bundler
//! 5. Locate the hashed primary artifact
//! 6. Stage and swap the output into the destination
//! 7. Generate and write the server fragment
//! 8. Release: remove the size file, restore the configuration
//!
//! Release runs exactly once on every exit path after the patch; a failure
//! in any intermediate step surfaces only after the configuration has been
//! restored. A failure during release itself takes precedence over the
//! original error, which is logged before being dropped.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::artifact::{self, ArtifactError};
use crate::build::{self, BuildError};
use crate::consts::{FRAGMENT_FILENAME, SIZE_FILE};
use crate::htaccess::{self, GenerateError};
use crate::lock::{DeployLock, LockError};
use crate::options::{DeployOptions, absolutize};
use crate::patch::{self, PatchError};
use crate::publish::{self, PublishError};
use crate::report::{self, DeployReport, REPORT_VERSION};

/// Errors that can occur during a deploy run.
#[derive(Debug, Error)]
pub enum DeployError {
  /// Project directory could not be resolved.
  #[error("project directory {path} not found: {source}")]
  Project {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// Another run holds the deploy lock.
  #[error("lock error: {0}")]
  Lock(#[from] LockError),

  /// Build configuration could not be read or written.
  #[error("config patch error: {0}")]
  Patch(#[from] PatchError),

  /// Size file could not be written.
  #[error("failed to write size file {path}: {source}")]
  SizeFile {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// Bundler failed.
  #[error("build error: {0}")]
  Build(#[from] BuildError),

  /// Primary artifact could not be located.
  #[error("artifact error: {0}")]
  Artifact(#[from] ArtifactError),

  /// Destination could not be updated.
  #[error("publish error: {0}")]
  Publish(#[from] PublishError),

  /// Server fragment could not be generated or written.
  #[error("generation error: {0}")]
  Generate(#[from] GenerateError),
}

/// All option paths resolved against the canonical project directory.
struct ResolvedPaths {
  cargo_config: PathBuf,
  target_dir: PathBuf,
  dist_dir: PathBuf,
  assets_dir: PathBuf,
  dest_dir: PathBuf,
  template_path: PathBuf,
  asset_path: PathBuf,
  size_file: PathBuf,
  report_path: Option<PathBuf>,
  asset_name: String,
}

impl ResolvedPaths {
  fn new(project_dir: &Path, options: &DeployOptions) -> Self {
    let asset_path = absolutize(project_dir, &options.asset_path);
    let asset_name = asset_path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_default();

    Self {
      cargo_config: absolutize(project_dir, &options.cargo_config),
      target_dir: absolutize(project_dir, &options.target_dir),
      dist_dir: absolutize(project_dir, &options.dist_dir),
      assets_dir: absolutize(project_dir, &options.assets_dir),
      dest_dir: absolutize(project_dir, &options.dest_dir),
      template_path: absolutize(project_dir, &options.template_path),
      asset_path,
      size_file: project_dir.join(SIZE_FILE),
      report_path: options.report_path.as_deref().map(|p| absolutize(project_dir, p)),
      asset_name,
    }
  }
}

struct RunOutcome {
  stem: String,
  files: usize,
}

/// Build the viewer and publish it to the destination.
///
/// This is the main entry point for `webdeploy deploy`. The bundler runs
/// against a transiently patched build configuration; whatever happens
/// after the patch, the configuration is restored before this function
/// returns.
pub async fn deploy(options: &DeployOptions) -> Result<DeployReport, DeployError> {
  let started = Instant::now();

  let project_dir = dunce::canonicalize(&options.project_dir).map_err(|source| DeployError::Project {
    path: options.project_dir.clone(),
    source,
  })?;
  info!(project = %project_dir.display(), "starting deploy");

  let paths = ResolvedPaths::new(&project_dir, options);
  let size = htaccess::asset_size(&paths.asset_path)?;
  let marker = patch::build_marker(&paths.target_dir);

  if options.dry_run {
    info!("dry run - not deploying");
    return Ok(finish_report(None, size, 0, started, true));
  }

  let _lock = DeployLock::acquire(&project_dir)?;

  let applied = patch::ensure_patched(&paths.cargo_config, &marker)?;

  let run = run_steps(options, &project_dir, &paths, size).await;
  let released = release(&paths, &marker, applied);

  let outcome = match released {
    Ok(()) => run?,
    Err(release_err) => {
      if let Err(run_err) = run {
        error!(error = %run_err, "deploy failed before restore");
      }
      return Err(release_err.into());
    }
  };

  let report = finish_report(Some(outcome.stem), size, outcome.files, started, false);
  if let Some(report_path) = &paths.report_path {
    match report::save_report(report_path, &report) {
      Ok(()) => debug!(path = %report_path.display(), "deploy report saved"),
      Err(e) => warn!(error = %e, "failed to save deploy report"),
    }
  }

  info!(files = report.files_published, "deploy complete");
  Ok(report)
}

/// The critical section: everything that runs with the config patched.
async fn run_steps(
  options: &DeployOptions,
  project_dir: &Path,
  paths: &ResolvedPaths,
  size: u64,
) -> Result<RunOutcome, DeployError> {
  fs::write(&paths.size_file, size.to_string()).map_err(|source| DeployError::SizeFile {
    path: paths.size_file.clone(),
    source,
  })?;

  build::run_bundler(&options.bundler, &options.bundler_args, project_dir).await?;

  let stem = artifact::find_primary_artifact_stem(&paths.dist_dir)?;
  info!(stem = %stem, "artifact located");

  let files = publish::publish(&paths.dist_dir, &paths.assets_dir, &paths.dest_dir)?;

  let template = htaccess::read_template(&paths.template_path)?;
  let fragment = htaccess::generate(&template, size, &stem, &paths.asset_name, &options.app_name);
  htaccess::write_fragment(&paths.dest_dir.join(FRAGMENT_FILENAME), &fragment)?;

  Ok(RunOutcome { stem, files })
}

/// Leave the critical section: remove the size file and restore the config.
///
/// The marker is only stripped when this run inserted it, so a marker placed
/// externally before the run survives and the config still comes out
/// byte-identical.
fn release(paths: &ResolvedPaths, marker: &str, applied: bool) -> Result<(), PatchError> {
  if let Err(e) = fs::remove_file(&paths.size_file)
    && e.kind() != io::ErrorKind::NotFound
  {
    warn!(path = %paths.size_file.display(), error = %e, "failed to remove size file");
  }

  if applied {
    patch::restore(&paths.cargo_config, marker)
  } else {
    debug!("marker was pre-existing, leaving build config untouched");
    Ok(())
  }
}

fn finish_report(stem: Option<String>, size: u64, files: usize, started: Instant, dry_run: bool) -> DeployReport {
  DeployReport {
    version: REPORT_VERSION,
    artifact_stem: stem,
    asset_size: size,
    files_published: files,
    duration_ms: started.elapsed().as_millis() as u64,
    finished_at_unix: SystemTime::now()
      .duration_since(UNIX_EPOCH)
      .unwrap_or_default()
      .as_secs(),
    dry_run,
  }
}
