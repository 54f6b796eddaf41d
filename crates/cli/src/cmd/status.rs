//! Implementation of the `webdeploy status` command.
//!
//! Read-only: shows the resolved paths, whether the build config currently
//! carries the patch, and the last recorded deploy.

use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};

use webdeploy_lib::consts::{BUILD_STD_DIRECTIVE, REPORT_FILENAME};
use webdeploy_lib::options::{DeployOptions, absolutize};
use webdeploy_lib::report::load_report;

use crate::output::{format_bytes, print_info, print_stat};

/// Execute the status command.
pub fn cmd_status(project: &Path) -> Result<()> {
  let project_dir = dunce::canonicalize(project)
    .with_context(|| format!("Project directory not found: {}", project.display()))?;
  let options = DeployOptions::for_project(&project_dir, Path::new(""));

  print_info(&format!("webdeploy v{}", env!("CARGO_PKG_VERSION")));
  println!();
  print_stat("Project", &project_dir.display().to_string());

  let cargo_config = absolutize(&project_dir, &options.cargo_config);
  let config_state = match fs::read_to_string(&cargo_config) {
    Ok(content) if content.contains(BUILD_STD_DIRECTIVE) => "patched",
    Ok(_) => "clean",
    Err(_) => "missing",
  };
  print_stat("Build config", &format!("{} ({config_state})", cargo_config.display()));

  let asset_path = absolutize(&project_dir, &options.asset_path);
  let asset_state = match fs::metadata(&asset_path) {
    Ok(metadata) => format_bytes(metadata.len()),
    Err(_) => "missing".to_string(),
  };
  print_stat("Asset", &format!("{} ({asset_state})", asset_path.display()));

  match load_report(&project_dir.join(REPORT_FILENAME))? {
    Some(report) => {
      let stem = report.artifact_stem.as_deref().unwrap_or("(unknown)").to_string();
      let ago = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
        .saturating_sub(report.finished_at_unix);
      print_stat(
        "Last deploy",
        &format!("{stem}, {} ago", humantime::format_duration(Duration::from_secs(ago))),
      );
    }
    None => print_stat("Last deploy", "none recorded"),
  }

  Ok(())
}
