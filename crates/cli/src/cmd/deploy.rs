//! Implementation of the `webdeploy deploy` command.
//!
//! Builds the viewer against a transiently patched build configuration,
//! mirrors the output to the served directory, and writes the server
//! fragment. The configuration is restored on every exit path.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Args;

use webdeploy_lib::consts::REPORT_FILENAME;
use webdeploy_lib::deploy::deploy;
use webdeploy_lib::options::DeployOptions;

use crate::output::{format_bytes, print_info, print_stat, print_success};

#[derive(Debug, Args)]
pub struct DeployArgs {
  /// Destination directory served by the web server
  pub dest: PathBuf,

  /// Directory of the web crate
  #[arg(long, default_value = ".")]
  pub project: PathBuf,

  /// Resolve and report without mutating anything
  #[arg(long)]
  pub dry_run: bool,

  /// Bundler executable
  #[arg(long)]
  pub bundler: Option<String>,

  /// Argument passed to the bundler (repeatable, replaces the default `build`)
  #[arg(long = "bundler-arg")]
  pub bundler_arg: Vec<String>,

  /// Large binary asset whose size is advertised in the fragment
  #[arg(long)]
  pub asset: Option<PathBuf>,

  /// Generic artifact name the rewrite rules resolve to the hashed stem
  #[arg(long)]
  pub app_name: Option<String>,

  /// Where to write the JSON deploy receipt
  #[arg(long, default_value = REPORT_FILENAME)]
  pub report: PathBuf,
}

/// Execute the deploy command.
pub fn cmd_deploy(args: &DeployArgs) -> Result<()> {
  let mut options = DeployOptions::for_project(&args.project, &args.dest);
  if let Some(bundler) = &args.bundler {
    options.bundler = bundler.clone();
  }
  if !args.bundler_arg.is_empty() {
    options.bundler_args = args.bundler_arg.clone();
  }
  if let Some(asset) = &args.asset {
    options.asset_path = asset.clone();
  }
  if let Some(app_name) = &args.app_name {
    options.app_name = app_name.clone();
  }
  options.report_path = Some(args.report.clone());
  options.dry_run = args.dry_run;

  let started = Instant::now();
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let report = rt.block_on(deploy(&options)).context("Deploy failed")?;

  println!();
  if report.dry_run {
    print_info("Dry run - nothing deployed");
    print_stat("Asset size", &format_bytes(report.asset_size));
    return Ok(());
  }

  print_success("Deploy complete!");
  print_stat("Artifact", report.artifact_stem.as_deref().unwrap_or("(unknown)"));
  print_stat(
    "Asset size",
    &format!("{} ({} bytes)", format_bytes(report.asset_size), report.asset_size),
  );
  print_stat("Files published", &report.files_published.to_string());
  print_stat(
    "Took",
    &humantime::format_duration(Duration::from_secs(started.elapsed().as_secs())).to_string(),
  );

  Ok(())
}
