//! CLI smoke tests for webdeploy.
//!
//! These tests verify that the CLI commands run without panicking and
//! return appropriate exit codes.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a Command for the webdeploy binary.
fn webdeploy_cmd() -> Command {
  cargo_bin_cmd!("webdeploy")
}

/// Lay out a minimal viewer project under a temp root.
///
/// Returns the temp root; the web crate lives at `<root>/web`, the Cargo
/// config and graph asset one level above it, matching the defaults.
fn viewer_project() -> TempDir {
  let temp = TempDir::new().unwrap();
  let root = temp.path();
  std::fs::create_dir_all(root.join("web/assets")).unwrap();
  std::fs::create_dir_all(root.join(".cargo")).unwrap();
  std::fs::write(root.join(".cargo/config.toml"), "[build]\njobs = 4\n").unwrap();
  std::fs::write(root.join("graph_n4j.bin"), vec![0u8; 2048]).unwrap();
  std::fs::write(root.join("web/.htaccess"), "AddEncoding br .br\n").unwrap();
  std::fs::write(root.join("web/assets/favicon.ico"), "icon").unwrap();
  temp
}

/// Stub bundler script producing a plausible dist tree.
const STUB_BUILD: &str = "mkdir -p dist \
  && printf wasm > dist/viewer-ab12cd_bg.wasm \
  && printf js > dist/viewer-ab12cd.js \
  && printf html > dist/index.html";

// =============================================================================
// Help & Version
// =============================================================================

#[test]
fn help_flag_works() {
  webdeploy_cmd()
    .arg("--help")
    .assert()
    .success()
    .stdout(predicate::str::contains("Usage"));
}

#[test]
fn version_flag_works() {
  webdeploy_cmd()
    .arg("--version")
    .assert()
    .success()
    .stdout(predicate::str::contains("webdeploy"));
}

#[test]
fn subcommand_help_works() {
  for cmd in &["deploy", "status"] {
    webdeploy_cmd()
      .arg(cmd)
      .arg("--help")
      .assert()
      .success()
      .stdout(predicate::str::contains("Usage"));
  }
}

// =============================================================================
// deploy
// =============================================================================

#[test]
fn deploy_without_dest_fails() {
  webdeploy_cmd().arg("deploy").assert().failure();
}

#[test]
#[cfg(unix)]
fn deploy_with_stub_bundler_succeeds() {
  let temp = viewer_project();
  let root = temp.path();

  webdeploy_cmd()
    .arg("deploy")
    .arg(root.join("srv/app"))
    .arg("--project")
    .arg(root.join("web"))
    .arg("--bundler")
    .arg("/bin/sh")
    .arg("--bundler-arg=-c")
    .arg(format!("--bundler-arg={STUB_BUILD}"))
    .assert()
    .success()
    .stdout(predicate::str::contains("Deploy complete"))
    .stdout(predicate::str::contains("viewer-ab12cd"));

  // Config restored, destination populated, receipt written
  let config = std::fs::read_to_string(root.join(".cargo/config.toml")).unwrap();
  assert!(!config.contains("build-std"));
  assert!(root.join("srv/app/index.html").exists());
  assert!(root.join("srv/app/.htaccess").exists());
  assert!(root.join("web/deploy-report.json").exists());
}

#[test]
#[cfg(unix)]
fn deploy_build_failure_exits_nonzero_and_restores() {
  let temp = viewer_project();
  let root = temp.path();

  webdeploy_cmd()
    .arg("deploy")
    .arg(root.join("srv/app"))
    .arg("--project")
    .arg(root.join("web"))
    .arg("--bundler")
    .arg("/bin/sh")
    .arg("--bundler-arg=-c")
    .arg("--bundler-arg=exit 1")
    .assert()
    .failure()
    .stderr(predicate::str::contains("exited with status"));

  let config = std::fs::read_to_string(root.join(".cargo/config.toml")).unwrap();
  assert!(!config.contains("build-std"));
  assert!(!root.join("srv/app").exists());
}

#[test]
#[cfg(unix)]
fn deploy_dry_run_mutates_nothing() {
  let temp = viewer_project();
  let root = temp.path();

  webdeploy_cmd()
    .arg("deploy")
    .arg(root.join("srv/app"))
    .arg("--project")
    .arg(root.join("web"))
    .arg("--dry-run")
    .assert()
    .success()
    .stdout(predicate::str::contains("Dry run"));

  assert!(!root.join("srv/app").exists());
}

#[test]
fn deploy_missing_asset_fails() {
  let temp = viewer_project();
  let root = temp.path();
  std::fs::remove_file(root.join("graph_n4j.bin")).unwrap();

  webdeploy_cmd()
    .arg("deploy")
    .arg(root.join("srv/app"))
    .arg("--project")
    .arg(root.join("web"))
    .assert()
    .failure()
    .stderr(predicate::str::contains("failed to stat asset"));
}

// =============================================================================
// status
// =============================================================================

#[test]
fn status_shows_clean_project() {
  let temp = viewer_project();

  webdeploy_cmd()
    .arg("status")
    .arg("--project")
    .arg(temp.path().join("web"))
    .assert()
    .success()
    .stdout(predicate::str::contains("clean"))
    .stdout(predicate::str::contains("none recorded"));
}

#[test]
fn status_reports_patched_config() {
  let temp = viewer_project();
  let root = temp.path();
  let config = std::fs::read_to_string(root.join(".cargo/config.toml")).unwrap();
  std::fs::write(
    root.join(".cargo/config.toml"),
    format!("{config}\n[unstable]\nbuild-std = [\"std\", \"panic_abort\"]\n"),
  )
  .unwrap();

  webdeploy_cmd()
    .arg("status")
    .arg("--project")
    .arg(root.join("web"))
    .assert()
    .success()
    .stdout(predicate::str::contains("patched"));
}

#[test]
fn status_missing_project_fails() {
  let temp = TempDir::new().unwrap();

  webdeploy_cmd()
    .arg("status")
    .arg("--project")
    .arg(temp.path().join("nope"))
    .assert()
    .failure();
}
