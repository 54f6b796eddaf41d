//! Transient patching of the Cargo build configuration.
//!
//! The web build needs `build-std` and a dedicated target directory, both of
//! which live in `.cargo/config.toml` and affect every other build in the
//! workspace. The patch is a literal marker block appended for the duration
//! of the run and stripped again at release. Insertion and removal use the
//! identical string, so removal leaves no residue and never touches bytes it
//! did not write.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::consts::BUILD_STD_DIRECTIVE;

/// Errors reading or writing the build configuration.
#[derive(Debug, Error)]
pub enum PatchError {
  /// Configuration file could not be read.
  #[error("failed to read build config {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// Configuration file could not be written.
  #[error("failed to write build config {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Render the marker block enabling the web build mode.
///
/// `target_dir` must already be absolute; backslashes are escaped so the
/// block stays valid TOML on Windows.
pub fn build_marker(target_dir: &Path) -> String {
  let dir = target_dir.to_string_lossy().replace('\\', "\\\\");
  format!("\n[unstable]\nbuild-std = [\"std\", \"panic_abort\"]\n[build]\ntarget-dir = \"{dir}\"")
}

/// Append `marker` to the config unless a `build-std` directive is already
/// present. Returns whether a patch was applied.
pub fn ensure_patched(config_path: &Path, marker: &str) -> Result<bool, PatchError> {
  let config = read_config(config_path)?;

  if config.contains(BUILD_STD_DIRECTIVE) {
    debug!(config = %config_path.display(), "build config already patched");
    return Ok(false);
  }

  let mut patched = config;
  patched.push_str(marker);
  write_config(config_path, &patched)?;

  info!(config = %config_path.display(), "build config patched");
  Ok(true)
}

/// Remove the first exact occurrence of `marker` from the config, leaving
/// all other content byte-identical. A config without the marker is left
/// untouched.
pub fn restore(config_path: &Path, marker: &str) -> Result<(), PatchError> {
  let config = read_config(config_path)?;

  let Some(at) = config.find(marker) else {
    debug!(config = %config_path.display(), "marker not present, nothing to restore");
    return Ok(());
  };

  let mut restored = String::with_capacity(config.len() - marker.len());
  restored.push_str(&config[..at]);
  restored.push_str(&config[at + marker.len()..]);
  write_config(config_path, &restored)?;

  info!(config = %config_path.display(), "build config restored");
  Ok(())
}

fn read_config(path: &Path) -> Result<String, PatchError> {
  fs::read_to_string(path).map_err(|source| PatchError::Read {
    path: path.to_path_buf(),
    source,
  })
}

fn write_config(path: &Path, content: &str) -> Result<(), PatchError> {
  fs::write(path, content).map_err(|source| PatchError::Write {
    path: path.to_path_buf(),
    source,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  const BASE_CONFIG: &str = "[build]\njobs = 4\n";

  fn config_file(content: &str) -> (TempDir, PathBuf) {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.toml");
    fs::write(&path, content).unwrap();
    (temp, path)
  }

  #[test]
  fn marker_embeds_target_dir() {
    let marker = build_marker(Path::new("/work/target/web"));
    assert!(marker.contains("build-std = [\"std\", \"panic_abort\"]"));
    assert!(marker.contains("target-dir = \"/work/target/web\""));
    assert!(marker.starts_with('\n'));
  }

  #[test]
  fn marker_escapes_backslashes() {
    let marker = build_marker(Path::new(r"C:\work\target\web"));
    assert!(marker.contains(r#"target-dir = "C:\\work\\target\\web""#));
  }

  #[test]
  fn ensure_patched_appends_marker() {
    let (_temp, path) = config_file(BASE_CONFIG);
    let marker = build_marker(Path::new("/t/web"));

    let applied = ensure_patched(&path, &marker).unwrap();

    assert!(applied);
    let content = fs::read_to_string(&path).unwrap();
    assert_eq!(content, format!("{BASE_CONFIG}{marker}"));
  }

  #[test]
  fn ensure_patched_is_idempotent() {
    let (_temp, path) = config_file(BASE_CONFIG);
    let marker = build_marker(Path::new("/t/web"));

    assert!(ensure_patched(&path, &marker).unwrap());
    let after_first = fs::read_to_string(&path).unwrap();

    // Second call sees build-std and makes no write
    assert!(!ensure_patched(&path, &marker).unwrap());
    assert_eq!(fs::read_to_string(&path).unwrap(), after_first);
  }

  #[test]
  fn restore_removes_exactly_what_was_inserted() {
    let (_temp, path) = config_file(BASE_CONFIG);
    let marker = build_marker(Path::new("/t/web"));

    ensure_patched(&path, &marker).unwrap();
    restore(&path, &marker).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), BASE_CONFIG);
  }

  #[test]
  fn restore_removes_only_first_occurrence() {
    let marker = build_marker(Path::new("/t/web"));
    let content = format!("{BASE_CONFIG}{marker}{marker}");
    let (_temp, path) = config_file(&content);

    restore(&path, &marker).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), format!("{BASE_CONFIG}{marker}"));
  }

  #[test]
  fn restore_without_marker_leaves_config_untouched() {
    let (_temp, path) = config_file(BASE_CONFIG);
    let marker = build_marker(Path::new("/t/web"));

    restore(&path, &marker).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), BASE_CONFIG);
  }

  #[test]
  fn ensure_patched_missing_file_fails() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("missing.toml");
    let marker = build_marker(Path::new("/t/web"));

    let result = ensure_patched(&path, &marker);
    assert!(matches!(result, Err(PatchError::Read { .. })));
  }
}
