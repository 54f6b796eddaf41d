//! Generation of the served `.htaccess` fragment.
//!
//! Pure text composition: a static template prefix read from disk, followed
//! by a generated block wiring the asset size header, no-cache rules for the
//! versioned entry files, and the rewrites that resolve the generic artifact
//! name to the hashed one. The template is never parsed.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::consts::{SIZE_HEADER, WORKER_SCRIPT};

/// Errors composing or writing the server fragment.
#[derive(Debug, Error)]
pub enum GenerateError {
  /// Template file could not be read.
  #[error("failed to read template {path}: {source}")]
  Template {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// Binary asset could not be inspected.
  #[error("failed to stat asset {path}: {source}")]
  AssetSize {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// Fragment could not be written to the destination.
  #[error("failed to write fragment {path}: {source}")]
  WriteFragment {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Byte length of the external binary asset.
pub fn asset_size(path: &Path) -> Result<u64, GenerateError> {
  let metadata = fs::metadata(path).map_err(|source| GenerateError::AssetSize {
    path: path.to_path_buf(),
    source,
  })?;
  debug!(asset = %path.display(), size = metadata.len(), "asset size read");
  Ok(metadata.len())
}

/// Read the static template prefix.
pub fn read_template(path: &Path) -> Result<String, GenerateError> {
  fs::read_to_string(path).map_err(|source| GenerateError::Template {
    path: path.to_path_buf(),
    source,
  })
}

/// Compose the full fragment: template prefix plus the generated block.
///
/// The generated block advertises `asset_size` for the brotli-compressed
/// asset, disables caching of the versioned entry files, and rewrites the
/// generic `{app_name}_bg.wasm` reference (and, for requests arriving from
/// the worker loader, the bare module path) to the hashed `stem`.
pub fn generate(template: &str, asset_size: u64, stem: &str, asset_name: &str, app_name: &str) -> String {
  let asset_pattern = asset_name.replace('.', "\\.");
  let mut out = String::from(template);
  if !out.is_empty() && !out.ends_with('\n') {
    out.push('\n');
  }
  out.push_str(&format!(
    "<FilesMatch \"{asset_pattern}\\.br\">\n\
     \x20   Header append {SIZE_HEADER} \"{asset_size}\"\n\
     </FilesMatch>\n\
     <FilesMatch \"(index\\.html)|({app_name}-.*\\.js)\">\n\
     \x20   Header set Pragma \"no-cache\"\n\
     </FilesMatch>\n\
     RewriteEngine On\n\
     RewriteRule {app_name}_bg\\.wasm$ {stem}_bg.wasm [L]\n\
     RewriteCond %{{HTTP_REFERER}} {WORKER_SCRIPT}$\n\
     RewriteRule ^$ {stem}.js [L]\n"
  ));
  out
}

/// Write the fragment verbatim, replacing any prior version.
pub fn write_fragment(path: &Path, content: &str) -> Result<(), GenerateError> {
  fs::write(path, content).map_err(|source| GenerateError::WriteFragment {
    path: path.to_path_buf(),
    source,
  })?;
  info!(path = %path.display(), "server fragment written");
  Ok(())
}
