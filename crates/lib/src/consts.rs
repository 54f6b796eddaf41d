//! Fixed names shared across the pipeline.

/// Suffix wasm-bindgen gives the primary compiled artifact.
pub const WASM_ARTIFACT_SUFFIX: &str = "_bg.wasm";

/// Directive whose presence means the build config is already patched.
pub const BUILD_STD_DIRECTIVE: &str = "build-std";

/// Response header advertising the compressed asset size.
pub const SIZE_HEADER: &str = "X-file-size";

/// Loader script that requests the worker entry point; identified by referer.
pub const WORKER_SCRIPT: &str = "workerHelpers.worker.js";

/// File the viewer embeds at compile time to know the asset size up front.
pub const SIZE_FILE: &str = "file_size";

/// Name of the generated server configuration fragment.
pub const FRAGMENT_FILENAME: &str = ".htaccess";

/// Default name of the JSON deploy receipt.
pub const REPORT_FILENAME: &str = "deploy-report.json";
