//! webdeploy-lib: build-and-publish pipeline for the wasm viewer
//!
//! This crate provides the pieces of the deploy transaction:
//! - `patch`: transient marker patching of the Cargo build configuration
//! - `build`: bundler invocation
//! - `artifact`: hashed artifact discovery in the bundler output
//! - `publish`: stage-and-swap mirroring to the served directory
//! - `htaccess`: server configuration fragment generation
//! - `deploy`: the pipeline tying it together under guaranteed restoration

pub mod artifact;
pub mod build;
pub mod consts;
pub mod deploy;
pub mod htaccess;
pub mod lock;
pub mod options;
pub mod patch;
pub mod publish;
pub mod report;
