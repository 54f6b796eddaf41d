use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cmd;
mod output;

/// webdeploy - build-and-publish pipeline for the wasm graph viewer
#[derive(Parser)]
#[command(name = "webdeploy")]
#[command(author, version, about, long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Build the viewer and publish it to the served directory
  Deploy(cmd::deploy::DeployArgs),

  /// Show the resolved project state and the last deploy
  Status {
    /// Directory of the web crate
    #[arg(long, default_value = ".")]
    project: PathBuf,
  },
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .without_time()
    .init();

  let cli = Cli::parse();

  match cli.command {
    Commands::Deploy(args) => cmd::deploy::cmd_deploy(&args),
    Commands::Status { project } => cmd::status::cmd_status(&project),
  }
}
