//! Pre-builds the analysis image for a repository without serving.
//!
//! Useful for warming the image cache ahead of time: the next
//! `repo-read-mcp` start over the same repository content is a cache hit.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use repo_read_sandbox::{SandboxConfig, Seagoat};

#[derive(Parser)]
#[command(name = "repo-read-prepare")]
#[command(about = "Build (or reuse) the analysis image for a repository", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the repository to prepare
    repo_path: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();
    let repo_path = cli
        .repo_path
        .canonicalize()
        .with_context(|| format!("invalid repository path '{}'", cli.repo_path.display()))?;
    anyhow::ensure!(
        repo_path.is_dir(),
        "'{}' is not a directory",
        repo_path.display()
    );

    let mut sandbox = Seagoat::new(&repo_path, SandboxConfig::from_env());
    sandbox.prepare().await?;

    if let Some(tag) = sandbox.image_tag() {
        log::info!("analysis image ready: {tag}");
    }
    Ok(())
}
