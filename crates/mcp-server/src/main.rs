//! Repo Read MCP Server
//!
//! Serves read-only repository inspection tools to AI agents via MCP.
//!
//! ## Tools
//!
//! - `read_files` / `read_file_lines` - file content, whole or line-ranged
//! - `read_dirs` / `tree_dir` - directory listings and depth-limited walks
//! - `search` - semantic code search inside a sandboxed analysis container
//!
//! Startup builds (or reuses) the content-addressed analysis image and
//! blocks until the repository has been indexed, so `search` is ready as
//! soon as the server accepts requests.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use repo_read_mcp::RepoReadService;
use rmcp::transport::stdio;
use rmcp::ServiceExt;

#[derive(Parser)]
#[command(name = "repo-read-mcp")]
#[command(about = "Read-only MCP server for inspecting a repository", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the repository to serve
    repo_path: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Configure logging to stderr only (stdout is for MCP protocol)
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

    log::info!("starting repo-read MCP server for {}", repo_path.display());

    let service = RepoReadService::start(repo_path).await?;
    let sandbox = service.sandbox();
    let server = service.serve(stdio()).await?;

    tokio::select! {
        result = server.waiting() => {
            result.context("server transport")?;
        }
        _ = tokio::signal::ctrl_c() => {
            log::info!("interrupted, shutting down");
        }
    }

    // The single registered teardown call: stops and removes the analysis
    // container. The cached image is kept for the next run.
    sandbox.lock().await.cleanup().await?;

    log::info!("repo-read MCP server stopped");
    Ok(())
}
