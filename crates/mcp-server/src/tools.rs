//! MCP tools for repo-read.
//!
//! Five read-only tools over one repository: whole-file reads, line-ranged
//! reads, directory listings, a depth-limited tree walk, and semantic search
//! against the analysis sandbox. Per-item failures stay in-band in the JSON
//! envelopes; only malformed requests surface as MCP-level errors.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use repo_read_protocol::SearchResultsOutput;
use repo_read_repository::Repository;
use repo_read_sandbox::{SandboxConfig, Seagoat};
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo};
use rmcp::schemars;
use rmcp::{tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::Deserialize;
use tokio::sync::Mutex;

/// Repo Read MCP service.
///
/// The sandbox sits behind a mutex: queries against the analysis container
/// must never run concurrently, and the shutdown path needs the same handle
/// for its single teardown call.
#[derive(Clone)]
pub struct RepoReadService {
    repository: Repository,
    sandbox: Arc<Mutex<Seagoat>>,
    tool_router: ToolRouter<Self>,
}

impl RepoReadService {
    /// Resolve or build the analysis image, launch the container and block
    /// until background indexing completes, then expose the tools.
    pub async fn start(project_path: PathBuf) -> Result<Self> {
        let mut sandbox = Seagoat::new(&project_path, SandboxConfig::from_env());
        sandbox.run().await?;
        Ok(Self::from_parts(project_path, sandbox))
    }

    /// Service over an already-constructed sandbox; tests inject a fake
    /// container runtime this way.
    pub fn from_parts(project_path: PathBuf, sandbox: Seagoat) -> Self {
        Self {
            repository: Repository::new(project_path),
            sandbox: Arc::new(Mutex::new(sandbox)),
            tool_router: Self::tool_router(),
        }
    }

    /// Shared sandbox handle for the shutdown path.
    pub fn sandbox(&self) -> Arc<Mutex<Seagoat>> {
        self.sandbox.clone()
    }
}

#[tool_handler]
impl ServerHandler for RepoReadService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Read-only repository inspection. Use 'read_files' or 'read_file_lines' for \
                 file content, 'read_dirs' and 'tree_dir' to explore directories, and 'search' \
                 for natural-language queries over the indexed repository."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            ..Default::default()
        }
    }
}

// ============================================================================
// Tool Input Schemas
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ReadFilesRequest {
    /// Paths relative to the repository root
    #[schemars(description = "File paths relative to the repository root")]
    pub file_paths: Vec<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ReadFileLinesRequest {
    #[schemars(description = "File path relative to the repository root")]
    pub file_path: String,

    /// 1-based, inclusive; clamped into the file's bounds
    #[schemars(description = "First line to read (1-based)")]
    pub start_line: usize,

    #[schemars(description = "Last line to read (inclusive)")]
    pub end_line: usize,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ReadDirsRequest {
    #[schemars(description = "Directory paths relative to the repository root")]
    pub dir_paths: Vec<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct TreeDirRequest {
    #[schemars(description = "Directory path relative to the repository root")]
    pub dir_path: String,

    /// Defaults to 1 (direct children only)
    #[schemars(description = "How many directory levels to descend")]
    pub depth: Option<usize>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchRequest {
    #[schemars(
        description = "Natural-language query; regular expressions may be mixed in, e.g. \
                       \"function calc_.* that deals with taxes\""
    )]
    pub query: String,
}

// ============================================================================
// Tools
// ============================================================================

#[tool_router]
impl RepoReadService {
    #[tool(
        description = "Read multiple files from the repository. Returns each file's content \
                       with its line span; missing files carry an error entry instead of \
                       failing the call."
    )]
    pub async fn read_files(
        &self,
        Parameters(request): Parameters<ReadFilesRequest>,
    ) -> Result<CallToolResult, McpError> {
        json_result(&self.repository.read_files(&request.file_paths))
    }

    #[tool(
        description = "Read a line range from a single file. The range is 1-based, inclusive, \
                       and clamped into the file's bounds."
    )]
    pub async fn read_file_lines(
        &self,
        Parameters(request): Parameters<ReadFileLinesRequest>,
    ) -> Result<CallToolResult, McpError> {
        json_result(&self.repository.read_file_lines(
            &request.file_path,
            request.start_line,
            request.end_line,
        ))
    }

    #[tool(
        description = "List entries of multiple directories relative to the repository root \
                       (non-recursive)."
    )]
    pub async fn read_dirs(
        &self,
        Parameters(request): Parameters<ReadDirsRequest>,
    ) -> Result<CallToolResult, McpError> {
        json_result(&self.repository.read_dirs(&request.dir_paths))
    }

    #[tool(
        description = "Walk a directory to the given depth. Returns at most 100 paths relative \
                       to the repository root."
    )]
    pub async fn tree_dir(
        &self,
        Parameters(request): Parameters<TreeDirRequest>,
    ) -> Result<CallToolResult, McpError> {
        let depth = request.depth.unwrap_or(1);
        json_result(&self.repository.tree_dir(&request.dir_path, depth))
    }

    #[tool(
        description = "Search the repository with a natural-language query (regular \
                       expressions may be mixed in). Returns line-ranged code excerpts."
    )]
    pub async fn search(
        &self,
        Parameters(request): Parameters<SearchRequest>,
    ) -> Result<CallToolResult, McpError> {
        let sandbox = self.sandbox.lock().await;
        let output = match sandbox.search(&request.query).await {
            Ok(results) => SearchResultsOutput {
                results,
                error: None,
            },
            // Callers get a well-formed, empty result set with the translated
            // error category in-band, never a raw runtime failure.
            Err(err) => SearchResultsOutput {
                results: Vec::new(),
                error: Some(err.to_string()),
            },
        };
        json_result(&output)
    }
}

fn json_result<T: serde::Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(
        serde_json::to_string_pretty(value).unwrap_or_default(),
    )]))
}
