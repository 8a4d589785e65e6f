//! Read-only MCP server for inspecting a repository.
//!
//! Binds the repository collaborators (file and directory access) and the
//! sandboxed semantic-search orchestrator into one MCP tool surface.

pub mod tools;

pub use tools::RepoReadService;
