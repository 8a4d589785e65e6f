//! Wire types shared by the repo-read tool surface.
//!
//! Every tool responds with a well-formed envelope even when individual
//! items fail: per-item failures are carried in-band as `error` fields
//! instead of failing the whole call.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A contiguous slice of one file, addressed by 1-based line numbers.
///
/// A failed read keeps the envelope shape: `start_line` and `end_line` are
/// zero, `content` is empty and `error` explains what went wrong.
#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema)]
pub struct FileChunk {
    pub file_path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema)]
pub struct ReadFilesOutput {
    pub files: Vec<FileChunk>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Non-recursive listing of a single directory.
#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema)]
pub struct DirEntries {
    pub dir_path: String,
    pub entries: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema)]
pub struct ReadDirsOutput {
    pub dirs: Vec<DirEntries>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Depth-limited directory walk. `tree` lists paths relative to the
/// repository root, starting with the requested directory itself.
#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema)]
pub struct DirTreeOutput {
    pub dir_path: String,
    pub tree: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One line-ranged code excerpt returned by a semantic search query.
///
/// `code` concatenates the physically contiguous output lines of the hit,
/// joined with a single `\n`; `end_line - start_line + 1` equals the number
/// of captured lines.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
pub struct SearchHit {
    pub file: String,
    pub start_line: usize,
    pub end_line: usize,
    pub code: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema)]
pub struct SearchResultsOutput {
    pub results: Vec<SearchHit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileChunk {
    /// Envelope for a read that failed before any content was produced.
    pub fn failed(file_path: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            start_line: 0,
            end_line: 0,
            content: String::new(),
            error: Some(error.into()),
        }
    }
}
