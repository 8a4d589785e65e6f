//! Read-only file and directory access scoped to a repository root.
//!
//! All tool-facing operations take paths relative to the root, reject
//! anything that would escape it, and report per-item failures in-band so
//! callers always receive a complete envelope.

mod error;
mod paths;
mod repository;

pub use error::{RepositoryError, Result};
pub use paths::safe_join;
pub use repository::{Repository, MAX_TREE_ENTRIES};
