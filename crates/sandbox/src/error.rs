use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SandboxError>;

#[derive(Error, Debug)]
pub enum SandboxError {
    /// A control-script template is missing from disk.
    #[error("control script template not found: {0}")]
    ResourceUnavailable(PathBuf),

    /// The image build step failed; `log` carries the build diagnostics.
    #[error("image build failed:\n{log}")]
    BuildFailure { log: String },

    /// A query was issued before analysis completed.
    #[error("analysis container is not ready; call run() before searching")]
    NotReady,

    /// The analysis container stopped before the completion marker appeared.
    #[error("analysis container stopped unexpectedly; last output:\n{output}")]
    InstanceFailed { output: String },

    /// The completion marker never appeared within the deadline. The
    /// container is left running for the cleanup hook to reclaim.
    #[error("timed out after {elapsed:?} waiting for repository analysis")]
    Timeout { elapsed: Duration },

    /// The container engine could not be driven (invocation or protocol
    /// failure, as opposed to a failed build or query).
    #[error("container runtime error: {0}")]
    Runtime(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
