use std::path::{Path, PathBuf};
use std::time::Instant;

use repo_read_protocol::SearchHit;

use crate::config::SandboxConfig;
use crate::context::BuildContext;
use crate::error::{Result, SandboxError};
use crate::parser::parse_hits;
use crate::runtime::{ContainerRuntime, DockerCli};

/// Marker SeaGoat prints once background indexing has finished.
///
/// Completion is only observable as unstructured text on the container's
/// output stream, so this literal is searched for in the cumulative logs.
/// A repository whose own output happens to print it would flip analysis to
/// "complete" early; accepted limitation of the text protocol.
pub const ANALYSIS_COMPLETE_MARKER: &str = "Analyzed all chunks!";

/// Query command executed inside the analysis container.
const SEAGOAT_COMMAND: &str = "seagoat";

/// Lifecycle of one analysis sandbox.
///
/// `Analyzed` is a one-way transition: once reached it never regresses, and
/// only `cleanup` moves the sandbox on to `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SandboxState {
    Unprepared,
    ImageReady,
    Running,
    Analyzed,
    Failed,
    Stopped,
}

/// Orchestrator for one SeaGoat analysis container.
///
/// Owns at most one container for its whole lifetime: `prepare` resolves or
/// builds the content-addressed image, `run` launches the container and
/// blocks until indexing completes, `search` executes queries against it and
/// `cleanup` tears it down. The cached image is never removed, so later
/// orchestrators over the same repository content skip the build entirely.
pub struct Seagoat {
    repo_path: PathBuf,
    config: SandboxConfig,
    runtime: Box<dyn ContainerRuntime>,
    image_tag: Option<String>,
    container_id: Option<String>,
    state: SandboxState,
}

impl Seagoat {
    /// Orchestrator backed by the docker CLI from `config`.
    pub fn new(repo_path: impl Into<PathBuf>, config: SandboxConfig) -> Self {
        let runtime = Box::new(DockerCli::new(config.docker_bin.clone()));
        Self::with_runtime(repo_path, config, runtime)
    }

    /// Orchestrator over an explicit runtime; tests use the in-memory fake.
    pub fn with_runtime(
        repo_path: impl Into<PathBuf>,
        config: SandboxConfig,
        runtime: Box<dyn ContainerRuntime>,
    ) -> Self {
        Self {
            repo_path: repo_path.into(),
            config,
            runtime,
            image_tag: None,
            container_id: None,
            state: SandboxState::Unprepared,
        }
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    pub fn state(&self) -> SandboxState {
        self.state
    }

    /// Tag of the resolved image, once `prepare` has run.
    pub fn image_tag(&self) -> Option<&str> {
        self.image_tag.as_deref()
    }

    /// Id of the running container, between `run` and `cleanup`.
    pub fn container_id(&self) -> Option<&str> {
        self.container_id.as_deref()
    }

    /// Package the repository and resolve or build the analysis image.
    ///
    /// Idempotent: once an image has been resolved, later calls return
    /// without re-packaging or rebuilding.
    pub async fn prepare(&mut self) -> Result<()> {
        if self.image_tag.is_some() {
            return Ok(());
        }

        let context = BuildContext::assemble(&self.repo_path, &self.config)?;
        let tag = context.image_tag().to_string();
        if self.runtime.image_exists(&tag).await? {
            log::info!("found existing analysis image {tag}");
        } else {
            log::info!("building analysis image {tag}");
            self.runtime.build_image(&tag, context.bytes()).await?;
        }

        self.image_tag = Some(tag);
        if self.state == SandboxState::Unprepared {
            self.state = SandboxState::ImageReady;
        }
        Ok(())
    }

    /// Launch the analysis container and block until indexing completes.
    ///
    /// Calls `prepare` first if it has not run yet. Returns once the
    /// completion marker appears in the container's output; fails with
    /// [`SandboxError::InstanceFailed`] if the container stops first, or
    /// [`SandboxError::Timeout`] if the deadline elapses; in the timeout case
    /// the container is deliberately left running for `cleanup` to reclaim.
    pub async fn run(&mut self) -> Result<()> {
        if self.state == SandboxState::Analyzed {
            return Ok(());
        }
        self.prepare().await?;
        let tag = self
            .image_tag
            .clone()
            .ok_or_else(|| SandboxError::Runtime("no image tag after prepare".to_string()))?;

        let container_id = self.runtime.start_container(&tag).await?;
        log::info!("started analysis container {container_id} from {tag}");
        self.container_id = Some(container_id);
        self.state = SandboxState::Running;

        self.wait_for_analysis().await
    }

    /// Poll the container's cumulative output until the completion marker
    /// appears, diffing against the previously seen length so each poll only
    /// processes the unseen suffix.
    async fn wait_for_analysis(&mut self) -> Result<()> {
        let container_id = self
            .container_id
            .clone()
            .ok_or_else(|| SandboxError::Runtime("no container to wait for".to_string()))?;

        log::info!("waiting for repository analysis to complete");
        let start = Instant::now();
        let mut seen_len = 0usize;

        while start.elapsed() < self.config.analysis_timeout {
            let running = self.runtime.container_running(&container_id).await?;
            let logs = self.runtime.container_logs(&container_id).await?;

            if logs.len() > seen_len {
                let unseen = logs.get(seen_len..).unwrap_or(logs.as_str());
                for line in unseen.lines().filter(|line| !line.trim().is_empty()) {
                    log::debug!("analysis: {line}");
                }
                seen_len = logs.len();
            }

            if logs.contains(ANALYSIS_COMPLETE_MARKER) {
                log::info!("analysis complete after {:.1?}", start.elapsed());
                self.state = SandboxState::Analyzed;
                return Ok(());
            }
            if !running {
                self.state = SandboxState::Failed;
                return Err(SandboxError::InstanceFailed { output: logs });
            }

            tokio::time::sleep(self.config.poll_interval).await;
        }

        Err(SandboxError::Timeout {
            elapsed: start.elapsed(),
        })
    }

    /// Run one semantic-search query inside the analyzed container.
    ///
    /// Fails with [`SandboxError::NotReady`] unless `run` has completed. A
    /// query that exits non-zero degrades to an empty hit list with the
    /// diagnostics logged, rather than surfacing an error: callers always
    /// receive a well-formed (possibly empty) result set.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        if self.state != SandboxState::Analyzed {
            return Err(SandboxError::NotReady);
        }
        let container_id = self.container_id.as_deref().ok_or(SandboxError::NotReady)?;

        let argv = vec![SEAGOAT_COMMAND.to_string(), query.to_string()];
        let output = self.runtime.exec(container_id, &argv).await?;
        if output.exit_code != 0 {
            log::warn!(
                "search query failed (exit {}): {}",
                output.exit_code,
                output.diagnostics().trim()
            );
            return Ok(Vec::new());
        }

        Ok(parse_hits(&output.stdout))
    }

    /// Stop and remove the container. Idempotent: once the container is gone
    /// (or was never started) this is a silent no-op. The cached image is
    /// kept so later runs over the same content hit the cache.
    pub async fn cleanup(&mut self) -> Result<()> {
        let Some(container_id) = self.container_id.clone() else {
            return Ok(());
        };

        log::info!("stopping analysis container {container_id}");
        self.runtime.stop_container(&container_id).await?;
        self.runtime.remove_container(&container_id).await?;
        self.container_id = None;
        self.state = SandboxState::Stopped;
        Ok(())
    }
}

impl Drop for Seagoat {
    fn drop(&mut self) {
        // Backstop for exits that skip the explicit cleanup path.
        if let Some(container_id) = self.container_id.take() {
            log::debug!("reclaiming analysis container {container_id} on drop");
            self.runtime.reclaim_blocking(&container_id);
        }
    }
}
