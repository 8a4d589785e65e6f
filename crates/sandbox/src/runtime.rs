use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::{Result, SandboxError};

/// Exit status and captured output of a one-shot command inside a container.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    /// Stderr if present, stdout otherwise: the stream worth reporting when
    /// a command fails.
    pub fn diagnostics(&self) -> &str {
        if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        }
    }
}

/// Seam between the orchestrator and the container engine.
///
/// Analysis progress is only observable as unstructured text on the
/// container's output stream, so the orchestrator polls `container_logs`.
/// An engine with a structured status channel can replace that protocol
/// behind this trait without touching callers.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Whether an image with this tag already exists in the durable store.
    async fn image_exists(&self, tag: &str) -> Result<bool>;

    /// Build an image from the given context bytes. A failed build surfaces
    /// as [`SandboxError::BuildFailure`] carrying the build diagnostics and
    /// must not leave a partial image behind.
    async fn build_image(&self, tag: &str, context: &[u8]) -> Result<()>;

    /// Launch a detached container from the image; returns the container id.
    async fn start_container(&self, tag: &str) -> Result<String>;

    /// Whether the container's run state is still "active". A container the
    /// engine no longer knows about counts as not running.
    async fn container_running(&self, container_id: &str) -> Result<bool>;

    /// The container's entire cumulative output so far.
    async fn container_logs(&self, container_id: &str) -> Result<String>;

    /// Run a one-shot command inside the container and wait for it.
    async fn exec(&self, container_id: &str, argv: &[String]) -> Result<ExecOutput>;

    /// Stop the container; "already gone" is success.
    async fn stop_container(&self, container_id: &str) -> Result<()>;

    /// Remove the container; "already gone" is success. Never removes the
    /// image the container was created from.
    async fn remove_container(&self, container_id: &str) -> Result<()>;

    /// Best-effort synchronous reclaim, callable from `Drop`.
    fn reclaim_blocking(&self, container_id: &str);
}

/// [`ContainerRuntime`] backed by the docker CLI.
#[derive(Debug, Clone)]
pub struct DockerCli {
    bin: String,
}

impl DockerCli {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }

    async fn docker(&self, args: &[&str]) -> Result<std::process::Output> {
        Command::new(&self.bin)
            .args(args)
            .output()
            .await
            .map_err(|err| SandboxError::Runtime(format!("failed to invoke {}: {err}", self.bin)))
    }

    fn command_failed(&self, args: &[&str], output: &std::process::Output) -> SandboxError {
        SandboxError::Runtime(format!(
            "{} {} failed (exit {:?}): {}",
            self.bin,
            args.join(" "),
            output.status.code(),
            String::from_utf8_lossy(&output.stderr).trim()
        ))
    }
}

fn is_not_found(stderr: &str) -> bool {
    let lowered = stderr.to_ascii_lowercase();
    lowered.contains("no such container") || lowered.contains("not found")
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn image_exists(&self, tag: &str) -> Result<bool> {
        let output = self.docker(&["image", "inspect", tag]).await?;
        Ok(output.status.success())
    }

    async fn build_image(&self, tag: &str, context: &[u8]) -> Result<()> {
        // `-` reads the build context from stdin, exactly the bytes the tag
        // was derived from.
        let args = ["build", "--quiet", "--tag", tag, "-"];
        let mut child = Command::new(&self.bin)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| {
                SandboxError::Runtime(format!("failed to invoke {}: {err}", self.bin))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| SandboxError::Runtime("build stdin was not piped".to_string()))?;
        stdin.write_all(context).await?;
        drop(stdin);

        let output = child
            .wait_with_output()
            .await
            .map_err(|err| SandboxError::Runtime(format!("waiting for image build: {err}")))?;
        if !output.status.success() {
            let mut log = String::from_utf8_lossy(&output.stdout).into_owned();
            if !output.stderr.is_empty() {
                log.push_str(&String::from_utf8_lossy(&output.stderr));
            }
            return Err(SandboxError::BuildFailure { log });
        }
        Ok(())
    }

    async fn start_container(&self, tag: &str) -> Result<String> {
        let args = ["run", "--detach", tag];
        let output = self.docker(&args).await?;
        if !output.status.success() {
            return Err(self.command_failed(&args, &output));
        }
        let container_id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if container_id.is_empty() {
            return Err(SandboxError::Runtime(
                "container engine did not report a container id".to_string(),
            ));
        }
        Ok(container_id)
    }

    async fn container_running(&self, container_id: &str) -> Result<bool> {
        let args = [
            "container",
            "inspect",
            "--format",
            "{{.State.Running}}",
            container_id,
        ];
        let output = self.docker(&args).await?;
        if !output.status.success() {
            // Unknown to the engine means not running.
            return Ok(false);
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim() == "true")
    }

    async fn container_logs(&self, container_id: &str) -> Result<String> {
        let args = ["logs", container_id];
        let output = self.docker(&args).await?;
        if !output.status.success() {
            return Err(self.command_failed(&args, &output));
        }
        // The CLI demultiplexes the container's stdout and stderr; the
        // completion marker may land on either.
        let mut logs = String::from_utf8_lossy(&output.stdout).into_owned();
        logs.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(logs)
    }

    async fn exec(&self, container_id: &str, argv: &[String]) -> Result<ExecOutput> {
        let mut args = vec!["exec".to_string(), container_id.to_string()];
        args.extend(argv.iter().cloned());
        let output = Command::new(&self.bin)
            .args(&args)
            .output()
            .await
            .map_err(|err| SandboxError::Runtime(format!("failed to invoke {}: {err}", self.bin)))?;
        Ok(ExecOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn stop_container(&self, container_id: &str) -> Result<()> {
        let args = ["stop", container_id];
        let output = self.docker(&args).await?;
        if !output.status.success() && !is_not_found(&String::from_utf8_lossy(&output.stderr)) {
            return Err(self.command_failed(&args, &output));
        }
        Ok(())
    }

    async fn remove_container(&self, container_id: &str) -> Result<()> {
        let args = ["rm", container_id];
        let output = self.docker(&args).await?;
        if !output.status.success() && !is_not_found(&String::from_utf8_lossy(&output.stderr)) {
            return Err(self.command_failed(&args, &output));
        }
        Ok(())
    }

    fn reclaim_blocking(&self, container_id: &str) {
        let result = std::process::Command::new(&self.bin)
            .args(["rm", "--force", container_id])
            .output();
        if let Err(err) = result {
            log::debug!("best-effort container reclaim failed: {err}");
        }
    }
}
