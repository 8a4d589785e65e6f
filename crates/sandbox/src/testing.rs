//! In-memory [`ContainerRuntime`] for exercising the orchestrator's
//! lifecycle without a container engine.
//!
//! The fake models the engine's durable image store (images survive across
//! orchestrators sharing one fake) and replays a scripted sequence of
//! cumulative log snapshots, one per poll.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{Result, SandboxError};
use crate::runtime::{ContainerRuntime, ExecOutput};

#[derive(Debug)]
struct FakeState {
    images: Vec<String>,
    built: Vec<String>,
    fail_build: bool,
    started: Vec<String>,
    running: bool,
    log_script: Vec<String>,
    polls: usize,
    execs: Vec<Vec<String>>,
    exec_result: ExecOutput,
    stopped: Vec<String>,
    removed: Vec<String>,
    reclaimed: Vec<String>,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            images: Vec::new(),
            built: Vec::new(),
            fail_build: false,
            started: Vec::new(),
            running: true,
            log_script: Vec::new(),
            polls: 0,
            execs: Vec::new(),
            exec_result: ExecOutput {
                exit_code: 0,
                stdout: String::new(),
                stderr: String::new(),
            },
            stopped: Vec::new(),
            removed: Vec::new(),
            reclaimed: Vec::new(),
        }
    }
}

/// Cloning shares the underlying state, so a test can keep one handle for
/// assertions while the orchestrator owns another.
#[derive(Debug, Clone, Default)]
pub struct FakeRuntime {
    state: Arc<Mutex<FakeState>>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Successive cumulative log snapshots, one per poll; the final snapshot
    /// repeats once the script is exhausted.
    pub fn with_log_script<S: Into<String>>(self, snapshots: Vec<S>) -> Self {
        self.state.lock().unwrap().log_script =
            snapshots.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_running(self, running: bool) -> Self {
        self.state.lock().unwrap().running = running;
        self
    }

    pub fn with_failing_build(self) -> Self {
        self.state.lock().unwrap().fail_build = true;
        self
    }

    pub fn with_exec_result(self, exit_code: i32, stdout: &str, stderr: &str) -> Self {
        self.state.lock().unwrap().exec_result = ExecOutput {
            exit_code,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        };
        self
    }

    pub fn preload_image(&self, tag: &str) {
        self.state.lock().unwrap().images.push(tag.to_string());
    }

    pub fn built_tags(&self) -> Vec<String> {
        self.state.lock().unwrap().built.clone()
    }

    pub fn started_tags(&self) -> Vec<String> {
        self.state.lock().unwrap().started.clone()
    }

    pub fn exec_calls(&self) -> Vec<Vec<String>> {
        self.state.lock().unwrap().execs.clone()
    }

    pub fn stopped_containers(&self) -> Vec<String> {
        self.state.lock().unwrap().stopped.clone()
    }

    pub fn removed_containers(&self) -> Vec<String> {
        self.state.lock().unwrap().removed.clone()
    }

    pub fn reclaimed_containers(&self) -> Vec<String> {
        self.state.lock().unwrap().reclaimed.clone()
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn image_exists(&self, tag: &str) -> Result<bool> {
        Ok(self.state.lock().unwrap().images.iter().any(|t| t == tag))
    }

    async fn build_image(&self, tag: &str, _context: &[u8]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_build {
            return Err(SandboxError::BuildFailure {
                log: "scripted build failure".to_string(),
            });
        }
        state.built.push(tag.to_string());
        state.images.push(tag.to_string());
        Ok(())
    }

    async fn start_container(&self, tag: &str) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.started.push(tag.to_string());
        Ok(format!("fake-container-{}", state.started.len()))
    }

    async fn container_running(&self, _container_id: &str) -> Result<bool> {
        Ok(self.state.lock().unwrap().running)
    }

    async fn container_logs(&self, _container_id: &str) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        let snapshot = match state.log_script.get(state.polls) {
            Some(snapshot) => snapshot.clone(),
            None => state.log_script.last().cloned().unwrap_or_default(),
        };
        state.polls += 1;
        Ok(snapshot)
    }

    async fn exec(&self, _container_id: &str, argv: &[String]) -> Result<ExecOutput> {
        let mut state = self.state.lock().unwrap();
        state.execs.push(argv.to_vec());
        Ok(state.exec_result.clone())
    }

    async fn stop_container(&self, container_id: &str) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .stopped
            .push(container_id.to_string());
        Ok(())
    }

    async fn remove_container(&self, container_id: &str) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .removed
            .push(container_id.to_string());
        Ok(())
    }

    fn reclaim_blocking(&self, container_id: &str) {
        self.state
            .lock()
            .unwrap()
            .reclaimed
            .push(container_id.to_string());
    }
}
