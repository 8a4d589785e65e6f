use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_ANALYSIS_TIMEOUT: Duration = Duration::from_secs(300);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Tunables for the analysis sandbox.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Container engine binary, invoked through `PATH`.
    pub docker_bin: String,
    /// Dockerfile template packaged into every build context.
    pub dockerfile_template: PathBuf,
    /// Entrypoint script template packaged into every build context.
    pub run_script_template: PathBuf,
    /// Deadline for background indexing inside the container.
    pub analysis_timeout: Duration,
    /// Sleep between polls of the container's cumulative output.
    pub poll_interval: Duration,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        let templates = default_template_dir();
        Self {
            docker_bin: "docker".to_string(),
            dockerfile_template: templates.join("Dockerfile.seagoat"),
            run_script_template: templates.join("run.seagoat.sh"),
            analysis_timeout: DEFAULT_ANALYSIS_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl SandboxConfig {
    /// Defaults with `REPO_READ_*` environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(bin) = env::var("REPO_READ_DOCKER_BIN") {
            if !bin.trim().is_empty() {
                config.docker_bin = bin;
            }
        }
        if let Some(dir) = env::var_os("REPO_READ_TEMPLATE_DIR") {
            let dir = PathBuf::from(dir);
            config.dockerfile_template = dir.join("Dockerfile.seagoat");
            config.run_script_template = dir.join("run.seagoat.sh");
        }
        if let Some(secs) = env_u64("REPO_READ_ANALYSIS_TIMEOUT_SECS") {
            config.analysis_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = env_u64("REPO_READ_POLL_INTERVAL_MS") {
            config.poll_interval = Duration::from_millis(ms);
        }
        config
    }
}

fn env_u64(key: &str) -> Option<u64> {
    env::var(key).ok()?.trim().parse().ok()
}

fn default_template_dir() -> PathBuf {
    // Development and test runs resolve the templates shipped with this
    // crate; installed layouts point REPO_READ_TEMPLATE_DIR elsewhere.
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("templates")
}
