use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{DeployError, Result};

/// The container backend the controller drives.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Names of all currently running containers.
    async fn running_containers(&self) -> Result<Vec<String>>;

    async fn start(&self, container: &str) -> Result<()>;

    async fn stop(&self, container: &str) -> Result<()>;
}

/// Drives a docker-compatible CLI (`docker`, `podman`, `nerdctl`, ...).
pub struct CliRuntime {
    command: Vec<String>,
}

impl CliRuntime {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }

    async fn run(&self, args: &[&str]) -> Result<String> {
        let (program, prefix) = self
            .command
            .split_first()
            .ok_or_else(|| DeployError::Runtime("empty runtime command".into()))?;

        let mut cmd = Command::new(program);
        cmd.args(prefix).args(args);
        let output = cmd
            .output()
            .await
            .map_err(|e| DeployError::Runtime(format!("failed to run {program}: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DeployError::Runtime(format!(
                "{program} {} failed (exit {}): {}",
                args.join(" "),
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl ContainerRuntime for CliRuntime {
    async fn running_containers(&self) -> Result<Vec<String>> {
        let output = self.run(&["ps", "--format", "{{.Names}}"]).await?;
        Ok(parse_names(&output))
    }

    async fn start(&self, container: &str) -> Result<()> {
        tracing::debug!(container, "starting container");
        self.run(&["start", container]).await?;
        Ok(())
    }

    async fn stop(&self, container: &str) -> Result<()> {
        tracing::debug!(container, "stopping container");
        self.run(&["stop", container]).await?;
        Ok(())
    }
}

fn parse_names(output: &str) -> Vec<String> {
    output
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .map(|l| l.to_string())
        .collect()
}
