use std::path::PathBuf;
use std::time::Duration;

use crate::models::SlotColor;

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("active slot detection failed: {0}")]
    Detection(String),

    #[error("failed to launch {slot} slot: {message}")]
    Launch { slot: SlotColor, message: String },

    #[error("{slot} slot not ready after {}s", .waited.as_secs())]
    ReadinessTimeout { slot: SlotColor, waited: Duration },

    #[error("traffic switch failed: {0}")]
    Switch(String),

    #[error("another deployment is in progress (pid {pid})")]
    Locked { pid: u32 },

    #[error("config file not found at {0}")]
    ConfigNotFound(PathBuf),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("state persistence failed: {0}")]
    State(String),

    #[error("container runtime failed: {0}")]
    Runtime(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl DeployError {
    /// Whether the error was raised before routing could have been touched.
    pub fn aborted_before_switch(&self) -> bool {
        matches!(
            self,
            Self::Detection(_)
                | Self::Launch { .. }
                | Self::ReadinessTimeout { .. }
                | Self::Locked { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, DeployError>;
