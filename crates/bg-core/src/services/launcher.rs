use crate::error::{DeployError, Result};
use crate::models::{SlotColor, SlotSpec};

use super::runtime::ContainerRuntime;

/// Start the target slot's container unless it is already running.
///
/// Returns `true` when a start command was issued.
pub async fn launch(
    runtime: &dyn ContainerRuntime,
    color: SlotColor,
    spec: &SlotSpec,
    already_running: bool,
) -> Result<bool> {
    if already_running {
        tracing::info!(slot = %color, container = %spec.container, "slot already running");
        return Ok(false);
    }

    tracing::info!(slot = %color, container = %spec.container, "launching slot");
    runtime
        .start(&spec.container)
        .await
        .map_err(|e| DeployError::Launch {
            slot: color,
            message: e.to_string(),
        })?;
    Ok(true)
}
