use crate::models::{SlotColor, SlotSpec};

use super::runtime::ContainerRuntime;

/// Stop the previously live slot. Traffic has already moved, so a failure
/// is returned as a warning instead of an error.
pub async fn retire(
    runtime: &dyn ContainerRuntime,
    color: SlotColor,
    spec: &SlotSpec,
    running: bool,
) -> Option<String> {
    if !running {
        tracing::debug!(slot = %color, container = %spec.container, "previous slot not running");
        return None;
    }

    match runtime.stop(&spec.container).await {
        Ok(()) => {
            tracing::info!(slot = %color, container = %spec.container, "previous slot stopped");
            None
        }
        Err(e) => {
            let warning = format!("failed to stop {color} slot ({}): {e}", spec.container);
            tracing::warn!(slot = %color, container = %spec.container, error = %e, "retire failed");
            Some(warning)
        }
    }
}
