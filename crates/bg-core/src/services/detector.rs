use crate::error::{DeployError, Result};
use crate::models::{Detection, DetectionSource, SlotColor, SlotPair};

use super::runtime::ContainerRuntime;

/// Assumed active slot when nothing else decides; blue gets launched.
pub const DEFAULT_ACTIVE: SlotColor = SlotColor::Green;

/// Work out which slot currently serves traffic.
///
/// The runtime listing decides when exactly one slot is running. When both
/// run, the persisted record and then the routing config break the tie. A
/// failed listing is an error, never a silent default.
pub async fn detect(
    runtime: &dyn ContainerRuntime,
    slots: &SlotPair,
    recorded_active: Option<SlotColor>,
    routing_target: Option<SlotColor>,
) -> Result<Detection> {
    let running = runtime
        .running_containers()
        .await
        .map_err(|e| DeployError::Detection(e.to_string()))?;

    let blue_running = running.iter().any(|n| n == &slots.blue.container);
    let green_running = running.iter().any(|n| n == &slots.green.container);

    let (active, source) = decide(blue_running, green_running, recorded_active, routing_target);
    tracing::debug!(
        blue_running,
        green_running,
        active = %active,
        source = %source,
        "detected active slot"
    );

    Ok(Detection {
        active,
        source,
        blue_running,
        green_running,
    })
}

fn decide(
    blue_running: bool,
    green_running: bool,
    recorded_active: Option<SlotColor>,
    routing_target: Option<SlotColor>,
) -> (SlotColor, DetectionSource) {
    match (blue_running, green_running) {
        (true, false) => (SlotColor::Blue, DetectionSource::Runtime),
        (false, true) => (SlotColor::Green, DetectionSource::Runtime),
        (true, true) => {
            if let Some(active) = recorded_active {
                (active, DetectionSource::StateRecord)
            } else if let Some(active) = routing_target {
                (active, DetectionSource::RoutingConfig)
            } else {
                (DEFAULT_ACTIVE, DetectionSource::Default)
            }
        }
        (false, false) => (DEFAULT_ACTIVE, DetectionSource::Default),
    }
}
