// Each test binary compiles this module independently and uses a different
// subset of helpers, so unused-function warnings are expected.
#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};

use bg_core::models::{
    DeployMode, DeploymentEvent, DeploymentOutcome, DeploymentRecord, Detection, DetectionSource,
    SlotColor, SlotPair, SlotSpec, StatusReport,
};

pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap()
}

pub fn make_slots() -> SlotPair {
    SlotPair {
        blue: SlotSpec::new("app-blue", 8001),
        green: SlotSpec::new("app-green", 8002),
    }
}

pub fn make_detection(active: SlotColor, source: DetectionSource, blue: bool, green: bool) -> Detection {
    Detection {
        active,
        source,
        blue_running: blue,
        green_running: green,
    }
}

/// A record whose only event moved traffic `from` -> `to`.
pub fn make_record(from: SlotColor, outcome: DeploymentOutcome, message: Option<&str>) -> DeploymentRecord {
    let mut record = DeploymentRecord::empty();
    record.push(DeploymentEvent {
        from,
        to: from.other(),
        mode: DeployMode::SwapWithProxy,
        outcome,
        at: fixed_time(),
        message: message.map(|m| m.to_string()),
    });
    record
}

pub fn make_status(
    detection: Detection,
    routing_target: Option<SlotColor>,
    record: Option<DeploymentRecord>,
) -> StatusReport {
    StatusReport {
        detection,
        routing_target,
        record,
    }
}
