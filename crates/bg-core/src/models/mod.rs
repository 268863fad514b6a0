pub mod config;
pub mod record;
pub mod report;
pub mod slot;

pub use config::{DeployConfig, ProbeKind, ProxyConfig, ReadinessConfig, RuntimeConfig, SlotPair};
pub use record::{DeploymentEvent, DeploymentOutcome, DeploymentRecord};
pub use report::{DeployMode, DeployReport, Detection, DetectionSource, StatusReport};
pub use slot::{SlotColor, SlotSpec};
