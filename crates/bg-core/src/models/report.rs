use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record::DeploymentRecord;
use super::slot::SlotColor;

/// Whether a run touches the reverse-proxy config.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum DeployMode {
    Swap,
    SwapWithProxy,
}

impl fmt::Display for DeployMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Swap => f.write_str("swap"),
            Self::SwapWithProxy => f.write_str("swap+proxy"),
        }
    }
}

/// What decided the active slot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum DetectionSource {
    Runtime,
    StateRecord,
    RoutingConfig,
    Default,
}

impl fmt::Display for DetectionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Runtime => "runtime",
            Self::StateRecord => "state record",
            Self::RoutingConfig => "routing config",
            Self::Default => "default",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub active: SlotColor,
    pub source: DetectionSource,
    pub blue_running: bool,
    pub green_running: bool,
}

impl Detection {
    pub fn is_running(&self, color: SlotColor) -> bool {
        match color {
            SlotColor::Blue => self.blue_running,
            SlotColor::Green => self.green_running,
        }
    }
}

/// Outcome of a successful deployment run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployReport {
    pub previous: SlotColor,
    pub target: SlotColor,
    pub mode: DeployMode,
    pub detected_by: DetectionSource,
    pub switched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retire_warning: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Read-only view for `status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub detection: Detection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routing_target: Option<SlotColor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<DeploymentRecord>,
}
