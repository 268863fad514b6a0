use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::report::DeployMode;
use super::slot::SlotColor;

/// Events kept in the record's history before the oldest are dropped.
pub const HISTORY_LIMIT: usize = 20;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum DeploymentOutcome {
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentEvent {
    pub from: SlotColor,
    pub to: SlotColor,
    pub mode: DeployMode,
    pub outcome: DeploymentOutcome,
    pub at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Last-known-good deployment, persisted between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<SlotColor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub history: Vec<DeploymentEvent>,
}

impl DeploymentRecord {
    pub fn empty() -> Self {
        Self {
            active: None,
            deployed_at: None,
            history: Vec::new(),
        }
    }

    /// Append an event; a successful one also moves `active`.
    pub fn push(&mut self, event: DeploymentEvent) {
        if event.outcome == DeploymentOutcome::Succeeded {
            self.active = Some(event.to);
            self.deployed_at = Some(event.at);
        }
        self.history.push(event);
        if self.history.len() > HISTORY_LIMIT {
            let excess = self.history.len() - HISTORY_LIMIT;
            self.history.drain(..excess);
        }
    }

    pub fn last_event(&self) -> Option<&DeploymentEvent> {
        self.history.last()
    }
}
