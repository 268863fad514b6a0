use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use super::slot::{SlotColor, SlotSpec};

#[derive(Debug, Clone, Deserialize)]
pub struct DeployConfig {
    #[serde(default)]
    pub runtime: RuntimeConfig,
    pub slots: SlotPair,
    #[serde(default)]
    pub readiness: ReadinessConfig,
    #[serde(default)]
    pub proxy: Option<ProxyConfig>,
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
}

impl DeployConfig {
    pub fn slot(&self, color: SlotColor) -> &SlotSpec {
        self.slots.get(color)
    }
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(".bluegreen")
}

#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeConfig {
    /// Argv prefix; `ps`, `start` and `stop` arguments are appended.
    pub command: Vec<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            command: vec!["docker".to_string()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlotPair {
    pub blue: SlotSpec,
    pub green: SlotSpec,
}

impl SlotPair {
    pub fn get(&self, color: SlotColor) -> &SlotSpec {
        match color {
            SlotColor::Blue => &self.blue,
            SlotColor::Green => &self.green,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    Http,
    Tcp,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    pub kind: ProbeKind,
    pub path: String,
    pub timeout_secs: u64,
    pub interval_ms: u64,
    pub probe_timeout_ms: u64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            kind: ProbeKind::Http,
            path: "/".to_string(),
            timeout_secs: 30,
            interval_ms: 500,
            probe_timeout_ms: 2000,
        }
    }
}

impl ReadinessConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    pub config_path: PathBuf,
    pub reload_command: Vec<String>,
}
