// Each test binary compiles this module independently and uses a different
// subset of helpers, so unused-function warnings are expected.
#![allow(dead_code)]

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use bg_core::error::{DeployError, Result};
use bg_core::models::{
    DeployConfig, ProbeKind, ProxyConfig, ReadinessConfig, RuntimeConfig, SlotColor, SlotPair,
    SlotSpec,
};
use bg_core::services::deployer::Deployer;
use bg_core::services::readiness::{ProbeResult, ReadinessProbe};
use bg_core::services::routing::ProxyReloader;
use bg_core::services::runtime::ContainerRuntime;

pub const BLUE: &str = "app-blue";
pub const GREEN: &str = "app-green";
pub const BLUE_ADDR: &str = "127.0.0.1:8001";
pub const GREEN_ADDR: &str = "127.0.0.1:8002";

/// In-memory container runtime with failure injection.
#[derive(Default)]
pub struct FakeRuntime {
    running: Mutex<HashSet<String>>,
    fail_start: Mutex<HashSet<String>>,
    fail_stop: Mutex<HashSet<String>>,
    fail_listing: AtomicBool,
    calls: Mutex<Vec<String>>,
}

impl FakeRuntime {
    pub fn with_running(names: &[&str]) -> Arc<Self> {
        let runtime = Self::default();
        runtime
            .running
            .lock()
            .unwrap()
            .extend(names.iter().map(|n| n.to_string()));
        Arc::new(runtime)
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.running.lock().unwrap().contains(name)
    }

    pub fn fail_start_of(&self, name: &str) {
        self.fail_start.lock().unwrap().insert(name.to_string());
    }

    pub fn fail_stop_of(&self, name: &str) {
        self.fail_stop.lock().unwrap().insert(name.to_string());
    }

    pub fn fail_listing(&self) {
        self.fail_listing.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn running_containers(&self) -> Result<Vec<String>> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(DeployError::Runtime("daemon unreachable".into()));
        }
        let mut names: Vec<String> = self.running.lock().unwrap().iter().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn start(&self, container: &str) -> Result<()> {
        self.calls.lock().unwrap().push(format!("start {container}"));
        if self.fail_start.lock().unwrap().contains(container) {
            return Err(DeployError::Runtime(format!("no such image for {container}")));
        }
        self.running.lock().unwrap().insert(container.to_string());
        Ok(())
    }

    async fn stop(&self, container: &str) -> Result<()> {
        self.calls.lock().unwrap().push(format!("stop {container}"));
        if self.fail_stop.lock().unwrap().contains(container) {
            return Err(DeployError::Runtime(format!("cannot stop {container}")));
        }
        self.running.lock().unwrap().remove(container);
        Ok(())
    }
}

/// Ready only for the addresses it has been told about.
#[derive(Default)]
pub struct ScriptedProbe {
    ready: Mutex<HashSet<String>>,
}

impl ScriptedProbe {
    pub fn ready_for(addresses: &[&str]) -> Arc<Self> {
        let probe = Self::default();
        probe
            .ready
            .lock()
            .unwrap()
            .extend(addresses.iter().map(|a| a.to_string()));
        Arc::new(probe)
    }
}

#[async_trait]
impl ReadinessProbe for ScriptedProbe {
    async fn probe(&self, _color: SlotColor, spec: &SlotSpec) -> ProbeResult {
        if self.ready.lock().unwrap().contains(&spec.address()) {
            ProbeResult::Ready
        } else {
            ProbeResult::Failed
        }
    }
}

#[derive(Default)]
pub struct RecordingReloader {
    fail: AtomicBool,
    reloads: AtomicU32,
}

impl RecordingReloader {
    pub fn failing() -> Arc<Self> {
        let reloader = Self::default();
        reloader.fail.store(true, Ordering::SeqCst);
        Arc::new(reloader)
    }

    pub fn reloads(&self) -> u32 {
        self.reloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProxyReloader for RecordingReloader {
    async fn reload(&self) -> Result<()> {
        self.reloads.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(DeployError::Switch("nginx: [emerg] invalid config".into()));
        }
        Ok(())
    }
}

pub fn upstream_conf(address: &str) -> String {
    format!("upstream backend {{\n    server {address};\n}}\n")
}

/// Config rooted in `dir`, with an upstream file pointing at `routed_to` when given.
pub fn make_config(dir: &Path, routed_to: Option<&str>) -> DeployConfig {
    let proxy = routed_to.map(|address| {
        let config_path = dir.join("upstream.conf");
        std::fs::write(&config_path, upstream_conf(address)).unwrap();
        ProxyConfig {
            config_path,
            reload_command: vec!["nginx".into(), "-s".into(), "reload".into()],
        }
    });
    DeployConfig {
        runtime: RuntimeConfig::default(),
        slots: SlotPair {
            blue: SlotSpec::new(BLUE, 8001),
            green: SlotSpec::new(GREEN, 8002),
        },
        readiness: ReadinessConfig {
            kind: ProbeKind::Http,
            path: "/".into(),
            timeout_secs: 1,
            interval_ms: 10,
            probe_timeout_ms: 100,
        },
        proxy,
        state_dir: dir.join("state"),
    }
}

pub fn make_deployer(
    config: DeployConfig,
    runtime: Arc<FakeRuntime>,
    probe: Arc<ScriptedProbe>,
    reloader: Arc<RecordingReloader>,
) -> Deployer {
    Deployer::new(config, runtime, probe, reloader)
}

pub fn read_upstream(dir: &Path) -> String {
    std::fs::read_to_string(dir.join("upstream.conf")).unwrap()
}
