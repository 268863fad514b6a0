use std::sync::Arc;

use chrono::Utc;

use crate::error::{DeployError, Result};
use crate::models::{
    DeployConfig, DeployMode, DeployReport, DeploymentEvent, DeploymentOutcome, DeploymentRecord,
    SlotColor, StatusReport,
};

use super::lock::DeployLock;
use super::readiness::{self, ReadinessProbe};
use super::routing::{CommandReloader, ProxyReloader, TrafficSwitch};
use super::runtime::{CliRuntime, ContainerRuntime};
use super::state::DeploymentStateStore;
use super::{detector, launcher, retirer};

/// Runs blue/green deployments for one pair of slots.
pub struct Deployer {
    config: DeployConfig,
    runtime: Arc<dyn ContainerRuntime>,
    probe: Arc<dyn ReadinessProbe>,
    switch: Option<TrafficSwitch>,
    state_store: DeploymentStateStore,
}

impl Deployer {
    pub fn new(
        config: DeployConfig,
        runtime: Arc<dyn ContainerRuntime>,
        probe: Arc<dyn ReadinessProbe>,
        reloader: Arc<dyn ProxyReloader>,
    ) -> Self {
        let switch = config
            .proxy
            .as_ref()
            .map(|p| TrafficSwitch::new(p.config_path.clone(), reloader));
        let state_store = DeploymentStateStore::new(&config.state_dir);
        Self {
            config,
            runtime,
            probe,
            switch,
            state_store,
        }
    }

    /// Wire up the CLI runtime, configured probe and reload command.
    pub fn from_config(config: DeployConfig) -> Self {
        let runtime = Arc::new(CliRuntime::new(config.runtime.command.clone()));
        let probe: Arc<dyn ReadinessProbe> = Arc::from(readiness::probe_for(&config.readiness));
        let reload_command = config
            .proxy
            .as_ref()
            .map(|p| p.reload_command.clone())
            .unwrap_or_default();
        let reloader = Arc::new(CommandReloader::new(reload_command));
        Self::new(config, runtime, probe, reloader)
    }

    pub fn config(&self) -> &DeployConfig {
        &self.config
    }

    /// Proxy mode when a proxy is configured, plain swap otherwise.
    pub fn default_mode(&self) -> DeployMode {
        if self.switch.is_some() {
            DeployMode::SwapWithProxy
        } else {
            DeployMode::Swap
        }
    }

    /// Flip the live slot.
    pub async fn deploy(&self, mode: DeployMode) -> Result<DeployReport> {
        if mode == DeployMode::SwapWithProxy && self.switch.is_none() {
            return Err(DeployError::InvalidConfig(
                "proxy mode needs a proxy section in the config".into(),
            ));
        }

        let _lock = DeployLock::acquire(&self.config.state_dir).await?;
        let started_at = Utc::now();

        let mut record = self.load_record().await;
        let routing_target = self.routing_target().await;
        let detection = detector::detect(
            self.runtime.as_ref(),
            &self.config.slots,
            record.as_ref().and_then(|r| r.active),
            routing_target,
        )
        .await?;

        let previous = detection.active;
        let target = previous.other();
        tracing::info!(
            from = %previous,
            to = %target,
            %mode,
            detected_by = %detection.source,
            "starting deployment"
        );

        let launched = match launcher::launch(
            self.runtime.as_ref(),
            target,
            self.config.slot(target),
            detection.is_running(target),
        )
        .await
        {
            Ok(launched) => launched,
            Err(e) => {
                self.record_failure(&mut record, previous, target, mode, &e)
                    .await;
                return Err(e);
            }
        };

        if let Err(e) = self.gate_and_switch(target, mode).await {
            if launched {
                self.stop_unused(target).await;
            }
            self.record_failure(&mut record, previous, target, mode, &e)
                .await;
            return Err(e);
        }

        let retire_warning = retirer::retire(
            self.runtime.as_ref(),
            previous,
            self.config.slot(previous),
            detection.is_running(previous),
        )
        .await;

        let finished_at = Utc::now();
        let record = record.get_or_insert_with(DeploymentRecord::empty);
        record.push(DeploymentEvent {
            from: previous,
            to: target,
            mode,
            outcome: DeploymentOutcome::Succeeded,
            at: finished_at,
            message: retire_warning.clone(),
        });
        if let Err(e) = self.state_store.save(record).await {
            tracing::warn!(error = %e, "deployment succeeded but state was not saved");
        }

        tracing::info!(
            active = %target,
            elapsed_ms = (finished_at - started_at).num_milliseconds(),
            "deployment complete"
        );

        Ok(DeployReport {
            previous,
            target,
            mode,
            detected_by: detection.source,
            switched: mode == DeployMode::SwapWithProxy,
            retire_warning,
            started_at,
            finished_at,
        })
    }

    /// Detection, routing and record without changing anything.
    pub async fn status(&self) -> Result<StatusReport> {
        let record = self.load_record().await;
        let routing_target = self.routing_target().await;
        let detection = detector::detect(
            self.runtime.as_ref(),
            &self.config.slots,
            record.as_ref().and_then(|r| r.active),
            routing_target,
        )
        .await?;
        Ok(StatusReport {
            detection,
            routing_target,
            record,
        })
    }

    async fn gate_and_switch(&self, target: SlotColor, mode: DeployMode) -> Result<()> {
        let readiness = &self.config.readiness;
        readiness::wait_until_ready(
            self.probe.as_ref(),
            target,
            self.config.slot(target),
            readiness.timeout(),
            readiness.interval(),
        )
        .await?;

        if mode == DeployMode::SwapWithProxy {
            if let Some(switch) = &self.switch {
                switch.switch(&self.config.slots, target).await?;
            }
        }
        Ok(())
    }

    /// Best-effort stop of a slot that was launched but never took traffic.
    async fn stop_unused(&self, color: SlotColor) {
        let container = &self.config.slot(color).container;
        if let Err(e) = self.runtime.stop(container).await {
            tracing::warn!(slot = %color, container = %container, error = %e, "failed to stop unused slot");
        } else {
            tracing::info!(slot = %color, container = %container, "stopped unused slot");
        }
    }

    async fn load_record(&self) -> Option<DeploymentRecord> {
        match self.state_store.load().await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(error = %e, path = %self.state_store.path().display(), "ignoring unreadable state");
                None
            }
        }
    }

    async fn routing_target(&self) -> Option<SlotColor> {
        let switch = self.switch.as_ref()?;
        match switch.current_target(&self.config.slots).await {
            Ok(target) => target,
            Err(e) => {
                tracing::debug!(error = %e, "routing config unavailable for detection");
                None
            }
        }
    }

    async fn record_failure(
        &self,
        record: &mut Option<DeploymentRecord>,
        from: SlotColor,
        to: SlotColor,
        mode: DeployMode,
        error: &DeployError,
    ) {
        if error.aborted_before_switch() {
            tracing::error!(from = %from, to = %to, error = %error, "deployment aborted before routing changed");
        } else {
            tracing::error!(from = %from, to = %to, error = %error, "deployment failed");
        }
        let record = record.get_or_insert_with(DeploymentRecord::empty);
        record.push(DeploymentEvent {
            from,
            to,
            mode,
            outcome: DeploymentOutcome::Failed,
            at: Utc::now(),
            message: Some(error.to_string()),
        });
        if let Err(e) = self.state_store.save(record).await {
            tracing::warn!(error = %e, "failed to record deployment failure");
        }
    }
}
