use std::path::PathBuf;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::{Captures, Regex};
use tokio::process::Command;

use crate::error::{DeployError, Result};
use crate::models::{SlotColor, SlotPair};

use super::files;

/// `host:port` tokens, e.g. in `server 127.0.0.1:8001;` or
/// `proxy_pass http://app-blue:8000;`.
static ADDRESS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9_][A-Za-z0-9_.\-]*:\d{1,5}").unwrap());

/// Applies a rewritten routing config to the running proxy.
#[async_trait]
pub trait ProxyReloader: Send + Sync {
    async fn reload(&self) -> Result<()>;
}

/// Reloads by running a command such as `nginx -s reload`.
pub struct CommandReloader {
    command: Vec<String>,
}

impl CommandReloader {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

#[async_trait]
impl ProxyReloader for CommandReloader {
    async fn reload(&self) -> Result<()> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| DeployError::Switch("empty reload command".into()))?;
        let output = Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|e| DeployError::Switch(format!("failed to run {program}: {e}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DeployError::Switch(format!(
                "reload command failed (exit {}): {}",
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }
        Ok(())
    }
}

fn references(content: &str, address: &str) -> usize {
    ADDRESS_RE
        .find_iter(content)
        .filter(|m| m.as_str() == address)
        .count()
}

/// The slot the config points at, if exactly one slot is referenced.
pub fn referenced_slot(content: &str, slots: &SlotPair) -> Option<SlotColor> {
    let blue = references(content, &slots.blue.address()) > 0;
    let green = references(content, &slots.green.address()) > 0;
    match (blue, green) {
        (true, false) => Some(SlotColor::Blue),
        (false, true) => Some(SlotColor::Green),
        _ => None,
    }
}

/// Point the config at `target`. Returns `None` when it already does.
pub fn rewrite(content: &str, slots: &SlotPair, target: SlotColor) -> Result<Option<String>> {
    let from = slots.get(target.other()).address();
    let to = slots.get(target).address();

    let from_refs = references(content, &from);
    let to_refs = references(content, &to);
    match (from_refs, to_refs) {
        (0, 0) => Err(DeployError::Switch(format!(
            "routing config references neither {from} nor {to}"
        ))),
        (0, _) => Ok(None),
        (_, 0) => {
            let rewritten = ADDRESS_RE.replace_all(content, |caps: &Captures| {
                if caps[0] == from {
                    to.clone()
                } else {
                    caps[0].to_string()
                }
            });
            Ok(Some(rewritten.into_owned()))
        }
        _ => Err(DeployError::Switch(format!(
            "routing config references both {from} and {to}"
        ))),
    }
}

/// Rewrites the routing config and reloads the proxy, restoring the previous
/// file if the reload fails.
pub struct TrafficSwitch {
    config_path: PathBuf,
    reloader: Arc<dyn ProxyReloader>,
}

impl TrafficSwitch {
    pub fn new(config_path: PathBuf, reloader: Arc<dyn ProxyReloader>) -> Self {
        Self {
            config_path,
            reloader,
        }
    }

    async fn read(&self) -> Result<String> {
        tokio::fs::read_to_string(&self.config_path).await.map_err(|e| {
            DeployError::Switch(format!(
                "failed to read {}: {e}",
                self.config_path.display()
            ))
        })
    }

    /// Which slot the routing config currently references.
    pub async fn current_target(&self, slots: &SlotPair) -> Result<Option<SlotColor>> {
        let content = self.read().await?;
        Ok(referenced_slot(&content, slots))
    }

    pub async fn switch(&self, slots: &SlotPair, target: SlotColor) -> Result<()> {
        let original = self.read().await?;
        let rewritten = rewrite(&original, slots, target)?;

        if let Some(contents) = &rewritten {
            files::write_atomic(&self.config_path, contents.as_bytes())
                .await
                .map_err(|e| {
                    DeployError::Switch(format!(
                        "failed to write {}: {e}",
                        self.config_path.display()
                    ))
                })?;
            tracing::info!(
                slot = %target,
                address = %slots.get(target).address(),
                path = %self.config_path.display(),
                "routing config rewritten"
            );
        } else {
            tracing::info!(slot = %target, "routing config already points at target");
        }

        if let Err(reload_err) = self.reloader.reload().await {
            if rewritten.is_some() {
                tracing::warn!(error = %reload_err, "proxy reload failed, restoring routing config");
                if let Err(restore_err) =
                    files::write_atomic(&self.config_path, original.as_bytes()).await
                {
                    return Err(DeployError::Switch(format!(
                        "{reload_err}; restoring {} also failed: {restore_err}",
                        self.config_path.display()
                    )));
                }
            }
            return Err(reload_err);
        }
        Ok(())
    }
}
