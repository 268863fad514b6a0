//! Readiness gate.
//!
//! Polls a probe against the freshly launched slot until it answers or the
//! overall timeout elapses.

use std::time::Duration;

use async_trait::async_trait;
use http_body_util::Empty;
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;
use tokio::time::Instant;
use tracing::debug;

use crate::error::{DeployError, Result};
use crate::models::{ProbeKind, ReadinessConfig, SlotColor, SlotSpec};

/// Result of a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeResult {
    /// The slot answered as expected.
    Ready,
    /// The slot answered, but not with success.
    NotReady,
    /// The probe could not reach the slot.
    Failed,
}

#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    async fn probe(&self, color: SlotColor, spec: &SlotSpec) -> ProbeResult;
}

/// GET `path` on the slot; any 2xx is ready.
pub struct HttpProbe {
    path: String,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            path: path.into(),
            timeout,
        }
    }
}

#[async_trait]
impl ReadinessProbe for HttpProbe {
    async fn probe(&self, color: SlotColor, spec: &SlotSpec) -> ProbeResult {
        http_probe(color, spec, &self.path, self.timeout).await
    }
}

/// A TCP connect is enough.
pub struct TcpProbe {
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl ReadinessProbe for TcpProbe {
    async fn probe(&self, color: SlotColor, spec: &SlotSpec) -> ProbeResult {
        let address = spec.address();
        match tokio::time::timeout(self.timeout, TcpStream::connect(&address)).await {
            Ok(Ok(_)) => ProbeResult::Ready,
            Ok(Err(e)) => {
                debug!(slot = %color, %address, error = %e, "slot refused connection");
                ProbeResult::Failed
            }
            Err(_) => {
                debug!(slot = %color, %address, "slot connect timed out");
                ProbeResult::Failed
            }
        }
    }
}

/// Build the probe described by the readiness config.
pub fn probe_for(config: &ReadinessConfig) -> Box<dyn ReadinessProbe> {
    match config.kind {
        ProbeKind::Http => Box::new(HttpProbe::new(config.path.clone(), config.probe_timeout())),
        ProbeKind::Tcp => Box::new(TcpProbe::new(config.probe_timeout())),
    }
}

/// Poll until the slot is ready. Returns the time it took.
pub async fn wait_until_ready(
    probe: &dyn ReadinessProbe,
    color: SlotColor,
    spec: &SlotSpec,
    timeout: Duration,
    interval: Duration,
) -> Result<Duration> {
    let started = Instant::now();
    let deadline = started + timeout;
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;
        let result = probe.probe(color, spec).await;
        if result == ProbeResult::Ready {
            let elapsed = started.elapsed();
            tracing::info!(
                slot = %color,
                container = %spec.container,
                attempts,
                elapsed_ms = elapsed.as_millis() as u64,
                "slot ready"
            );
            return Ok(elapsed);
        }

        let now = Instant::now();
        if now >= deadline {
            tracing::warn!(slot = %color, container = %spec.container, attempts, "readiness timed out");
            return Err(DeployError::ReadinessTimeout {
                slot: color,
                waited: started.elapsed(),
            });
        }
        debug!(slot = %color, ?result, attempts, "slot not ready yet");
        tokio::time::sleep(interval.min(deadline - now)).await;
    }
}

/// GET `path` on the slot. 2xx is `Ready`, any other status `NotReady`;
/// connection trouble or running past `timeout` is `Failed`.
pub async fn http_probe(
    color: SlotColor,
    spec: &SlotSpec,
    path: &str,
    timeout: Duration,
) -> ProbeResult {
    let address = spec.address();
    match tokio::time::timeout(timeout, fetch_status(&address, path)).await {
        Ok(Ok(status)) if status.is_success() => ProbeResult::Ready,
        Ok(Ok(status)) => {
            debug!(slot = %color, %address, path, %status, "slot answered without success");
            ProbeResult::NotReady
        }
        Ok(Err(reason)) => {
            debug!(slot = %color, %address, path, %reason, "slot unreachable");
            ProbeResult::Failed
        }
        Err(_) => {
            debug!(slot = %color, %address, path, "slot did not answer in time");
            ProbeResult::Failed
        }
    }
}

async fn fetch_status(address: &str, path: &str) -> std::result::Result<http::StatusCode, String> {
    let stream = TcpStream::connect(address)
        .await
        .map_err(|e| format!("connect: {e}"))?;
    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
        .await
        .map_err(|e| format!("handshake: {e}"))?;
    tokio::spawn(async move {
        let _ = conn.await;
    });

    let request = http::Request::get(path)
        .header(http::header::HOST, address)
        .header(http::header::USER_AGENT, "bgswap/0.1")
        .body(Empty::<bytes::Bytes>::new())
        .map_err(|e| format!("request: {e}"))?;
    let response = sender
        .send_request(request)
        .await
        .map_err(|e| format!("send: {e}"))?;
    Ok(response.status())
}
