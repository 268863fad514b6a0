use std::fmt::Write;

use bg_core::models::{
    DeployConfig, DeployReport, DeploymentOutcome, ProbeKind, SlotColor, SlotPair, StatusReport,
};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

fn slot_line(out: &mut String, color: SlotColor, slots: &SlotPair, running: bool) {
    let spec = slots.get(color);
    let state = if running { "running" } else { "stopped" };
    let _ = writeln!(
        out,
        "{:<9} {} {} {state}",
        format!("{color}:"),
        spec.container,
        spec.address()
    );
}

/// Human-readable `status` output.
pub fn render_status(status: &StatusReport, slots: &SlotPair) -> String {
    let mut out = String::new();
    let detection = &status.detection;
    let _ = writeln!(out, "active:   {} ({})", detection.active, detection.source);
    for color in SlotColor::ALL {
        slot_line(&mut out, color, slots, detection.is_running(color));
    }
    let routing = status
        .routing_target
        .map(|c| c.to_string())
        .unwrap_or_else(|| "-".to_string());
    let _ = writeln!(out, "routing:  {routing}");

    match status.record.as_ref().and_then(|r| r.last_event()) {
        Some(event) => {
            let outcome = match event.outcome {
                DeploymentOutcome::Succeeded => "succeeded",
                DeploymentOutcome::Failed => "failed",
            };
            let _ = write!(
                out,
                "last:     {} -> {} {} {outcome} at {}",
                event.from,
                event.to,
                event.mode,
                event.at.format(TIME_FORMAT)
            );
            if let Some(message) = &event.message {
                let _ = write!(out, "\n          {message}");
            }
        }
        None => out.push_str("last:     never deployed"),
    }
    out
}

/// One-line summary of a finished deployment, plus any retire warning.
pub fn render_report(report: &DeployReport) -> String {
    let elapsed = (report.finished_at - report.started_at).num_milliseconds();
    let mut out = format!(
        "deployed {} (was {}, {}) in {elapsed} ms",
        report.target, report.previous, report.mode
    );
    if let Some(warning) = &report.retire_warning {
        let _ = write!(out, "\nwarning: {warning}");
    }
    out
}

/// Summary printed by `check-config`.
pub fn render_config(config: &DeployConfig) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "runtime:  {}", config.runtime.command.join(" "));
    for color in SlotColor::ALL {
        let spec = config.slot(color);
        let _ = writeln!(
            out,
            "{:<9} {} {}",
            format!("{color}:"),
            spec.container,
            spec.address()
        );
    }
    let readiness = &config.readiness;
    let probe = match readiness.kind {
        ProbeKind::Http => format!("http {}", readiness.path),
        ProbeKind::Tcp => "tcp".to_string(),
    };
    let _ = writeln!(
        out,
        "ready:    {probe} every {}ms for {}s",
        readiness.interval_ms, readiness.timeout_secs
    );
    match &config.proxy {
        Some(proxy) => {
            let _ = writeln!(
                out,
                "proxy:    {} (reload: {})",
                proxy.config_path.display(),
                proxy.reload_command.join(" ")
            );
        }
        None => {
            let _ = writeln!(out, "proxy:    none");
        }
    }
    let _ = write!(out, "state:    {}", config.state_dir.display());
    out
}
