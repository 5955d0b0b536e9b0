//! One-shot read commands: status, installations, devices.

use std::fmt::Write as _;

use serde::Serialize;
use tabled::Tabled;

use homeguard_core::{ArmStatus, Bridge, BridgeStatus, DiscoveredDevice, Installation};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

// ── Status ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct StatusView {
    installation: String,
    bridge: String,
    arm_status: Option<ArmStatus>,
    changed_at: Option<String>,
    changed_via: Option<String>,
    changed_by: Option<String>,
}

pub async fn status(bridge: &Bridge, global: &GlobalOpts) -> Result<(), CliError> {
    bridge.refresh().await?;

    let status = bridge.current_status();
    let arm_state = bridge
        .last_snapshot()
        .and_then(|snapshot| snapshot.arm_state.clone())
        .unwrap_or_default();
    let view = StatusView {
        installation: bridge.config().installation.clone(),
        bridge: describe_status(&status),
        arm_status: arm_state.status_type,
        changed_at: arm_state.date.map(|d| d.to_rfc3339()),
        changed_via: arm_state.changed_via,
        changed_by: arm_state.name,
    };

    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        &view,
        |v| status_detail(v, &status, color),
        |v| v.arm_status.map_or("UNKNOWN", ArmStatus::id).to_owned(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

fn describe_status(status: &BridgeStatus) -> String {
    match status {
        BridgeStatus::Uninitialized => "uninitialized".into(),
        BridgeStatus::Online => "online".into(),
        BridgeStatus::Offline { detail, message } => format!("offline ({detail}): {message}"),
    }
}

fn status_detail(view: &StatusView, status: &BridgeStatus, color: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Installation: {}", view.installation);
    let _ = writeln!(out, "Bridge:       {}", output::status_label(status, color));
    if let BridgeStatus::Offline { message, .. } = status {
        let _ = writeln!(out, "              {message}");
    }
    let _ = write!(
        out,
        "Alarm:        {}",
        view.arm_status.map_or("Unknown", ArmStatus::text)
    );
    if let Some(ref at) = view.changed_at {
        let _ = write!(out, "\nChanged:      {at}");
        if let Some(ref via) = view.changed_via {
            let _ = write!(out, " via {via}");
        }
        if let Some(ref by) = view.changed_by {
            let _ = write!(out, " by {by}");
        }
    }
    out
}

// ── Installations ────────────────────────────────────────────────────

#[derive(Tabled)]
struct InstallationRow {
    #[tabled(rename = "GIID")]
    giid: String,
    #[tabled(rename = "Alias")]
    alias: String,
    #[tabled(rename = "Locale")]
    locale: String,
}

impl From<&Installation> for InstallationRow {
    fn from(i: &Installation) -> Self {
        Self {
            giid: i.giid.clone(),
            alias: i.alias.clone().unwrap_or_default(),
            locale: i.locale.clone().unwrap_or_default(),
        }
    }
}

pub async fn installations(bridge: &Bridge, global: &GlobalOpts) -> Result<(), CliError> {
    let installations = bridge.installations().await?;
    let out = output::render_list(
        &global.output,
        &installations,
        |i| InstallationRow::from(i),
        |i| i.giid.clone(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Devices ──────────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Area")]
    area: String,
}

impl From<&DiscoveredDevice> for DeviceRow {
    fn from(d: &DiscoveredDevice) -> Self {
        Self {
            kind: d.kind.to_string(),
            label: d.device_label.clone(),
            id: d.thing_id.clone(),
            area: d.area.clone().unwrap_or_default(),
        }
    }
}

pub async fn devices(bridge: &Bridge, global: &GlobalOpts) -> Result<(), CliError> {
    bridge.refresh().await?;
    let devices = bridge.discovered_devices();
    let out = output::render_list(&global.output, &devices, |d| DeviceRow::from(d), |d| {
        d.device_label.clone()
    });
    output::print_output(&out, global.quiet);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view() -> StatusView {
        StatusView {
            installation: "112233".into(),
            bridge: "online".into(),
            arm_status: Some(ArmStatus::ArmedAway),
            changed_at: Some("2024-01-01T10:00:00+01:00".into()),
            changed_via: Some("CODE".into()),
            changed_by: Some("Alice".into()),
        }
    }

    #[test]
    fn status_detail_lists_arm_change() {
        let text = status_detail(&view(), &BridgeStatus::Online, false);
        assert!(text.contains("Alarm:        Armed (Away)"));
        assert!(text.contains("via CODE by Alice"));
    }

    #[test]
    fn offline_status_shows_reason() {
        let status = BridgeStatus::Offline {
            detail: homeguard_core::StatusDetail::CommunicationError,
            message: "snapshot carried no valid arm status".into(),
        };
        assert_eq!(
            describe_status(&status),
            "offline (communication-error): snapshot carried no valid arm status"
        );
        assert!(status_detail(&view(), &status, false).contains("OFFLINE"));
    }
}
