// ── Device discovery ──
//
// Enumerates the devices present in a snapshot so a host can create one
// observer per device without being told the labels up front.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;

use homeguard_api::InstallationOverview;

use crate::distributor::SnapshotObserver;
use crate::observer::{
    ClimateObserver, DeviceEvent, DoorLockObserver, DoorWindowObserver, SmartPlugObserver,
};

/// Kind of device found in a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum DeviceKind {
    ClimateSensor,
    DoorWindowSensor,
    SmartPlug,
    DoorLock,
}

impl DeviceKind {
    fn display_prefix(self) -> &'static str {
        match self {
            Self::ClimateSensor => "Climate sensor",
            Self::DoorWindowSensor => "Door/Window sensor",
            Self::SmartPlug => "Smart Plug",
            Self::DoorLock => "Door Lock",
        }
    }
}

/// A device found in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredDevice {
    pub kind: DeviceKind,
    /// Label exactly as the API reports it.
    pub device_label: String,
    /// Label normalized for use as an identifier.
    pub thing_id: String,
    pub display_label: String,
    pub area: Option<String>,
}

impl DiscoveredDevice {
    fn new(kind: DeviceKind, device_label: &str, area: Option<&str>) -> Self {
        Self {
            kind,
            device_label: device_label.to_owned(),
            thing_id: thing_id(device_label),
            display_label: format!("{} {device_label}", kind.display_prefix()),
            area: area.map(str::to_owned),
        }
    }

    /// Build the observer that tracks this device.
    pub fn observer(&self, events: broadcast::Sender<DeviceEvent>) -> Arc<dyn SnapshotObserver> {
        let label = self.device_label.as_str();
        match self.kind {
            DeviceKind::ClimateSensor => Arc::new(ClimateObserver::new(label, events)),
            DeviceKind::DoorWindowSensor => Arc::new(DoorWindowObserver::new(label, events)),
            DeviceKind::SmartPlug => Arc::new(SmartPlugObserver::new(label, events)),
            DeviceKind::DoorLock => Arc::new(DoorLockObserver::new(label, events)),
        }
    }
}

/// Lower-cased label with every character outside `[a-zA-Z0-9_]`
/// replaced by `_`.
pub fn thing_id(device_label: &str) -> String {
    device_label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Every device in `snapshot`, grouped by kind in snapshot order.
pub fn discover(snapshot: &InstallationOverview) -> Vec<DiscoveredDevice> {
    let mut devices = Vec::new();

    for value in snapshot.climate_values.iter().flatten() {
        devices.push(DiscoveredDevice::new(
            DeviceKind::ClimateSensor,
            &value.device_label,
            value.device_area.as_deref(),
        ));
    }

    let door_windows = snapshot
        .door_window
        .as_ref()
        .and_then(|dw| dw.door_window_device.as_ref());
    for device in door_windows.into_iter().flatten() {
        devices.push(DiscoveredDevice::new(
            DeviceKind::DoorWindowSensor,
            &device.device_label,
            device.area.as_deref(),
        ));
    }

    for plug in snapshot.smart_plugs.iter().flatten() {
        devices.push(DiscoveredDevice::new(
            DeviceKind::SmartPlug,
            &plug.device_label,
            plug.area.as_deref(),
        ));
    }

    for lock in snapshot.door_lock_status_list.iter().flatten() {
        devices.push(DiscoveredDevice::new(
            DeviceKind::DoorLock,
            &lock.device_label,
            lock.area.as_deref(),
        ));
    }

    devices.retain(|d| !d.device_label.is_empty());
    devices
}
