// ── Device observers ──
//
// One observer per physical device. Each filters the snapshot down to its
// own device label and republishes derived channel values as
// `DeviceEvent`s on the bridge's broadcast channel. Observers share no
// state beyond the event sender.

mod climate;
mod door_lock;
mod door_window;
mod smart_plug;

use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use tokio::sync::broadcast;

pub use climate::ClimateObserver;
pub use door_lock::DoorLockObserver;
pub use door_window::DoorWindowObserver;
pub use smart_plug::SmartPlugObserver;

// ── Channel ids ──────────────────────────────────────────────────────

pub const TEMPERATURE: &str = "temperature";
pub const HUMIDITY: &str = "humidity";
pub const LAST_UPDATE: &str = "last-update";
pub const LOCATION: &str = "location";
pub const STATE: &str = "state";
pub const ON_OFF: &str = "on-off";
pub const LOCK_UNLOCK: &str = "lock-unlock";

// ── Events ───────────────────────────────────────────────────────────

/// Door/window contact state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Contact {
    Open,
    Closed,
}

impl Contact {
    /// `OPEN`/`OPENED` and `CLOSE`/`CLOSED`, any case.
    pub fn from_report(state: &str) -> Option<Self> {
        if state.eq_ignore_ascii_case("OPEN") || state.eq_ignore_ascii_case("OPENED") {
            Some(Self::Open)
        } else if state.eq_ignore_ascii_case("CLOSE") || state.eq_ignore_ascii_case("CLOSED") {
            Some(Self::Closed)
        } else {
            None
        }
    }
}

/// Value published on a device channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelState {
    Decimal(f64),
    Text(String),
    Timestamp(DateTime<FixedOffset>),
    Switch(bool),
    Contact(Contact),
    /// The snapshot carried the device but not this value.
    Undefined,
}

impl ChannelState {
    fn decimal(value: Option<f64>) -> Self {
        value.map_or(Self::Undefined, Self::Decimal)
    }

    fn text(value: Option<&str>) -> Self {
        value.map_or(Self::Undefined, |v| Self::Text(v.to_owned()))
    }

    fn timestamp(value: Option<DateTime<FixedOffset>>) -> Self {
        value.map_or(Self::Undefined, Self::Timestamp)
    }
}

/// Reachability of one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceStatus {
    Online,
    /// The snapshot did not report this device's collection at all.
    Offline { message: String },
}

/// A change published by a device observer.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    Status {
        device_label: String,
        status: DeviceStatus,
    },
    State {
        device_label: String,
        channel: &'static str,
        state: ChannelState,
    },
}

impl DeviceEvent {
    pub fn device_label(&self) -> &str {
        match self {
            Self::Status { device_label, .. } | Self::State { device_label, .. } => device_label,
        }
    }
}

// ── Publisher ────────────────────────────────────────────────────────

/// Event sender scoped to one device label.
#[derive(Debug, Clone)]
pub(crate) struct Publisher {
    device_label: Arc<str>,
    events: broadcast::Sender<DeviceEvent>,
}

impl Publisher {
    pub(crate) fn new(device_label: &str, events: broadcast::Sender<DeviceEvent>) -> Self {
        Self {
            device_label: Arc::from(device_label),
            events,
        }
    }

    pub(crate) fn label(&self) -> &str {
        &self.device_label
    }

    pub(crate) fn online(&self) {
        self.send(DeviceEvent::Status {
            device_label: self.device_label.to_string(),
            status: DeviceStatus::Online,
        });
    }

    pub(crate) fn offline(&self, message: &str) {
        self.send(DeviceEvent::Status {
            device_label: self.device_label.to_string(),
            status: DeviceStatus::Offline {
                message: message.to_owned(),
            },
        });
    }

    pub(crate) fn state(&self, channel: &'static str, state: ChannelState) {
        self.send(DeviceEvent::State {
            device_label: self.device_label.to_string(),
            channel,
            state,
        });
    }

    // No subscribers is not an error: events are best-effort.
    fn send(&self, event: DeviceEvent) {
        let _ = self.events.send(event);
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contact_reports() {
        assert_eq!(Contact::from_report("OPEN"), Some(Contact::Open));
        assert_eq!(Contact::from_report("opened"), Some(Contact::Open));
        assert_eq!(Contact::from_report("Close"), Some(Contact::Closed));
        assert_eq!(Contact::from_report("CLOSED"), Some(Contact::Closed));
        assert_eq!(Contact::from_report("AJAR"), None);
        assert_eq!(Contact::from_report(""), None);
    }
}
