use tokio::sync::broadcast;
use tracing::debug;

use homeguard_api::InstallationOverview;

use super::{ChannelState, Contact, DeviceEvent, LAST_UPDATE, LOCATION, Publisher, STATE};
use crate::distributor::SnapshotObserver;
use crate::error::CoreError;

/// Open/closed state of one door or window sensor.
pub struct DoorWindowObserver {
    key: String,
    publisher: Publisher,
}

impl DoorWindowObserver {
    pub fn new(device_label: &str, events: broadcast::Sender<DeviceEvent>) -> Self {
        Self {
            key: format!("door-window:{device_label}"),
            publisher: Publisher::new(device_label, events),
        }
    }
}

impl SnapshotObserver for DoorWindowObserver {
    fn key(&self) -> &str {
        &self.key
    }

    fn on_snapshot(&self, snapshot: &InstallationOverview) -> Result<(), CoreError> {
        let devices = snapshot
            .door_window
            .as_ref()
            .and_then(|dw| dw.door_window_device.as_ref());
        let Some(devices) = devices else {
            self.publisher
                .offline("snapshot carried no door/window devices");
            return Ok(());
        };
        let Some(device) = devices
            .iter()
            .find(|d| d.device_label == self.publisher.label())
        else {
            return Ok(());
        };

        debug!(device = self.publisher.label(), state = ?device.state, "door/window update");
        self.publisher.online();

        let contact = device
            .state
            .as_deref()
            .and_then(Contact::from_report)
            .map_or(ChannelState::Undefined, ChannelState::Contact);
        self.publisher.state(STATE, contact);
        self.publisher
            .state(LAST_UPDATE, ChannelState::timestamp(device.report_time));
        self.publisher
            .state(LOCATION, ChannelState::text(device.area.as_deref()));
        Ok(())
    }
}
