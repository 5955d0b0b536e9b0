use tokio::sync::broadcast;
use tracing::debug;

use homeguard_api::InstallationOverview;

use super::{ChannelState, DeviceEvent, LOCATION, ON_OFF, Publisher};
use crate::distributor::SnapshotObserver;
use crate::error::CoreError;

/// Relay state of one smart plug.
pub struct SmartPlugObserver {
    key: String,
    publisher: Publisher,
}

impl SmartPlugObserver {
    pub fn new(device_label: &str, events: broadcast::Sender<DeviceEvent>) -> Self {
        Self {
            key: format!("smart-plug:{device_label}"),
            publisher: Publisher::new(device_label, events),
        }
    }
}

impl SnapshotObserver for SmartPlugObserver {
    fn key(&self) -> &str {
        &self.key
    }

    fn on_snapshot(&self, snapshot: &InstallationOverview) -> Result<(), CoreError> {
        let Some(plugs) = &snapshot.smart_plugs else {
            self.publisher.offline("snapshot carried no smart plugs");
            return Ok(());
        };
        let Some(plug) = plugs
            .iter()
            .find(|p| p.device_label == self.publisher.label())
        else {
            return Ok(());
        };

        debug!(device = self.publisher.label(), state = ?plug.current_state, "smart plug update");
        self.publisher.online();
        self.publisher.state(
            ON_OFF,
            plug.current_state
                .map_or(ChannelState::Undefined, |s| ChannelState::Switch(s.is_on())),
        );
        self.publisher
            .state(LOCATION, ChannelState::text(plug.area.as_deref()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use homeguard_api::{PlugState, SmartPlug};

    use super::*;
    use crate::observer::DeviceStatus;
    use crate::observer::testing::{channel, drain};

    #[test]
    fn publishes_relay_state() {
        let (tx, mut rx) = channel();
        let observer = SmartPlugObserver::new("SMRT PLG1", tx);
        let snapshot = InstallationOverview {
            smart_plugs: Some(vec![SmartPlug {
                device_label: "SMRT PLG1".into(),
                current_state: Some(PlugState::Off),
                ..SmartPlug::default()
            }]),
            ..InstallationOverview::default()
        };

        observer.on_snapshot(&snapshot).unwrap();
        let events = drain(&mut rx);

        assert_eq!(events.len(), 3);
        assert_eq!(
            events[0],
            DeviceEvent::Status {
                device_label: "SMRT PLG1".into(),
                status: DeviceStatus::Online,
            }
        );
        assert_eq!(
            events[1],
            DeviceEvent::State {
                device_label: "SMRT PLG1".into(),
                channel: ON_OFF,
                state: ChannelState::Switch(false),
            }
        );
        assert_eq!(
            events[2],
            DeviceEvent::State {
                device_label: "SMRT PLG1".into(),
                channel: LOCATION,
                state: ChannelState::Undefined,
            }
        );
    }
}
