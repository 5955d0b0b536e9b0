use tokio::sync::broadcast;
use tracing::debug;

use homeguard_api::InstallationOverview;

use super::{ChannelState, DeviceEvent, LOCATION, LOCK_UNLOCK, Publisher};
use crate::distributor::SnapshotObserver;
use crate::error::CoreError;

/// Lock state of one door lock.
pub struct DoorLockObserver {
    key: String,
    publisher: Publisher,
}

impl DoorLockObserver {
    pub fn new(device_label: &str, events: broadcast::Sender<DeviceEvent>) -> Self {
        Self {
            key: format!("door-lock:{device_label}"),
            publisher: Publisher::new(device_label, events),
        }
    }
}

impl SnapshotObserver for DoorLockObserver {
    fn key(&self) -> &str {
        &self.key
    }

    fn on_snapshot(&self, snapshot: &InstallationOverview) -> Result<(), CoreError> {
        let Some(locks) = &snapshot.door_lock_status_list else {
            self.publisher.offline("snapshot carried no door locks");
            return Ok(());
        };
        let Some(lock) = locks
            .iter()
            .find(|l| l.device_label == self.publisher.label())
        else {
            return Ok(());
        };

        debug!(device = self.publisher.label(), state = ?lock.current_lock_state, "door lock update");
        self.publisher.online();
        self.publisher.state(
            LOCK_UNLOCK,
            ChannelState::text(lock.current_lock_state.map(|s| s.id())),
        );
        self.publisher
            .state(LOCATION, ChannelState::text(lock.area.as_deref()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use homeguard_api::{DoorLock, LockStatus};

    use super::*;
    use crate::observer::DeviceStatus;
    use crate::observer::testing::{channel, drain};

    #[test]
    fn publishes_lock_state_id() {
        let (tx, mut rx) = channel();
        let observer = DoorLockObserver::new("FRONT", tx);
        let snapshot = InstallationOverview {
            door_lock_status_list: Some(vec![DoorLock {
                device_label: "FRONT".into(),
                current_lock_state: Some(LockStatus::Unlocked),
                area: Some("Entrance".into()),
                ..DoorLock::default()
            }]),
            ..InstallationOverview::default()
        };

        observer.on_snapshot(&snapshot).unwrap();
        let events = drain(&mut rx);

        assert!(events.contains(&DeviceEvent::State {
            device_label: "FRONT".into(),
            channel: LOCK_UNLOCK,
            state: ChannelState::Text("UNLOCKED".into()),
        }));
        assert!(events.contains(&DeviceEvent::State {
            device_label: "FRONT".into(),
            channel: LOCATION,
            state: ChannelState::Text("Entrance".into()),
        }));
    }

    #[test]
    fn absent_lock_list_marks_offline() {
        let (tx, mut rx) = channel();
        DoorLockObserver::new("FRONT", tx)
            .on_snapshot(&InstallationOverview::default())
            .unwrap();

        assert_eq!(
            drain(&mut rx),
            vec![DeviceEvent::Status {
                device_label: "FRONT".into(),
                status: DeviceStatus::Offline {
                    message: "snapshot carried no door locks".into(),
                },
            }]
        );
    }
}
