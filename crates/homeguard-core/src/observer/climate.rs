use tokio::sync::broadcast;
use tracing::debug;

use homeguard_api::InstallationOverview;

use super::{ChannelState, DeviceEvent, HUMIDITY, LAST_UPDATE, LOCATION, Publisher, TEMPERATURE};
use crate::distributor::SnapshotObserver;
use crate::error::CoreError;

/// Temperature and humidity of one climate sensor.
pub struct ClimateObserver {
    key: String,
    publisher: Publisher,
}

impl ClimateObserver {
    pub fn new(device_label: &str, events: broadcast::Sender<DeviceEvent>) -> Self {
        Self {
            key: format!("climate:{device_label}"),
            publisher: Publisher::new(device_label, events),
        }
    }
}

impl SnapshotObserver for ClimateObserver {
    fn key(&self) -> &str {
        &self.key
    }

    fn on_snapshot(&self, snapshot: &InstallationOverview) -> Result<(), CoreError> {
        let Some(values) = &snapshot.climate_values else {
            self.publisher.offline("snapshot carried no climate values");
            return Ok(());
        };
        let Some(value) = values
            .iter()
            .find(|v| v.device_label == self.publisher.label())
        else {
            return Ok(());
        };

        debug!(device = self.publisher.label(), "climate update");
        self.publisher.online();
        self.publisher
            .state(TEMPERATURE, ChannelState::decimal(value.temperature));
        self.publisher
            .state(HUMIDITY, ChannelState::decimal(value.humidity));
        self.publisher
            .state(LAST_UPDATE, ChannelState::timestamp(value.time));
        self.publisher
            .state(LOCATION, ChannelState::text(value.device_area.as_deref()));
        Ok(())
    }
}
