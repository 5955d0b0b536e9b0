// homeguard-core: Polling bridge between homeguard-api and consumers (CLI, automation hosts).

pub mod bridge;
pub mod command;
pub mod config;
pub mod discovery;
pub mod distributor;
pub mod error;
pub mod observer;

// ── Primary re-exports ──────────────────────────────────────────────
pub use bridge::{Bridge, BridgeStatus, LifecycleState, StatusDetail};
pub use command::{ArmCommand, BurstCommand, Channel, Command, LockCommand, Payload, Request};
pub use config::{BridgeConfig, Timings, TlsVerification};
pub use discovery::{DeviceKind, DiscoveredDevice, discover};
pub use distributor::{DistributionReport, SnapshotDistributor, SnapshotObserver};
pub use error::CoreError;
pub use observer::{
    ChannelState, ClimateObserver, Contact, DeviceEvent, DeviceStatus, DoorLockObserver,
    DoorWindowObserver, SmartPlugObserver,
};

// API types consumers handle directly.
pub use homeguard_api::{ArmStatus, Installation, InstallationOverview, LockStatus};
