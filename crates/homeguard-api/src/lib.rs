// homeguard-api: Async Rust client for the home-security installation API

pub mod error;
pub mod models;
pub mod session;
pub mod transport;
pub mod urls;

pub use error::Error;
pub use models::{
    ArmState, ArmStatus, ClimateValue, DoorLock, DoorWindow, DoorWindowDevice, Installation,
    InstallationOverview, LockStatus, PlugState, SmartPlug,
};
pub use session::{ARM_STATE_ALREADY_SET, LOCK_STATE_ALREADY_SET, MutationOutcome, Session};
pub use transport::{
    HttpRequest, HttpResponse, HttpTransport, Method, ReqwestTransport, TlsMode, TransportConfig,
};
pub use urls::Endpoints;
