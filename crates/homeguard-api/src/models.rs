// Installation API wire types
//
// JSON shapes exchanged with the installation API. Responses are camelCase.
// Collections and enum-valued fields are decoded leniently: an unknown id
// or malformed timestamp becomes `None` instead of failing the snapshot,
// a `null` flag or label takes its default, and a collection the server
// omits stays `None` so consumers can tell "not reported" apart from
// "reported empty".

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize};
use strum::{EnumIter, EnumString, IntoStaticStr};

use crate::error::Error;

// ── Enumerations ─────────────────────────────────────────────────────

/// Alarm arm state of an installation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, EnumIter, IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum ArmStatus {
    ArmedHome,
    ArmedAway,
    Disarmed,
}

impl ArmStatus {
    /// Canonical wire id, e.g. `ARMED_HOME`.
    pub fn id(self) -> &'static str {
        self.into()
    }

    /// Human-readable label.
    pub fn text(self) -> &'static str {
        match self {
            Self::ArmedHome => "Armed (Home)",
            Self::ArmedAway => "Armed (Away)",
            Self::Disarmed => "Disarmed",
        }
    }

    /// Case-insensitive lookup by canonical id.
    pub fn retrieve_by_id(value: &str) -> Result<Self, Error> {
        value.parse().map_err(|_| Error::UnknownStatus {
            kind: "arm status",
            value: value.to_owned(),
        })
    }
}

impl fmt::Display for ArmStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Door lock state.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, EnumIter, IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum LockStatus {
    Locked,
    Unlocked,
}

impl LockStatus {
    pub fn id(self) -> &'static str {
        self.into()
    }

    pub fn text(self) -> &'static str {
        match self {
            Self::Locked => "Locked",
            Self::Unlocked => "Unlocked",
        }
    }

    /// Case-insensitive lookup by canonical id.
    pub fn retrieve_by_id(value: &str) -> Result<Self, Error> {
        value.parse().map_err(|_| Error::UnknownStatus {
            kind: "lock status",
            value: value.to_owned(),
        })
    }
}

impl fmt::Display for LockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Smart plug relay state as reported in a snapshot (`"ON"` / `"OFF"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, EnumString, IntoStaticStr)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum PlugState {
    On,
    Off,
}

impl PlugState {
    pub fn is_on(self) -> bool {
        self == Self::On
    }
}

// ── Authentication ───────────────────────────────────────────────────

/// Body of a successful `POST /cookie`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CookieInfo {
    #[serde(default)]
    pub cookie: Option<String>,
}

// ── Installations ────────────────────────────────────────────────────

/// One installation returned by the discovery search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installation {
    pub giid: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub locale: Option<String>,
    /// Everything else the server reports (street, shard, firmware, ...).
    #[serde(flatten)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

// ── Installation overview (snapshot) ─────────────────────────────────

/// Point-in-time read of every device state in an installation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallationOverview {
    #[serde(default)]
    pub arm_state: Option<ArmState>,
    #[serde(default)]
    pub climate_values: Option<Vec<ClimateValue>>,
    #[serde(default)]
    pub door_window: Option<DoorWindow>,
    #[serde(default)]
    pub smart_plugs: Option<Vec<SmartPlug>>,
    #[serde(default)]
    pub door_lock_status_list: Option<Vec<DoorLock>>,
}

impl InstallationOverview {
    /// The arm status, if the snapshot carried a recognizable one.
    pub fn arm_status(&self) -> Option<ArmStatus> {
        self.arm_state.as_ref().and_then(|a| a.status_type)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArmState {
    #[serde(default, deserialize_with = "lenient")]
    pub date: Option<DateTime<FixedOffset>>,
    #[serde(default, deserialize_with = "lenient")]
    pub status_type: Option<ArmStatus>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub cid: Option<String>,
    #[serde(default)]
    pub changed_via: Option<String>,
    #[serde(default)]
    pub state: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClimateValue {
    #[serde(default, deserialize_with = "null_as_default")]
    pub device_label: String,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub device_type: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub time: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub device_area: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoorWindow {
    #[serde(default)]
    pub door_window_device: Option<Vec<DoorWindowDevice>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub report_state: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoorWindowDevice {
    #[serde(default, deserialize_with = "null_as_default")]
    pub device_label: String,
    /// Free-form: `OPEN`, `OPENED`, `CLOSE`, `CLOSED`, ...
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub report_time: Option<DateTime<FixedOffset>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub wired: bool,
    #[serde(default)]
    pub area: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmartPlug {
    #[serde(default, deserialize_with = "null_as_default")]
    pub device_label: String,
    #[serde(default, rename = "isHazardous", deserialize_with = "null_as_default")]
    pub hazardous: bool,
    #[serde(default)]
    pub area: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub current_state: Option<PlugState>,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoorLock {
    #[serde(default, deserialize_with = "null_as_default")]
    pub device_label: String,
    #[serde(default, deserialize_with = "lenient")]
    pub event_time: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub area: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub current_lock_state: Option<LockStatus>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub motor_jam: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub secure_mode_active: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub paired: bool,
    #[serde(default, deserialize_with = "lenient")]
    pub locked_state: Option<LockStatus>,
    #[serde(default)]
    pub pending_lock_state: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
}

// ── Errors ───────────────────────────────────────────────────────────

/// Vendor error body attached to non-2xx responses.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    #[serde(default)]
    pub error_group: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

// ── Request payloads ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArmPayload<'a> {
    pub code: &'a str,
    pub state: ArmStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DoorLockPayload<'a> {
    pub code: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SmartPlugCommand<'a> {
    pub device_label: &'a str,
    pub state: bool,
}

// ── Helpers ──────────────────────────────────────────────────────────

/// Decode an optional string field through `FromStr`, mapping values that
/// do not parse to `None`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.parse().ok()))
}

/// Treat an explicit `null` like a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
