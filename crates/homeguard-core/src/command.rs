// ── Command codec ──
//
// Turns what arrives on a bridge channel into a typed `Request`. Text
// payloads are parsed against a small grammar (arm state, lock state,
// burst directive); structured `Command` values are taken as-is. The
// codec is pure: it never touches the session.

use std::fmt;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use homeguard_api::{ArmStatus, LockStatus, PlugState};

use crate::error::CoreError;

static ARM_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(DISARMED|ARMED_HOME|ARMED_AWAY)(?:_(\d{4,}))?$").expect("valid pattern")
});
static LOCK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(LOCKED|UNLOCKED)(?:_(\d{4,}))?$").expect("valid pattern")
});
static BURST_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^burst-(\d+)-(\d{3,})$").expect("valid pattern"));

// ── Commands ─────────────────────────────────────────────────────────

/// Change the installation's arm state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArmCommand {
    /// PIN carried by the command; the bridge default applies when absent.
    pub pin: Option<String>,
    pub status: ArmStatus,
}

/// Lock or unlock a door lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockCommand {
    pub pin: Option<String>,
    pub status: LockStatus,
}

/// Poll `count` times, `interval` apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BurstCommand {
    pub count: u32,
    pub interval: Duration,
}

impl Default for BurstCommand {
    fn default() -> Self {
        Self {
            count: 1,
            interval: Duration::from_millis(1000),
        }
    }
}

/// A structured command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Arm(ArmCommand),
    Lock(LockCommand),
    Burst(BurstCommand),
}

// ── Channels & payloads ──────────────────────────────────────────────

/// Where a payload was addressed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Channel {
    AlarmStatus,
    Burst,
    DoorLock(String),
    SmartPlug(String),
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlarmStatus => f.write_str("alarm-status"),
            Self::Burst => f.write_str("burst"),
            Self::DoorLock(label) => write!(f, "door-lock[{label}]"),
            Self::SmartPlug(label) => write!(f, "smart-plug[{label}]"),
        }
    }
}

/// What arrived on a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Command(Command),
    Switch(bool),
    Refresh,
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<Command> for Payload {
    fn from(command: Command) -> Self {
        Self::Command(command)
    }
}

/// A routed operation, ready for the bridge to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Arm(ArmCommand),
    Lock {
        device_label: String,
        command: LockCommand,
    },
    Plug {
        device_label: String,
        on: bool,
    },
    Burst(BurstCommand),
    Refresh,
}

// ── Parsing ──────────────────────────────────────────────────────────

/// `ARMED_HOME`, `DISARMED_1234`, ... Anything else is `None`.
pub fn parse_arm(text: &str) -> Option<ArmCommand> {
    let caps = ARM_PATTERN.captures(text)?;
    let status = ArmStatus::retrieve_by_id(caps.get(1)?.as_str()).ok()?;
    Some(ArmCommand {
        pin: caps.get(2).map(|m| m.as_str().to_owned()),
        status,
    })
}

/// `LOCKED`, `UNLOCKED_1234`, ... Anything else is `None`.
pub fn parse_lock(text: &str) -> Option<LockCommand> {
    let caps = LOCK_PATTERN.captures(text)?;
    let status = LockStatus::retrieve_by_id(caps.get(1)?.as_str()).ok()?;
    Some(LockCommand {
        pin: caps.get(2).map(|m| m.as_str().to_owned()),
        status,
    })
}

/// `burst-<count>-<millis>`. Malformed input yields the default burst.
pub fn parse_burst(text: &str) -> BurstCommand {
    let Some(caps) = BURST_PATTERN.captures(text) else {
        return BurstCommand::default();
    };
    let count = caps.get(1).and_then(|m| m.as_str().parse().ok());
    let millis = caps.get(2).and_then(|m| m.as_str().parse().ok());

    match (count, millis) {
        (Some(count), Some(millis)) => BurstCommand {
            count,
            interval: Duration::from_millis(millis),
        },
        _ => BurstCommand::default(),
    }
}

/// Route `payload` on `channel` to a request.
///
/// A refresh payload is accepted on every channel. Otherwise the payload
/// must be text matching the channel's grammar, or a structured command
/// of the channel's kind.
pub fn decode(channel: &Channel, payload: Payload) -> Result<Request, CoreError> {
    let request = match (channel, payload) {
        (_, Payload::Refresh) => Request::Refresh,

        (Channel::AlarmStatus, Payload::Command(Command::Arm(command))) => Request::Arm(command),
        (Channel::AlarmStatus, Payload::Text(text)) => {
            Request::Arm(parse_arm(&text).ok_or_else(|| malformed(channel, text))?)
        }

        (Channel::DoorLock(label), Payload::Command(Command::Lock(command))) => Request::Lock {
            device_label: label.clone(),
            command,
        },
        (Channel::DoorLock(label), Payload::Text(text)) => Request::Lock {
            device_label: label.clone(),
            command: parse_lock(&text).ok_or_else(|| malformed(channel, text))?,
        },

        (Channel::SmartPlug(label), Payload::Switch(on)) => Request::Plug {
            device_label: label.clone(),
            on,
        },
        (Channel::SmartPlug(label), Payload::Text(text)) => {
            let Ok(state) = text.trim().parse::<PlugState>() else {
                return Err(malformed(channel, text));
            };
            Request::Plug {
                device_label: label.clone(),
                on: state.is_on(),
            }
        }

        (Channel::Burst, Payload::Command(Command::Burst(command))) => Request::Burst(command),
        (Channel::Burst, Payload::Text(text)) => Request::Burst(parse_burst(&text)),

        (_, other) => return Err(malformed(channel, format!("{other:?}"))),
    };

    Ok(request)
}

fn malformed(channel: &Channel, payload: String) -> CoreError {
    CoreError::MalformedCommand {
        channel: channel.to_string(),
        payload,
    }
}
