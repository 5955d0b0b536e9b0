//! Clap derive structures for the `homeguard` CLI.
//!
//! Defines the command tree, global flags, and shared value enums.

use clap::{Args, Parser, Subcommand, ValueEnum};

use homeguard_core::{ArmStatus, LockStatus};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// homeguard -- poll and control a home-security installation
#[derive(Debug, Parser)]
#[command(
    name = "homeguard",
    version,
    about = "Monitor and control a home-security installation from the command line",
    long_about = "Polls the installation's cloud API for alarm, sensor, plug and lock state,\n\
        and sends arm, lock and plug commands.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Configuration profile to use
    #[arg(long, short = 'p', env = "HOMEGUARD_PROFILE", global = true)]
    pub profile: Option<String>,

    /// API base URL (overrides profile)
    #[arg(long, env = "HOMEGUARD_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Installation id (overrides profile)
    #[arg(long, short = 'i', env = "HOMEGUARD_INSTALLATION", global = true)]
    pub installation: Option<String>,

    /// Account username (overrides profile)
    #[arg(long, short = 'u', global = true)]
    pub username: Option<String>,

    /// Default PIN for arm and lock commands
    #[arg(long, env = "HOMEGUARD_PIN", global = true, hide_env_values = true)]
    pub pin: Option<String>,

    /// Refresh interval in seconds
    #[arg(long, global = true)]
    pub refresh: Option<u64>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "HOMEGUARD_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept invalid TLS certificates
    #[arg(long, short = 'k', env = "HOMEGUARD_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, env = "HOMEGUARD_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the bridge and stream status and device changes until Ctrl-C
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Show the current alarm state
    #[command(alias = "st")]
    Status,

    /// List installations visible to the account
    Installations,

    /// List devices reported by the installation
    #[command(alias = "dev", alias = "d")]
    Devices,

    /// Arm or disarm the alarm
    Arm(ArmArgs),

    /// Lock or unlock a door lock
    Lock(LockArgs),

    /// Switch a smart plug on or off
    Plug(PlugArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Only follow these device labels (repeatable)
    #[arg(long = "device", short = 'd')]
    pub devices: Vec<String>,

    /// Poll in a burst of COUNT refreshes, INTERVAL ms apart, after start
    #[arg(long, value_name = "COUNT-INTERVAL")]
    pub burst: Option<String>,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ArmArgs {
    /// Target state
    pub state: ArmTarget,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ArmTarget {
    /// Armed, people at home
    Home,
    /// Armed, nobody home
    Away,
    /// Disarmed
    Off,
}

impl From<ArmTarget> for ArmStatus {
    fn from(target: ArmTarget) -> Self {
        match target {
            ArmTarget::Home => ArmStatus::ArmedHome,
            ArmTarget::Away => ArmStatus::ArmedAway,
            ArmTarget::Off => ArmStatus::Disarmed,
        }
    }
}

#[derive(Debug, Args)]
pub struct LockArgs {
    /// Door lock device label
    pub device: String,

    /// Target state
    pub state: LockTarget,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LockTarget {
    Locked,
    Unlocked,
}

impl From<LockTarget> for LockStatus {
    fn from(target: LockTarget) -> Self {
        match target {
            LockTarget::Locked => LockStatus::Locked,
            LockTarget::Unlocked => LockStatus::Unlocked,
        }
    }
}

#[derive(Debug, Args)]
pub struct PlugArgs {
    /// Smart plug device label
    pub device: String,

    /// Target state
    pub state: PlugTarget,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PlugTarget {
    On,
    Off,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file path
    Path,

    /// Show the effective configuration (secrets redacted)
    Show,

    /// List configured profiles
    Profiles,

    /// Add or replace a profile
    SetProfile(SetProfileArgs),

    /// Store a secret for the active profile in the system keyring (read from stdin)
    SetSecret(SetSecretArgs),
}

#[derive(Debug, Args)]
pub struct SetProfileArgs {
    /// Profile name
    pub name: String,

    /// API base URL
    #[arg(long = "url")]
    pub url: String,

    /// Installation id
    #[arg(long = "giid")]
    pub giid: String,

    /// Account username
    #[arg(long = "user")]
    pub user: Option<String>,

    /// Make this the default profile
    #[arg(long)]
    pub default: bool,
}

#[derive(Debug, Args)]
pub struct SetSecretArgs {
    /// Which secret to store
    pub field: SecretField,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SecretField {
    Password,
    Pin,
}

impl SecretField {
    pub fn key(self) -> &'static str {
        match self {
            Self::Password => "password",
            Self::Pin => "pin",
        }
    }
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
