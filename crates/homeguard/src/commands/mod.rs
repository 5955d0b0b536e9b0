//! Command dispatch: bridges CLI args -> core bridge operations -> output formatting.

pub mod config_cmd;
pub mod control;
pub mod info;
pub mod watch;

use homeguard_core::Bridge;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a bridge-bound command to the appropriate handler, then
/// dispose the bridge whatever the outcome.
pub async fn dispatch(cmd: Command, bridge: &Bridge, global: &GlobalOpts) -> Result<(), CliError> {
    let result = match cmd {
        Command::Watch(args) => watch::handle(bridge, args, global).await,
        Command::Status => info::status(bridge, global).await,
        Command::Installations => info::installations(bridge, global).await,
        Command::Devices => info::devices(bridge, global).await,
        Command::Arm(args) => control::arm(bridge, args, global).await,
        Command::Lock(args) => control::lock(bridge, args, global).await,
        Command::Plug(args) => control::plug(bridge, args, global).await,
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "command does not use the bridge".into(),
        )),
    };

    bridge.dispose().await;
    result
}
