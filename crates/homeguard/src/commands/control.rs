//! Mutating commands: arm, lock, plug.

use homeguard_core::{
    ArmCommand, ArmStatus, Bridge, Channel, Command, LockCommand, LockStatus, Payload,
};

use crate::cli::{ArmArgs, GlobalOpts, LockArgs, PlugArgs, PlugTarget};
use crate::error::CliError;

pub async fn arm(bridge: &Bridge, args: ArmArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let status = ArmStatus::from(args.state);
    let command = Command::Arm(ArmCommand { pin: None, status });
    bridge
        .handle_command(&Channel::AlarmStatus, Payload::Command(command))
        .await?;

    confirm(global, &format!("Alarm set to {}", status.text()));
    Ok(())
}

pub async fn lock(bridge: &Bridge, args: LockArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let status = LockStatus::from(args.state);
    let command = Command::Lock(LockCommand { pin: None, status });
    bridge
        .handle_command(&Channel::DoorLock(args.device.clone()), Payload::Command(command))
        .await?;

    confirm(global, &format!("{}: {}", args.device, status.text()));
    Ok(())
}

pub async fn plug(bridge: &Bridge, args: PlugArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let on = matches!(args.state, PlugTarget::On);
    bridge
        .handle_command(&Channel::SmartPlug(args.device.clone()), Payload::Switch(on))
        .await?;

    confirm(global, &format!("{}: {}", args.device, if on { "on" } else { "off" }));
    Ok(())
}

fn confirm(global: &GlobalOpts, message: &str) {
    if !global.quiet {
        eprintln!("{message}");
    }
}
