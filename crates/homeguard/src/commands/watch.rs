//! `homeguard watch`: run the bridge and stream status and device events
//! until interrupted.

use std::time::Duration;

use chrono::Local;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use homeguard_core::{
    Bridge, BridgeStatus, Channel, ChannelState, DeviceEvent, DeviceStatus, Payload,
};

use crate::cli::{GlobalOpts, WatchArgs};
use crate::error::CliError;
use crate::output;

/// How often newly reported devices are picked up.
const DISCOVERY_TICK: Duration = Duration::from_secs(1);

pub async fn handle(bridge: &Bridge, args: WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    let mut status = bridge.status();
    let mut events = bridge.events();

    bridge.start()?;
    info!(installation = %bridge.config().installation, "watching");

    if let Some(ref burst) = args.burst {
        bridge
            .handle_command(&Channel::Burst, Payload::Text(format!("burst-{burst}")))
            .await?;
    }

    let mut discovery = tokio::time::interval(DISCOVERY_TICK);
    discovery.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = &mut shutdown => {
                if let Err(e) = result {
                    warn!(error = %e, "failed to listen for ctrl-c");
                }
                break;
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = status.borrow_and_update().clone();
                print_status(&current, color);
                follow_devices(bridge, &args.devices);
            }
            _ = discovery.tick() => {
                follow_devices(bridge, &args.devices);
            }
            event = events.recv() => match event {
                Ok(event) => {
                    if is_followed(&args.devices, event.device_label()) {
                        println!("{}", describe_event(&event));
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event stream lagged, some device updates were dropped");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    info!("stopping");
    Ok(())
}

/// Register an observer for every device in the last snapshot that is
/// not yet followed. New devices share one catch-up refresh.
fn follow_devices(bridge: &Bridge, filter: &[String]) {
    let events = bridge.event_sender();
    let observers = bridge
        .discovered_devices()
        .into_iter()
        .filter(|device| {
            is_followed(filter, &device.device_label) || is_followed(filter, &device.thing_id)
        })
        .map(|device| device.observer(events.clone()));

    let added = bridge.register_observers(observers);
    if added > 0 {
        debug!(added, following = bridge.observer_count(), "following new devices");
    }
}

fn is_followed(filter: &[String], label: &str) -> bool {
    filter.is_empty() || filter.iter().any(|f| f.eq_ignore_ascii_case(label))
}

fn print_status(status: &BridgeStatus, color: bool) {
    let now = Local::now().format("%H:%M:%S");
    let label = output::status_label(status, color);
    match status {
        BridgeStatus::Offline { message, .. } => println!("{now} bridge {label}: {message}"),
        _ => println!("{now} bridge {label}"),
    }
}

fn describe_event(event: &DeviceEvent) -> String {
    let now = Local::now().format("%H:%M:%S");
    match event {
        DeviceEvent::Status {
            device_label,
            status: DeviceStatus::Online,
        } => format!("{now} {device_label} online"),
        DeviceEvent::Status {
            device_label,
            status: DeviceStatus::Offline { message },
        } => format!("{now} {device_label} offline: {message}"),
        DeviceEvent::State {
            device_label,
            channel,
            state,
        } => format!("{now} {device_label} {channel} = {}", describe_state(state)),
    }
}

fn describe_state(state: &ChannelState) -> String {
    match state {
        ChannelState::Decimal(value) => format!("{value:.1}"),
        ChannelState::Text(text) => text.clone(),
        ChannelState::Timestamp(at) => at.to_rfc3339(),
        ChannelState::Switch(on) => if *on { "ON" } else { "OFF" }.to_owned(),
        ChannelState::Contact(contact) => contact.to_string(),
        ChannelState::Undefined => "UNDEF".to_owned(),
    }
}
