use crate::prelude::*;
use std::time::Instant;

use crate::controller::{ControllerState, MachineController, PowerError};
use crate::display::*;
use crate::facade::StatusTextSensor;

/// Polls the controller every `poll_interval`, displaying the machine's status until interrupted
/// or the link goes down.
pub async fn monitor(
    controller: MachineController,
    sensor: StatusTextSensor,
    poll_interval: Duration,
) -> Result<(), PowerError> {
    let mut text = sensor.subscribe();
    let mut interval = tokio::time::interval(poll_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                controller.poll(Instant::now());
                display_status(controller.current_status());
                if controller.state() == ControllerState::LinkDown {
                    return Err(PowerError::LinkDown);
                }
            }
            changed = text.changed() => {
                if changed.is_err() {
                    trace_shutdown!("monitor (sensor dropped)");
                    return Ok(());
                }
                trace_packet!("Status text is now {:?}", *text.borrow_and_update());
            }
            _ = tokio::signal::ctrl_c() => {
                trace_shutdown!("monitor (ctrl-c)");
                return Ok(());
            }
        }
    }
}
