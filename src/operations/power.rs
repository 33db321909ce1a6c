use crate::display;
use crate::prelude::*;
use std::time::Instant;

use crate::controller::{ControllerState, MachineController, PowerError};
use crate::facade::PowerSwitch;
use crate::protocol::MachineStatus;

/// Flips the power switch and keeps polling until the resulting command sequence has run its
/// course. Returns the status the machine settled on.
pub async fn power(
    controller: MachineController,
    switch: &PowerSwitch,
    turn_on: bool,
    poll_interval: Duration,
) -> Result<MachineStatus, PowerError> {
    let mut interval = tokio::time::interval(poll_interval);
    let status = await_report(&controller, &mut interval).await;
    // `Unknown` reads as on, so only trust a status the machine actually sent
    if status.is_reported()
        && status.is_on() == turn_on
        && !(turn_on && switch.clean_during_start())
    {
        info!(
            "Machine is already {}, nothing to do",
            if turn_on { "on" } else { "off" }
        );
        return Ok(status);
    }

    if turn_on {
        switch.turn_on()?;
    } else {
        switch.turn_off()?;
    }
    while controller.is_busy() {
        interval.tick().await;
        controller.poll(Instant::now());
        display::display_status(controller.current_status());
    }

    match switch.last_error() {
        Some(e) => Err(e),
        None => Ok(controller.current_status()),
    }
}

/// Polls until the machine reports a status, giving up after the controller's ack timeout or as
/// soon as there is no link to poll.
async fn await_report(
    controller: &MachineController,
    interval: &mut tokio::time::Interval,
) -> MachineStatus {
    let deadline = Instant::now() + controller.config().ack_timeout;
    loop {
        interval.tick().await;
        let now = Instant::now();
        controller.poll(now);
        let status = controller.current_status();
        if status.is_reported()
            || now >= deadline
            || matches!(
                controller.state(),
                ControllerState::Uninitialized | ControllerState::LinkDown
            )
        {
            return status;
        }
    }
}
