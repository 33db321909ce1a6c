use crate::prelude::*;

use std::sync::{Mutex, PoisonError};
use tokio::sync::watch;

use crate::controller::{MachineController, PowerError};
use crate::protocol::MachineStatus;

/// Power switch reflecting the power state of the coffee machine. Turning it on or off drives the
/// machine through the controller; the published state only ever follows what the machine reports.
pub struct PowerSwitch {
    controller: MachineController,
    shared: Arc<SwitchShared>,
}

/// The part of the switch the controller notifies.
pub(crate) struct SwitchShared {
    clean_during_start: bool,
    state: watch::Sender<bool>,
    last_error: Mutex<Option<PowerError>>,
}

impl PowerSwitch {
    /// Creates a switch. When `clean_during_start` is set, powering on also runs a rinse cycle.
    pub fn new(controller: MachineController, clean_during_start: bool) -> Self {
        let (state, _) = watch::channel(false);
        PowerSwitch {
            controller,
            shared: Arc::new(SwitchShared {
                clean_during_start,
                state,
                last_error: Mutex::new(None),
            }),
        }
    }

    pub(crate) fn shared(&self) -> &Arc<SwitchShared> {
        &self.shared
    }

    pub fn turn_on(&self) -> Result<(), PowerError> {
        let result = self
            .controller
            .request_power(true, self.shared.clean_during_start);
        self.shared.record(&result);
        result
    }

    pub fn turn_off(&self) -> Result<(), PowerError> {
        let result = self.controller.request_power(false, false);
        self.shared.record(&result);
        result
    }

    /// Derived from the controller's current status.
    pub fn is_on(&self) -> bool {
        self.controller.current_status().is_on()
    }

    /// The last state published to the host.
    pub fn state(&self) -> bool {
        *self.shared.state.borrow()
    }

    /// Receives every published state change.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.shared.state.subscribe()
    }

    /// The error from the most recent power request, if it failed.
    pub fn last_error(&self) -> Option<PowerError> {
        self.shared.last_error()
    }

    pub fn clean_during_start(&self) -> bool {
        self.shared.clean_during_start
    }
}

impl SwitchShared {
    fn last_error(&self) -> Option<PowerError> {
        self.last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, result: &Result<(), PowerError>) {
        *self.last_error.lock().unwrap_or_else(PoisonError::into_inner) = result.clone().err();
    }

    pub(crate) fn on_status(&self, status: MachineStatus) {
        let on = status.is_on();
        let changed = self.state.send_if_modified(|state| {
            if *state == on {
                false
            } else {
                *state = on;
                true
            }
        });
        if changed {
            info!("Publishing switch state {}", if on { "ON" } else { "OFF" });
        }
    }

    pub(crate) fn on_sequence_finished(&self, result: &Result<(), PowerError>) {
        self.record(result);
    }
}
