//! The machine controller: sole owner of the link, keeper of the current status, and sequencer of
//! power commands.
use crate::prelude::*;

use std::sync::{Mutex, MutexGuard, PoisonError, Weak};
use std::time::Instant;
use thiserror::Error;

mod config;
mod sequence;

pub use config::ControllerConfig;
use sequence::{CommandSequence, InFlight, Step};

use crate::facade::{PowerSwitch, SensorShared, StatusTextSensor, SwitchShared};
use crate::link::{LinkError, Transport};
use crate::protocol::{decode_frame, encode, Command, Inbound, MachineStatus, Telegram};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ControllerState {
    /// No transport has been opened yet.
    Uninitialized,
    Polling,
    /// A command sequence has a command waiting to go out.
    SendingCommand,
    /// A command sequence is waiting on the machine.
    AwaitingAck,
    /// Too many consecutive link failures. Only re-opening the transport recovers.
    LinkDown,
}

/// Failures surfaced to whoever asked for a power change.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PowerError {
    #[error("a command sequence is already in flight")]
    Busy,
    #[error("timed out waiting for the machine")]
    Timeout,
    #[error("link to the machine is down")]
    LinkDown,
    #[error("link to the machine has not been opened")]
    NotOpen,
    #[error("failed to send command")]
    SendFailed,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("a different power switch is already registered")]
    SwitchAlreadyRegistered,
}

/// Counters kept for diagnostics only.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Diagnostics {
    /// Frames dropped for failing their checksum.
    pub corrupt_frames: u64,
    /// Well-framed telegrams we could not interpret.
    pub unknown_telegrams: u64,
    pub link_failures: u64,
    pub commands_sent: u64,
}

/// The closed set of things the controller notifies. Held weakly: facades belong to the host.
enum Subscriber {
    PowerSwitch(Weak<SwitchShared>),
    StatusSensor(Weak<SensorShared>),
}

enum Notification<'a> {
    Status(MachineStatus),
    SequenceFinished(&'a Result<(), PowerError>),
}

impl Subscriber {
    /// Delivers a notification, returning false if the subscriber is gone.
    fn deliver(&self, notification: &Notification) -> bool {
        match self {
            Subscriber::PowerSwitch(switch) => {
                let Some(switch) = switch.upgrade() else {
                    return false;
                };
                match notification {
                    Notification::Status(status) => switch.on_status(*status),
                    Notification::SequenceFinished(result) => switch.on_sequence_finished(result),
                }
            }
            Subscriber::StatusSensor(sensor) => {
                let Some(sensor) = sensor.upgrade() else {
                    return false;
                };
                if let Notification::Status(status) = notification {
                    sensor.refresh(*status);
                }
            }
        }
        true
    }
}

/// Handle to the controller. Clones share the same link and state.
#[derive(Clone)]
pub struct MachineController {
    inner: Arc<Mutex<ControllerInner>>,
}

struct ControllerInner {
    config: ControllerConfig,
    transport: Option<Box<dyn Transport>>,
    link_down: bool,
    status: MachineStatus,
    /// Depth-one command queue: at most one sequence is ever outstanding.
    sequence: Option<CommandSequence>,
    consecutive_failures: u32,
    diagnostics: Diagnostics,
    /// In registration order.
    subscribers: Vec<Subscriber>,
}

impl MachineController {
    pub fn new(config: ControllerConfig) -> Self {
        MachineController {
            inner: Arc::new(Mutex::new(ControllerInner {
                config,
                transport: None,
                link_down: false,
                status: MachineStatus::Unknown,
                sequence: None,
                consecutive_failures: 0,
                diagnostics: Diagnostics::default(),
                subscribers: vec![],
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ControllerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hands the controller its transport. Also the only way out of [`ControllerState::LinkDown`].
    pub fn open(&self, transport: Box<dyn Transport>) {
        self.lock().open(transport)
    }

    /// Drains buffered telegrams, updates the status, notifies facades of changes and advances any
    /// command sequence. Never blocks.
    pub fn poll(&self, now: Instant) {
        self.lock().poll(now)
    }

    /// Queues a power change. `clean` is only meaningful when powering on.
    pub fn request_power(&self, on: bool, clean: bool) -> Result<(), PowerError> {
        self.lock().request_power(on, clean)
    }

    /// The last successfully decoded status.
    pub fn current_status(&self) -> MachineStatus {
        self.lock().status
    }

    pub fn state(&self) -> ControllerState {
        self.lock().state()
    }

    /// Whether a command sequence is outstanding.
    pub fn is_busy(&self) -> bool {
        self.lock().sequence.is_some()
    }

    pub fn diagnostics(&self) -> Diagnostics {
        self.lock().diagnostics
    }

    pub fn config(&self) -> ControllerConfig {
        self.lock().config.clone()
    }

    /// Registers the power switch. Registering the same switch again is a no-op.
    pub fn register_power_switch(&self, switch: &PowerSwitch) -> Result<(), RegistrationError> {
        let shared = switch.shared();
        let mut inner = self.lock();
        for subscriber in &inner.subscribers {
            if let Subscriber::PowerSwitch(existing) = subscriber {
                if existing.as_ptr() == Arc::as_ptr(shared) {
                    return Ok(());
                }
                if existing.strong_count() > 0 {
                    return Err(RegistrationError::SwitchAlreadyRegistered);
                }
            }
        }
        inner
            .subscribers
            .push(Subscriber::PowerSwitch(Arc::downgrade(shared)));
        Ok(())
    }

    /// Registers a status sensor. Registering the same sensor again is a no-op.
    pub fn add_status_sensor(&self, sensor: &StatusTextSensor) {
        let shared = sensor.shared();
        let mut inner = self.lock();
        let registered = inner.subscribers.iter().any(|s| {
            matches!(s, Subscriber::StatusSensor(existing) if existing.as_ptr() == Arc::as_ptr(shared))
        });
        if !registered {
            inner
                .subscribers
                .push(Subscriber::StatusSensor(Arc::downgrade(shared)));
        }
    }
}

impl ControllerInner {
    fn state(&self) -> ControllerState {
        if self.link_down {
            return ControllerState::LinkDown;
        }
        if self.transport.is_none() {
            return ControllerState::Uninitialized;
        }
        match self.sequence.as_ref().map(CommandSequence::current) {
            None => ControllerState::Polling,
            Some(None) | Some(Some(InFlight::Transmit { .. })) => ControllerState::SendingCommand,
            Some(Some(_)) => ControllerState::AwaitingAck,
        }
    }

    fn open(&mut self, transport: Box<dyn Transport>) {
        info!("Opening link with {:?}", self.config);
        self.transport = Some(transport);
        self.link_down = false;
        self.consecutive_failures = 0;
        self.set_status(MachineStatus::Unknown);
    }

    fn request_power(&mut self, on: bool, clean: bool) -> Result<(), PowerError> {
        if self.link_down {
            return Err(PowerError::LinkDown);
        }
        if self.transport.is_none() {
            return Err(PowerError::NotOpen);
        }
        if self.sequence.is_some() {
            warning!("Rejecting power request, a command sequence is already in flight");
            return Err(PowerError::Busy);
        }
        info!(
            "Power {} requested{}",
            if on { "on" } else { "off" },
            if on && clean { " with cleaning" } else { "" }
        );
        self.sequence = Some(CommandSequence::power(on, clean));
        Ok(())
    }

    fn poll(&mut self, now: Instant) {
        for _ in 0..self.config.max_telegrams_per_poll {
            if self.link_down {
                return;
            }
            let received = match self.transport.as_mut() {
                Some(transport) => transport.try_receive(),
                None => return,
            };
            match received {
                Ok(None) => {
                    self.consecutive_failures = 0;
                    break;
                }
                Ok(Some(telegram)) => {
                    self.consecutive_failures = 0;
                    self.handle_telegram(&telegram, now);
                }
                Err(LinkError::Corrupt(frame)) => {
                    self.diagnostics.corrupt_frames += 1;
                    warning!("Dropped corrupt telegram {}", frame);
                }
                Err(e) => {
                    self.link_failure(e);
                    break;
                }
            }
        }
        if !self.link_down {
            self.advance_sequence(now);
        }
    }

    fn handle_telegram(&mut self, telegram: &Telegram, now: Instant) {
        match decode_frame(telegram) {
            Err(e) => {
                self.diagnostics.unknown_telegrams += 1;
                warning!("Ignoring telegram {:?}: {}", telegram, e);
            }
            Ok(Inbound::Ack(command)) => {
                let expected = self
                    .sequence
                    .as_mut()
                    .map_or(false, |sequence| sequence.acknowledge(command));
                if expected {
                    trace_packet!("Ack for {:?}", command);
                    self.advance_sequence(now);
                } else {
                    trace_packet!("Unsolicited ack for {:?}", command);
                }
            }
            Ok(Inbound::Status(status)) => {
                if status == self.status {
                    return;
                }
                info!("Machine status {:?} -> {:?}", self.status, status);
                self.status = status;
                // Let the sequence react before anyone hears about the new status
                self.advance_sequence(now);
                if !self.link_down {
                    self.notify(Notification::Status(status));
                }
            }
        }
    }

    fn advance_sequence(&mut self, now: Instant) {
        let Some(mut sequence) = self.sequence.take() else {
            return;
        };
        let result = loop {
            match sequence.step(&self.status, now, &self.config) {
                Step::Wait => {
                    self.sequence = Some(sequence);
                    return;
                }
                Step::Done(result) => break result,
                Step::Transmit(command) => match self.transmit(command) {
                    Ok(()) => sequence.transmitted(now, &self.config),
                    Err(e) => {
                        warning!("Failed to send {:?}", command);
                        self.link_failure(e);
                        break Err(if self.link_down {
                            PowerError::LinkDown
                        } else {
                            PowerError::SendFailed
                        });
                    }
                },
            }
        };
        self.finish_sequence(result);
    }

    fn transmit(&mut self, command: Command) -> Result<(), LinkError> {
        let telegram = encode(command);
        let bytes = telegram.as_bytes().repeat(self.config.command_repeats.max(1));
        let transport = self.transport.as_mut().ok_or(LinkError::Closed)?;
        transport.send(&bytes)?;
        self.consecutive_failures = 0;
        self.diagnostics.commands_sent += 1;
        info!("Sent {:?}", command);
        Ok(())
    }

    fn finish_sequence(&mut self, result: Result<(), PowerError>) {
        match &result {
            Ok(()) => info!("Command sequence complete"),
            Err(e) => warning!("Command sequence failed: {}", e),
        }
        self.notify(Notification::SequenceFinished(&result));
    }

    fn link_failure(&mut self, error: LinkError) {
        self.diagnostics.link_failures += 1;
        self.consecutive_failures += 1;
        warning!(
            "Link error ({} consecutive): {}",
            self.consecutive_failures,
            error
        );
        if self.consecutive_failures >= self.config.link_failure_threshold {
            self.enter_link_down();
        }
    }

    fn enter_link_down(&mut self) {
        error!("Link is down until it is re-opened");
        self.link_down = true;
        self.transport = None;
        if self.sequence.take().is_some() {
            self.finish_sequence(Err(PowerError::LinkDown));
        }
        self.set_status(MachineStatus::LinkDown);
    }

    fn set_status(&mut self, status: MachineStatus) {
        if status != self.status {
            self.status = status;
            self.notify(Notification::Status(status));
        }
    }

    /// Delivers in registration order, forgetting subscribers that have gone away.
    fn notify(&mut self, notification: Notification) {
        self.subscribers
            .retain(|subscriber| subscriber.deliver(&notification));
    }
}
