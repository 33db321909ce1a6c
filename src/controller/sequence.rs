use crate::prelude::*;

use std::collections::VecDeque;
use std::time::Instant;

use super::{ControllerConfig, PowerError};
use crate::protocol::{Command, MachineStatus};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Stage {
    Send(Command),
    /// Hold until the machine reports it is powered up.
    AwaitPowerUp,
}

/// What the sequence is doing right now.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum InFlight {
    /// Ready to go out on the next opportunity. `attempt` counts earlier transmissions.
    Transmit { command: Command, attempt: u32 },
    AwaitingAck {
        command: Command,
        deadline: Instant,
        attempt: u32,
    },
    AwaitingPowerUp { deadline: Instant },
}

/// The next thing the controller must do on behalf of a sequence.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Step {
    Transmit(Command),
    Wait,
    Done(Result<(), PowerError>),
}

/// An ordered, bounded set of commands accomplishing one power operation.
#[derive(Debug)]
pub(crate) struct CommandSequence {
    stages: VecDeque<Stage>,
    current: Option<InFlight>,
}

impl CommandSequence {
    pub fn power(on: bool, clean: bool) -> Self {
        let stages = match (on, clean) {
            (true, true) => vec![
                Stage::Send(Command::PowerOn),
                Stage::AwaitPowerUp,
                Stage::Send(Command::StartClean),
            ],
            (true, false) => vec![Stage::Send(Command::PowerOn)],
            (false, _) => vec![Stage::Send(Command::PowerOff)],
        };
        CommandSequence {
            stages: stages.into(),
            current: None,
        }
    }

    pub fn current(&self) -> Option<InFlight> {
        self.current
    }

    /// Records an ack. Returns false if we weren't waiting for one for this command.
    pub fn acknowledge(&mut self, command: Command) -> bool {
        match self.current {
            Some(InFlight::AwaitingAck { command: c, .. }) if c == command => {
                self.current = None;
                true
            }
            _ => false,
        }
    }

    /// Marks the pending transmission as sent.
    pub fn transmitted(&mut self, now: Instant, config: &ControllerConfig) {
        if let Some(InFlight::Transmit { command, attempt }) = self.current {
            self.current = Some(InFlight::AwaitingAck {
                command,
                deadline: now + config.ack_timeout,
                attempt: attempt + 1,
            });
        }
    }

    /// Advances through every stage that can complete given the current status and time.
    pub fn step(
        &mut self,
        status: &MachineStatus,
        now: Instant,
        config: &ControllerConfig,
    ) -> Step {
        loop {
            match self.current {
                None => match self.stages.pop_front() {
                    None => return Step::Done(Ok(())),
                    Some(Stage::Send(command)) => {
                        self.current = Some(InFlight::Transmit {
                            command,
                            attempt: 0,
                        })
                    }
                    Some(Stage::AwaitPowerUp) => {
                        self.current = Some(InFlight::AwaitingPowerUp {
                            deadline: now + config.confirm_timeout,
                        })
                    }
                },
                Some(InFlight::Transmit { command, .. }) => return Step::Transmit(command),
                Some(InFlight::AwaitingAck {
                    command,
                    deadline,
                    attempt,
                }) => {
                    if command.is_confirmed_by(status) {
                        self.current = None;
                    } else if now < deadline {
                        return Step::Wait;
                    } else if attempt < config.command_attempts {
                        warning!("No ack for {:?}, retransmitting (attempt {})", command, attempt + 1);
                        self.current = Some(InFlight::Transmit { command, attempt });
                    } else {
                        warning!("No ack for {:?} after {} attempt(s)", command, attempt);
                        return Step::Done(Err(PowerError::Timeout));
                    }
                }
                Some(InFlight::AwaitingPowerUp { deadline }) => {
                    if status.is_powered_up() {
                        self.current = None;
                    } else if now < deadline {
                        return Step::Wait;
                    } else {
                        warning!("Machine did not power up in time, skipping the remaining steps");
                        return Step::Done(Err(PowerError::Timeout));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn config() -> ControllerConfig {
        ControllerConfig::default()
    }

    #[test]
    fn power_off_is_a_single_command() {
        let now = Instant::now();
        let mut seq = CommandSequence::power(false, true);
        assert_eq!(seq.step(&MachineStatus::Idle, now, &config()), Step::Transmit(Command::PowerOff));
        seq.transmitted(now, &config());
        assert_eq!(seq.step(&MachineStatus::Idle, now, &config()), Step::Wait);
        assert!(seq.acknowledge(Command::PowerOff));
        assert_eq!(seq.step(&MachineStatus::Idle, now, &config()), Step::Done(Ok(())));
    }

    #[test]
    fn clean_waits_for_power_up() {
        let now = Instant::now();
        let mut seq = CommandSequence::power(true, true);
        assert_eq!(seq.step(&MachineStatus::Off, now, &config()), Step::Transmit(Command::PowerOn));
        seq.transmitted(now, &config());
        assert!(!seq.acknowledge(Command::StartClean));
        assert!(seq.acknowledge(Command::PowerOn));
        assert_eq!(seq.step(&MachineStatus::Off, now, &config()), Step::Wait);
        assert_eq!(
            seq.current(),
            Some(InFlight::AwaitingPowerUp {
                deadline: now + config().confirm_timeout
            })
        );
        assert_eq!(
            seq.step(&MachineStatus::Idle, now, &config()),
            Step::Transmit(Command::StartClean)
        );
    }

    #[test]
    fn power_up_timeout_skips_clean() {
        let now = Instant::now();
        let mut seq = CommandSequence::power(true, true);
        seq.step(&MachineStatus::Off, now, &config());
        seq.transmitted(now, &config());
        seq.acknowledge(Command::PowerOn);
        assert_eq!(seq.step(&MachineStatus::Off, now, &config()), Step::Wait);
        let later = now + config().confirm_timeout;
        assert_eq!(
            seq.step(&MachineStatus::Off, later, &config()),
            Step::Done(Err(PowerError::Timeout))
        );
    }

    #[test]
    fn status_stands_in_for_ack() {
        let now = Instant::now();
        let mut seq = CommandSequence::power(true, false);
        seq.step(&MachineStatus::Off, now, &config());
        seq.transmitted(now, &config());
        assert_eq!(seq.step(&MachineStatus::Heating, now, &config()), Step::Done(Ok(())));
    }

    #[test]
    fn bounded_retransmission() {
        let config = ControllerConfig {
            command_attempts: 2,
            ..Default::default()
        };
        let mut now = Instant::now();
        let mut seq = CommandSequence::power(true, false);
        let mut transmissions = 0;
        let result = loop {
            match seq.step(&MachineStatus::Off, now, &config) {
                Step::Transmit(_) => {
                    transmissions += 1;
                    seq.transmitted(now, &config);
                }
                Step::Wait => now += config.ack_timeout,
                Step::Done(result) => break result,
            }
        };
        assert_eq!(transmissions, 2);
        assert_eq!(result, Err(PowerError::Timeout));
    }
}
