use crate::prelude::*;

/// Tuning for the [`super::MachineController`]. Every wait the controller performs is bounded by
/// one of these.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Upper bound on telegrams drained by a single `poll`.
    pub max_telegrams_per_poll: usize,
    /// Consecutive I/O failures tolerated before the link is declared down.
    pub link_failure_threshold: u32,
    /// How long a transmitted command may go without an ack.
    pub ack_timeout: Duration,
    /// How long to wait for the machine to report it has powered up before cleaning.
    pub confirm_timeout: Duration,
    /// Transmissions of a single command before giving up on its ack.
    pub command_attempts: u32,
    /// Copies of the telegram written back-to-back on each transmission. The stock display board
    /// sends six copies of every power message; a single copy is the default here because a
    /// confirming status already stands in for a lost ack. Set this to 6 to match the board.
    pub command_repeats: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig {
            max_telegrams_per_poll: 8,
            link_failure_threshold: 5,
            ack_timeout: Duration::from_secs(2),
            confirm_timeout: Duration::from_secs(30),
            command_attempts: 1,
            command_repeats: 1,
        }
    }
}
