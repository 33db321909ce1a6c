//! Machine operations driven from the command-line: monitoring and power control.

mod monitor;
mod power;

pub use monitor::*;
pub use power::*;
