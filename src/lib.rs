//! Drive a serially-linked espresso machine from the command-line (or a home-automation host)!
//!
//! Ristretto talks to the machine's mainboard over a UART link, keeps track of what the machine
//! reports, and exposes it through two facades: a power switch (which can run a rinse cycle on
//! start-up) and a human-readable status text sensor.
//!
//! The [`controller::MachineController`] never blocks: the host calls
//! [`poll`](controller::MachineController::poll) on its own schedule and the controller drains
//! whatever telegrams have arrived, advances any outstanding command sequence and notifies the
//! facades of changes.
//!
//! # Examples
//!
//! Monitor a machine:
//! ```text
//! $ ristretto monitor --port /dev/ttyS0
//! ▐ 💡 Heating...                  º     ∘          ▌
//! ```
//!
//! Power it on (and rinse once it has heated):
//!
//! ```text
//! $ ristretto power on --port /dev/ttyS0
//! Power on requested with cleaning
//! Sent PowerOn
//! ...
//! ```
//!
//! Try it out without any hardware:
//!
//! ```text
//! $ ristretto monitor --simulate
//! ```

pub mod controller;
pub mod display;
pub mod facade;
pub mod link;
pub mod logging;
pub mod operations;
mod prelude;
pub mod protocol;
