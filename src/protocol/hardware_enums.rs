//! This file contains validated hardware enumerations and associated values. New status bytes
//! observed on the wire are added here, and only here.

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// The kind byte that follows the start marker.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd, IntoPrimitive, TryFromPrimitive, Eq, Hash)]
pub enum TelegramKind {
    /// Machine to host: current operating state.
    Status = 0x00,
    /// Host to machine: a command.
    Command = 0x01,
    /// Machine to host: acknowledgement of a command, echoing its code.
    Ack = 0x02,
}

/// Operating state codes reported by the mainboard.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd, IntoPrimitive, TryFromPrimitive, Eq, Hash)]
pub enum StatusCode {
    Off = 0x00,
    Idle = 0x01,
    Heating = 0x02,
    Brewing = 0x03,
    Cleaning = 0x04,
    Descaling = 0x05,
    /// The argument byte carries the machine's error code.
    Error = 0x0e,
}

/// Command codes accepted by the mainboard.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd, IntoPrimitive, TryFromPrimitive, Eq, Hash)]
pub enum CommandCode {
    PowerOff = 0x00,
    PowerOn = 0x01,
    StartClean = 0x02,
}
