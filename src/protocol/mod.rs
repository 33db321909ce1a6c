//! Protocols for communication with the espresso machine's mainboard.

mod codec;
mod hardware_enums;
mod machine_enum;
mod telegram;

pub use codec::*;
pub use hardware_enums::*;
pub use machine_enum::*;
pub use telegram::*;
