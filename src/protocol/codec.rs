use thiserror::Error;

use super::{CommandCode, MachineEnum, StatusCode, Telegram, TelegramKind};

/// The decoded operating state of the appliance.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MachineStatus {
    /// Nothing has been decoded yet.
    Unknown,
    Off,
    Idle,
    Heating,
    Brewing,
    Cleaning,
    Descaling,
    Error(u8),
    /// The controller lost the link. Never produced by the codec.
    LinkDown,
}

impl MachineStatus {
    /// Whether the machine should be considered powered. Only `Off` and a lost link read as off;
    /// intermediate states such as heating or brewing read as on.
    pub fn is_on(&self) -> bool {
        !matches!(self, MachineStatus::Off | MachineStatus::LinkDown)
    }

    /// Whether this status was actually reported by the machine.
    pub fn is_reported(&self) -> bool {
        !matches!(self, MachineStatus::Unknown | MachineStatus::LinkDown)
    }

    /// Whether the machine is powered and settled enough to accept a cleaning request.
    pub fn is_powered_up(&self) -> bool {
        matches!(self, MachineStatus::Idle | MachineStatus::Heating)
    }
}

impl From<(StatusCode, u8)> for MachineStatus {
    fn from((code, argument): (StatusCode, u8)) -> Self {
        match code {
            StatusCode::Off => MachineStatus::Off,
            StatusCode::Idle => MachineStatus::Idle,
            StatusCode::Heating => MachineStatus::Heating,
            StatusCode::Brewing => MachineStatus::Brewing,
            StatusCode::Cleaning => MachineStatus::Cleaning,
            StatusCode::Descaling => MachineStatus::Descaling,
            StatusCode::Error => MachineStatus::Error(argument),
        }
    }
}

/// A request to change machine behaviour.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Command {
    PowerOn,
    PowerOff,
    StartClean,
}

impl Command {
    fn code(&self) -> CommandCode {
        match self {
            Command::PowerOn => CommandCode::PowerOn,
            Command::PowerOff => CommandCode::PowerOff,
            Command::StartClean => CommandCode::StartClean,
        }
    }

    /// A status report that can only follow this command having been carried out, which we accept
    /// in lieu of an explicit ack.
    pub fn is_confirmed_by(&self, status: &MachineStatus) -> bool {
        match self {
            Command::PowerOn => status.is_reported() && status.is_on(),
            Command::PowerOff => *status == MachineStatus::Off,
            Command::StartClean => *status == MachineStatus::Cleaning,
        }
    }
}

impl From<CommandCode> for Command {
    fn from(code: CommandCode) -> Self {
        match code {
            CommandCode::PowerOn => Command::PowerOn,
            CommandCode::PowerOff => Command::PowerOff,
            CommandCode::StartClean => Command::StartClean,
        }
    }
}

/// Anything the machine may send us.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Inbound {
    Status(MachineStatus),
    Ack(Command),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unknown status byte {0:#04x}")]
    Unknown(u8),
    #[error("unknown command byte {0:#04x}")]
    UnknownCommand(u8),
    #[error("unknown telegram kind {0:#04x}")]
    UnknownKind(u8),
    #[error("telegram does not carry a status")]
    NotStatus,
}

/// Encodes a command. Every command has exactly one wire form.
pub fn encode(command: Command) -> Telegram {
    Telegram::new(TelegramKind::Command, command.code().into(), 0)
}

/// Decodes a status telegram.
pub fn decode(telegram: &Telegram) -> Result<MachineStatus, DecodeError> {
    match decode_frame(telegram)? {
        Inbound::Status(status) => Ok(status),
        Inbound::Ack(_) => Err(DecodeError::NotStatus),
    }
}

/// Decodes any telegram the machine may send.
pub fn decode_frame(telegram: &Telegram) -> Result<Inbound, DecodeError> {
    let kind = MachineEnum::<TelegramKind>::decode(telegram.kind_byte())
        .known()
        .map_err(DecodeError::UnknownKind)?;
    match kind {
        TelegramKind::Status => {
            let code = MachineEnum::<StatusCode>::decode(telegram.code())
                .known()
                .map_err(DecodeError::Unknown)?;
            Ok(Inbound::Status((code, telegram.argument()).into()))
        }
        TelegramKind::Ack => {
            let code = MachineEnum::<CommandCode>::decode(telegram.code())
                .known()
                .map_err(DecodeError::UnknownCommand)?;
            Ok(Inbound::Ack(code.into()))
        }
        // Our own commands echoed back are not something we expect to interpret
        TelegramKind::Command => Err(DecodeError::NotStatus),
    }
}

/// Decodes a command telegram, as the machine would see it.
pub fn decode_command(telegram: &Telegram) -> Result<Command, DecodeError> {
    if telegram.kind_byte() != u8::from(TelegramKind::Command) {
        return Err(DecodeError::UnknownKind(telegram.kind_byte()));
    }
    MachineEnum::<CommandCode>::decode(telegram.code())
        .known()
        .map(Command::from)
        .map_err(DecodeError::UnknownCommand)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::protocol::test::*;
    use rstest::*;

    fn telegram(bytes: &[u8]) -> Telegram {
        Telegram::from_frame(bytes).expect("fixture should be a valid frame")
    }

    #[rstest]
    #[case(&STATUS_OFF, MachineStatus::Off)]
    #[case(&STATUS_IDLE, MachineStatus::Idle)]
    #[case(&STATUS_HEATING, MachineStatus::Heating)]
    #[case(&STATUS_BREWING, MachineStatus::Brewing)]
    #[case(&STATUS_CLEANING, MachineStatus::Cleaning)]
    #[case(&STATUS_DESCALING, MachineStatus::Descaling)]
    #[case(&STATUS_ERROR_7, MachineStatus::Error(7))]
    fn real_status_telegrams_decode(#[case] bytes: &[u8], #[case] expected: MachineStatus) {
        assert_eq!(decode(&telegram(bytes)), Ok(expected));
    }

    /// The codec agrees with a direct lookup of the status byte in the table.
    #[rstest]
    fn decode_matches_table_lookup(#[values(0, 1, 2, 3, 4, 5, 9, 0x0e, 0x7f)] code: u8) {
        let t = Telegram::new(TelegramKind::Status, code, 3);
        let expected = match StatusCode::try_from(code) {
            Ok(code) => Ok(MachineStatus::from((code, 3))),
            Err(_) => Err(DecodeError::Unknown(code)),
        };
        assert_eq!(decode(&t), expected);
        // Deterministic
        assert_eq!(decode(&t), decode(&t.clone()));
    }

    #[test]
    fn unknown_status_is_not_guessed() {
        assert_eq!(
            decode(&telegram(&STATUS_UNKNOWN_9)),
            Err(DecodeError::Unknown(9))
        );
    }

    #[rstest]
    #[case(Command::PowerOn, &COMMAND_POWER_ON)]
    #[case(Command::PowerOff, &COMMAND_POWER_OFF)]
    #[case(Command::StartClean, &COMMAND_START_CLEAN)]
    fn commands_encode(#[case] command: Command, #[case] bytes: &[u8]) {
        assert_eq!(encode(command).as_bytes(), bytes);
    }

    #[rstest]
    #[case(Command::PowerOn)]
    #[case(Command::PowerOff)]
    #[case(Command::StartClean)]
    fn machine_side_reads_commands(#[case] command: Command) {
        assert_eq!(decode_command(&encode(command)), Ok(command));
        assert_eq!(decode_frame(&encode(command)), Err(DecodeError::NotStatus));
    }

    #[test]
    fn acks_decode_as_frames_but_not_statuses() {
        assert_eq!(
            decode_frame(&telegram(&ACK_POWER_ON)),
            Ok(Inbound::Ack(Command::PowerOn))
        );
        assert_eq!(decode(&telegram(&ACK_POWER_ON)), Err(DecodeError::NotStatus));
        assert_eq!(
            decode_frame(&Telegram::new(TelegramKind::Ack, 0x33, 0)),
            Err(DecodeError::UnknownCommand(0x33))
        );
    }

    #[test]
    fn unknown_kind() {
        let mut bytes = [0xd5, 0x55, 0x09, 0x01, 0x00, 0, 0];
        let sum = crate::protocol::checksum(&bytes[..5]);
        bytes[5..].copy_from_slice(&sum);
        assert_eq!(
            decode_frame(&telegram(&bytes)),
            Err(DecodeError::UnknownKind(9))
        );
    }

    #[rstest]
    #[case(MachineStatus::Off, false)]
    #[case(MachineStatus::LinkDown, false)]
    #[case(MachineStatus::Unknown, true)]
    #[case(MachineStatus::Idle, true)]
    #[case(MachineStatus::Heating, true)]
    #[case(MachineStatus::Brewing, true)]
    #[case(MachineStatus::Cleaning, true)]
    #[case(MachineStatus::Descaling, true)]
    #[case(MachineStatus::Error(3), true)]
    fn on_mapping(#[case] status: MachineStatus, #[case] on: bool) {
        assert_eq!(status.is_on(), on);
    }

    #[test]
    fn confirmation_statuses() {
        assert!(Command::PowerOn.is_confirmed_by(&MachineStatus::Heating));
        assert!(!Command::PowerOn.is_confirmed_by(&MachineStatus::Off));
        // Reads as on, but the machine hasn't said anything yet
        assert!(!Command::PowerOn.is_confirmed_by(&MachineStatus::Unknown));
        assert!(Command::PowerOff.is_confirmed_by(&MachineStatus::Off));
        assert!(Command::StartClean.is_confirmed_by(&MachineStatus::Cleaning));
        assert!(!Command::StartClean.is_confirmed_by(&MachineStatus::Idle));
    }
}
