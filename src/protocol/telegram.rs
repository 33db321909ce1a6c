use crc::Crc;
use std::fmt::Debug;

use super::TelegramKind;

/// Every telegram, in either direction, opens with this two-byte marker.
pub const START_MARKER: [u8; 2] = [0xd5, 0x55];
/// Marker, kind, code, argument and a two-byte checksum.
pub const TELEGRAM_LEN: usize = 7;
const CHECKSUM_OFFSET: usize = TELEGRAM_LEN - 2;

#[derive(Clone, Eq, PartialEq)]
/// A fixed-length, checksummed telegram. Construction guarantees the framing is valid, so the
/// codec only ever has to interpret the contents.
pub struct Telegram {
    bytes: [u8; TELEGRAM_LEN],
}

impl Debug for Telegram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&hexdump(&self.bytes))
    }
}

impl Telegram {
    /// Builds an outbound telegram, computing the checksum.
    pub fn new(kind: TelegramKind, code: u8, argument: u8) -> Self {
        let mut bytes = [0; TELEGRAM_LEN];
        bytes[..2].copy_from_slice(&START_MARKER);
        bytes[2] = kind.into();
        bytes[3] = code;
        bytes[4] = argument;
        let sum = checksum(&bytes[..CHECKSUM_OFFSET]);
        bytes[CHECKSUM_OFFSET..].copy_from_slice(&sum);
        Telegram { bytes }
    }

    /// Validates the marker and checksum of a candidate frame. Returns `None` if either is wrong.
    pub fn from_frame(frame: &[u8]) -> Option<Self> {
        let bytes: [u8; TELEGRAM_LEN] = frame.try_into().ok()?;
        if bytes[..2] != START_MARKER {
            return None;
        }
        if bytes[CHECKSUM_OFFSET..] != checksum(&bytes[..CHECKSUM_OFFSET]) {
            return None;
        }
        Some(Telegram { bytes })
    }

    pub fn kind_byte(&self) -> u8 {
        self.bytes[2]
    }

    pub fn code(&self) -> u8 {
        self.bytes[3]
    }

    pub fn argument(&self) -> u8 {
        self.bytes[4]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn stringify(&self) -> String {
        hex::encode(self.bytes)
    }
}

impl AsRef<[u8]> for Telegram {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

pub const CRC_ALGO: Crc<u16> = Crc::<u16>::new(&crc::CRC_16_SPI_FUJITSU);

/// Computes the checksum over the marker and body. Note that the checksum used here is
/// equivalent to the `CRC_16_SPI_FUJITSU` definition (initial 0x1d0f, poly 0x1021).
pub fn checksum(buffer: &[u8]) -> [u8; 2] {
    CRC_ALGO.checksum(buffer).to_be_bytes()
}

/// Dumps a buffer to a readable hex form.
pub fn hexdump(buffer: &[u8]) -> String {
    let maybe_space = |i| if i > 0 && i % 8 == 0 { " " } else { "" };
    let s1: String = buffer
        .iter()
        .enumerate()
        .map(|(i, b)| format!("{}{:02x}", maybe_space(i), b))
        .collect::<String>();
    let s2: String = buffer
        .iter()
        .map(|b| {
            if *b >= 32 && *b < 127 {
                *b as char
            } else {
                '.'
            }
        })
        .collect::<String>();
    format!("|{}| |{}|", s1, s2)
}

#[cfg(test)]
pub mod test {
    use super::*;
    use crate::protocol::test::*;
    use rstest::*;

    pub fn from_hex_str(s: &str) -> Vec<u8> {
        hex::decode(s.replace(' ', "")).unwrap()
    }

    #[test]
    pub fn test_checksum() {
        assert_eq!(checksum(&from_hex_str("0d 07 84 0f 02 01")), [0x55, 0x12]);
        assert_eq!(checksum(&from_hex_str("d5 55 00 01 00")), [0x1f, 0x34]);
        assert_eq!(checksum(&from_hex_str("d5 55 01 01 00")), [0x28, 0x04]);
    }

    #[rstest]
    #[case(TelegramKind::Command, 0x01, 0, &COMMAND_POWER_ON)]
    #[case(TelegramKind::Command, 0x02, 0, &COMMAND_START_CLEAN)]
    #[case(TelegramKind::Status, 0x0e, 7, &STATUS_ERROR_7)]
    fn builds_expected_bytes(
        #[case] kind: TelegramKind,
        #[case] code: u8,
        #[case] argument: u8,
        #[case] bytes: &[u8],
    ) {
        assert_eq!(Telegram::new(kind, code, argument).as_bytes(), bytes);
    }

    #[rstest]
    #[case(&STATUS_IDLE)]
    #[case(&STATUS_ERROR_7)]
    #[case(&ACK_POWER_ON)]
    fn accepts_valid_frames(#[case] bytes: &[u8]) {
        let telegram = Telegram::from_frame(bytes).expect("valid frame");
        assert_eq!(telegram.as_bytes(), bytes);
    }

    #[test]
    fn rejects_bad_checksum_marker_and_length() {
        let mut corrupt = STATUS_IDLE;
        corrupt[6] ^= 0xff;
        assert_eq!(Telegram::from_frame(&corrupt), None);

        let mut bad_marker = STATUS_IDLE;
        bad_marker[1] = 0x56;
        assert_eq!(Telegram::from_frame(&bad_marker), None);

        assert_eq!(Telegram::from_frame(&STATUS_IDLE[..6]), None);
    }

    #[test]
    fn dumps_hex() {
        assert_eq!(
            Telegram::new(TelegramKind::Status, 1, 0).stringify(),
            "d5550001001f34"
        );
        assert_eq!(hexdump(&[0x41, 0x00]), "|4100| |A.|");
    }
}
