use crate::prelude::*;

use crate::protocol::{hexdump, Telegram, START_MARKER, TELEGRAM_LEN};

/// Upper bound on buffered, unframed bytes. A healthy link never gets close to this.
const MAX_BUFFERED: usize = 256;

/// Builds telegrams from arbitrarily-chunked bytes.
///
/// Bytes before a start marker are discarded. Once a marker and a full telegram's worth of bytes
/// are available the checksum is verified: a good frame is emitted, while a bad one is reported
/// and only its start marker is dropped, so that a genuine telegram hiding inside the corrupt
/// span is still found on the next scan.
#[derive(Default)]
pub struct Framer {
    buffer: Vec<u8>,
}

impl Framer {
    pub fn new() -> Self {
        Framer::default()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Appends a chunk of raw bytes from the wire.
    pub fn accumulate(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
        if self.buffer.len() > MAX_BUFFERED {
            let excess = self.buffer.len() - MAX_BUFFERED;
            warning!("Receive buffer overflow, dropping {} bytes", excess);
            self.buffer.drain(..excess);
        }
    }

    /// Pulls the next frame out of the buffer. `Some(Err(frame))` carries the bytes of a frame
    /// that failed its checksum.
    pub fn next_frame(&mut self) -> Option<Result<Telegram, Vec<u8>>> {
        let start = match find_marker(&self.buffer) {
            Some(start) => start,
            None => {
                // Hang on to a trailing first marker byte, the rest of the marker may follow
                let keep = usize::from(self.buffer.last() == Some(&START_MARKER[0]));
                let discard = self.buffer.len() - keep;
                if discard > 0 {
                    trace_packet!("Discarding {}", hexdump(&self.buffer[..discard]));
                    self.buffer.drain(..discard);
                }
                return None;
            }
        };

        if start > 0 {
            trace_packet!("Discarding {}", hexdump(&self.buffer[..start]));
            self.buffer.drain(..start);
        }

        if self.buffer.len() < TELEGRAM_LEN {
            return None;
        }

        match Telegram::from_frame(&self.buffer[..TELEGRAM_LEN]) {
            Some(telegram) => {
                self.buffer.drain(..TELEGRAM_LEN);
                Some(Ok(telegram))
            }
            None => {
                let frame = self.buffer[..TELEGRAM_LEN].to_vec();
                self.buffer.drain(..1);
                Some(Err(frame))
            }
        }
    }
}

fn find_marker(buffer: &[u8]) -> Option<usize> {
    buffer.windows(START_MARKER.len()).position(|w| w == START_MARKER)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::protocol::test::*;
    use rstest::*;

    fn frames(framer: &mut Framer) -> Vec<Result<Telegram, Vec<u8>>> {
        std::iter::from_fn(|| framer.next_frame()).collect()
    }

    #[rstest]
    #[case(&STATUS_IDLE)]
    #[case(&STATUS_ERROR_7)]
    #[case(&ACK_START_CLEAN)]
    fn exact_telegram(#[case] bytes: &[u8]) {
        let mut framer = Framer::new();
        framer.accumulate(bytes);
        let telegram = framer.next_frame().expect("frame").expect("valid");
        assert_eq!(telegram.as_bytes(), bytes);
        assert!(framer.is_empty());
    }

    /// Ensure that we frame this telegram correctly regardless of how it is chunked, and with or
    /// without garbage before/after.
    #[rstest]
    fn chunked_telegram(
        #[values(true, false)] garbage_before: bool,
        #[values(true, false)] garbage_after: bool,
    ) {
        let mut bytes = STATUS_HEATING.to_vec();
        if garbage_before {
            bytes.splice(0..0, [1, 2, 0xd5, 3]);
        }
        if garbage_after {
            bytes.extend_from_slice(&[1, 2, 3]);
        }
        for i in 0..bytes.len() {
            let mut framer = Framer::new();
            framer.accumulate(&bytes[..i]);
            let early = frames(&mut framer);
            framer.accumulate(&bytes[i..]);
            let late = frames(&mut framer);
            let all: Vec<_> = early.into_iter().chain(late).collect();
            assert_eq!(all.len(), 1, "split at {}", i);
            assert_eq!(all[0].as_ref().expect("valid").as_bytes(), STATUS_HEATING);
        }
    }

    #[test]
    fn corrupt_frame_preserves_following_telegram() {
        let mut corrupt = STATUS_OFF;
        corrupt[5] ^= 0x01;
        let mut framer = Framer::new();
        framer.accumulate(&corrupt);
        framer.accumulate(&STATUS_BREWING);

        assert_eq!(framer.next_frame(), Some(Err(corrupt.to_vec())));
        assert_eq!(
            framer.next_frame(),
            Some(Ok(Telegram::from_frame(&STATUS_BREWING).expect("valid")))
        );
        assert_eq!(framer.next_frame(), None);
        assert!(framer.is_empty());
    }

    #[test]
    fn resynchronises_inside_truncated_frame() {
        // A telegram cut short by a fresh one: the stale marker fails the checksum, and the
        // scan picks up the complete telegram that follows.
        let mut framer = Framer::new();
        framer.accumulate(&STATUS_IDLE[..4]);
        framer.accumulate(&STATUS_CLEANING);
        assert!(matches!(framer.next_frame(), Some(Err(_))));
        assert_eq!(
            framer.next_frame(),
            Some(Ok(Telegram::from_frame(&STATUS_CLEANING).expect("valid")))
        );
    }

    #[test]
    fn buffer_is_bounded() {
        let mut framer = Framer::new();
        framer.accumulate(&[0xd5, 0x55]);
        framer.accumulate(&[0; 1024]);
        assert!(framer.buffer.len() <= MAX_BUFFERED);
    }
}
