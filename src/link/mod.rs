//! The byte-level link to the machine's mainboard.
use crate::prelude::*;

use thiserror::Error;

mod framer;
#[cfg(test)]
pub(crate) mod mock;
mod serial;
mod simulate;

pub use framer::Framer;
pub use serial::{open_serial, SerialChannel, DEFAULT_BAUD_RATE};
pub use simulate::SimulatedMachine;

use crate::protocol::{hexdump, Telegram};

#[derive(Error, Debug)]
pub enum LinkError {
    /// A frame failed its checksum. Only that frame was discarded.
    #[error("corrupt telegram {0}")]
    Corrupt(String),
    #[error("link closed")]
    Closed,
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    #[error(transparent)]
    SerialError(#[from] serialport::Error),
}

/// Raw access to a physical (or simulated) channel.
pub trait ByteChannel: Send {
    /// Copies whatever bytes are already buffered into `buf` without blocking, returning how many
    /// were copied. Zero means nothing is pending.
    fn read_available(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;

    /// Writes every byte to the channel.
    fn write_all(&mut self, bytes: &[u8]) -> std::io::Result<()>;
}

/// Telegram-level access to the machine. Must never block the caller.
pub trait Transport: Send {
    fn send(&mut self, bytes: &[u8]) -> Result<(), LinkError>;

    /// Returns the next complete telegram, or `None` if one isn't buffered yet.
    fn try_receive(&mut self) -> Result<Option<Telegram>, LinkError>;
}

/// Frames the raw bytes of a [`ByteChannel`] into telegrams.
pub struct LinkTransport<C: ByteChannel> {
    channel: C,
    framer: Framer,
}

impl<C: ByteChannel> LinkTransport<C> {
    pub fn new(channel: C) -> Self {
        LinkTransport {
            channel,
            framer: Framer::new(),
        }
    }

    fn next_frame(&mut self) -> Result<Option<Telegram>, LinkError> {
        match self.framer.next_frame() {
            None => Ok(None),
            Some(Ok(telegram)) => Ok(Some(telegram)),
            Some(Err(frame)) => Err(LinkError::Corrupt(hexdump(&frame))),
        }
    }
}

impl<C: ByteChannel> Transport for LinkTransport<C> {
    fn send(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        trace_packet!("{{host->device}} {}", hexdump(bytes));
        self.channel.write_all(bytes)?;
        Ok(())
    }

    fn try_receive(&mut self) -> Result<Option<Telegram>, LinkError> {
        if let Some(telegram) = self.next_frame()? {
            return Ok(Some(telegram));
        }
        let mut chunk = [0; 64];
        let n = self.channel.read_available(&mut chunk)?;
        if n == 0 {
            return Ok(None);
        }
        trace_packet!("{{device->host}} {}", hexdump(&chunk[..n]));
        self.framer.accumulate(&chunk[..n]);
        self.next_frame()
    }
}
