use crate::prelude::*;

use serialport::{DataBits, Parity, SerialPort, StopBits};
use std::io::{ErrorKind, Read, Write};

use super::{ByteChannel, LinkError, LinkTransport};

/// The mainboard and display talk 8N1 at this rate.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// A [`ByteChannel`] over a serial port.
pub struct SerialChannel {
    port: Box<dyn SerialPort>,
}

impl SerialChannel {
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        SerialChannel { port }
    }
}

impl ByteChannel for SerialChannel {
    fn read_available(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let pending = self.port.bytes_to_read()? as usize;
        if pending == 0 {
            return Ok(0);
        }
        let want = pending.min(buf.len());
        match self.port.read(&mut buf[..want]) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock => {
                Ok(0)
            }
            Err(e) => Err(e),
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.port.write_all(bytes)?;
        self.port.flush()
    }
}

/// Opens the serial port connected to the mainboard.
pub fn open_serial(path: &str, baud_rate: u32) -> Result<LinkTransport<SerialChannel>, LinkError> {
    let port = serialport::new(path, baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .timeout(Duration::from_millis(10))
        .open()?;
    info!("Opened {} at {} baud", path, baud_rate);
    Ok(LinkTransport::new(SerialChannel::new(port)))
}
