use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::ByteChannel;
use crate::protocol::{decode_command, Command, Telegram};

#[derive(Default)]
struct MockState {
    inbound: VecDeque<Option<Vec<u8>>>,
    written: Vec<Vec<u8>>,
    fail_writes: bool,
}

/// A scripted channel: each read hands out one queued chunk, each write is recorded.
#[derive(Clone, Default)]
pub struct MockChannel {
    state: Arc<Mutex<MockState>>,
}

impl MockChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, bytes: &[u8]) {
        self.state.lock().unwrap().inbound.push_back(Some(bytes.to_vec()));
    }

    /// Queues a read failure.
    pub fn push_error(&self) {
        self.state.lock().unwrap().inbound.push_back(None);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().unwrap().fail_writes = fail;
    }

    pub fn written(&self) -> Vec<Vec<u8>> {
        self.state.lock().unwrap().written.clone()
    }

    /// Decodes each write as the single command it carries.
    pub fn commands(&self) -> Vec<Command> {
        self.written()
            .iter()
            .map(|w| {
                let telegram = Telegram::from_frame(w).expect("one telegram per write");
                decode_command(&telegram).expect("command telegram")
            })
            .collect()
    }
}

impl ByteChannel for MockChannel {
    fn read_available(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self.state.lock().unwrap().inbound.pop_front() {
            None => Ok(0),
            Some(None) => Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "scripted failure",
            )),
            Some(Some(bytes)) => {
                assert!(bytes.len() <= buf.len(), "chunk too large for a single read");
                buf[..bytes.len()].copy_from_slice(&bytes);
                Ok(bytes.len())
            }
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_writes {
            return Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "scripted failure",
            ));
        }
        state.written.push(bytes.to_vec());
        Ok(())
    }
}
