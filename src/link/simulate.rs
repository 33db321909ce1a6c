use crate::prelude::*;

use std::collections::VecDeque;
use std::time::Instant;

use super::{ByteChannel, Framer};
use crate::protocol::{
    decode_command, encode, Command, MachineStatus, StatusCode, Telegram, TelegramKind,
};

/// Status reports spent heating after power on.
const HEATING_REPORTS: u32 = 4;
/// Status reports spent rinsing after a clean request.
const CLEANING_REPORTS: u32 = 6;

/// A [`ByteChannel`] that behaves like a mainboard: it acks commands, reports its status every
/// `report_interval`, heats up after being turned on and rinses when asked to clean.
pub struct SimulatedMachine {
    status: MachineStatus,
    remaining: u32,
    outbox: VecDeque<u8>,
    framer: Framer,
    report_interval: Duration,
    last_report: Option<Instant>,
}

impl SimulatedMachine {
    pub fn new(report_interval: Duration) -> Self {
        SimulatedMachine {
            status: MachineStatus::Off,
            remaining: 0,
            outbox: VecDeque::new(),
            framer: Framer::new(),
            report_interval,
            last_report: None,
        }
    }

    fn queue(&mut self, telegram: Telegram) {
        self.outbox.extend(telegram.as_bytes());
    }

    fn handle_command(&mut self, command: Command) {
        trace_packet!("Simulated machine received {:?}", command);
        // Acks echo the command's wire code
        let code = encode(command).code();
        self.queue(Telegram::new(TelegramKind::Ack, code, 0));
        match command {
            Command::PowerOn if self.status == MachineStatus::Off => {
                self.status = MachineStatus::Heating;
                self.remaining = HEATING_REPORTS;
            }
            Command::StartClean if self.status.is_on() => {
                self.status = MachineStatus::Cleaning;
                self.remaining = CLEANING_REPORTS;
            }
            Command::PowerOff => {
                self.status = MachineStatus::Off;
                self.remaining = 0;
            }
            _ => {}
        }
    }

    fn report(&mut self) {
        let (code, argument) = match self.status {
            MachineStatus::Idle => (StatusCode::Idle, 0),
            MachineStatus::Heating => (StatusCode::Heating, 0),
            MachineStatus::Brewing => (StatusCode::Brewing, 0),
            MachineStatus::Cleaning => (StatusCode::Cleaning, 0),
            MachineStatus::Descaling => (StatusCode::Descaling, 0),
            MachineStatus::Error(code) => (StatusCode::Error, code),
            MachineStatus::Off | MachineStatus::Unknown | MachineStatus::LinkDown => {
                (StatusCode::Off, 0)
            }
        };
        self.queue(Telegram::new(TelegramKind::Status, code.into(), argument));

        if self.remaining > 0 {
            self.remaining -= 1;
            if self.remaining == 0 {
                self.status = MachineStatus::Idle;
            }
        }
    }
}

impl ByteChannel for SimulatedMachine {
    fn read_available(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let due = self
            .last_report
            .map_or(true, |last| last.elapsed() >= self.report_interval);
        if due {
            self.report();
            self.last_report = Some(Instant::now());
        }
        let n = buf.len().min(self.outbox.len());
        for (slot, byte) in buf.iter_mut().zip(self.outbox.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write_all(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.framer.accumulate(bytes);
        while let Some(frame) = self.framer.next_frame() {
            match frame.ok().map(|t| decode_command(&t)) {
                Some(Ok(command)) => self.handle_command(command),
                _ => warning!("Simulated machine ignoring unreadable telegram"),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::link::{LinkTransport, Transport};
    use crate::protocol::{decode_frame, Inbound};

    fn drain(link: &mut impl Transport) -> Vec<Inbound> {
        let mut v = vec![];
        while let Ok(Some(t)) = link.try_receive() {
            v.push(decode_frame(&t).expect("simulator speaks the protocol"));
            if v.len() > 32 {
                break;
            }
        }
        v
    }

    #[test]
    fn reports_off_until_powered() {
        let mut link = LinkTransport::new(SimulatedMachine::new(Duration::from_secs(60)));
        assert_eq!(drain(&mut link), vec![Inbound::Status(MachineStatus::Off)]);
        // Not due yet
        assert_eq!(drain(&mut link), vec![]);
    }

    #[test]
    fn heats_then_settles() {
        let mut machine = SimulatedMachine::new(Duration::ZERO);
        machine
            .write_all(encode(Command::PowerOn).as_bytes())
            .expect("write");
        let mut link = LinkTransport::new(machine);
        let seen = drain(&mut link);
        assert_eq!(seen[0], Inbound::Ack(Command::PowerOn));
        for report in &seen[1..=HEATING_REPORTS as usize] {
            assert_eq!(*report, Inbound::Status(MachineStatus::Heating));
        }
        assert_eq!(
            seen[HEATING_REPORTS as usize + 1],
            Inbound::Status(MachineStatus::Idle)
        );
    }

    #[test]
    fn ignores_clean_while_off() {
        let mut machine = SimulatedMachine::new(Duration::ZERO);
        machine
            .write_all(encode(Command::StartClean).as_bytes())
            .expect("write");
        let mut link = LinkTransport::new(machine);
        let seen = drain(&mut link);
        assert_eq!(seen[0], Inbound::Ack(Command::StartClean));
        assert_eq!(seen[1], Inbound::Status(MachineStatus::Off));
    }
}
