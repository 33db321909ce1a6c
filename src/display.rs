//! Status display utilities.

use crate::facade::render;
use crate::protocol::MachineStatus;
use atty::Stream;
use colored::*;
use lazy_static::lazy_static;
use std::io::Write;
use std::sync::Mutex;

lazy_static! {
    static ref DISPLAY: Mutex<Option<Box<dyn StatusDisplay>>> = Mutex::new(None);
}

/// Initializes the global display based on the TERM and COLORTERM environment variables.
pub fn initialize_display() {
    let term = std::env::var("TERM").ok();
    let colorterm = std::env::var("COLORTERM").ok();

    let display: Box<dyn StatusDisplay> =
        if term.is_none() || !atty::is(Stream::Stdout) || !atty::is(Stream::Stderr) {
            Box::new(NoTtyStatusDisplay::default())
        } else if colorterm.is_some() {
            Box::new(ColouredStatusDisplay::new(60))
        } else {
            Box::new(BasicStatusDisplay::new(60))
        };
    if let Ok(mut current) = DISPLAY.lock() {
        *current = Some(display);
    }
}

/// Displays the [`MachineStatus`] according to the current mode.
pub fn display_status(status: MachineStatus) {
    if let Ok(mut display) = DISPLAY.lock() {
        if let Some(ref mut display) = *display {
            display.display(status);
            return;
        }
    }
    println!("{}", render(status));
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Info,
    Warning,
    Error,
}

impl From<LogLevel> for log::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => log::Level::Trace,
            LogLevel::Info => log::Level::Info,
            LogLevel::Warning => log::Level::Warn,
            LogLevel::Error => log::Level::Error,
        }
    }
}

/// Logs a line, first getting any in-progress status line out of the way.
pub fn log(level: LogLevel, target: &str, s: &str) {
    if let Ok(mut display) = DISPLAY.lock() {
        if let Some(ref mut display) = *display {
            display.end_status_line();
        }
    }
    log::log!(target: target, log::Level::from(level), "{}", s);
}

trait StatusDisplay: Send + Sync {
    fn display(&mut self, status: MachineStatus);
    fn end_status_line(&mut self);
}

/// [`StatusDisplay`] for basic terminals, or non-TTY stdio. Only prints when the status changes.
#[derive(Default)]
struct NoTtyStatusDisplay {
    last: Option<MachineStatus>,
}

impl StatusDisplay for NoTtyStatusDisplay {
    fn display(&mut self, status: MachineStatus) {
        if self.last.replace(status) != Some(status) {
            println!("{}", render(status));
        }
    }

    fn end_status_line(&mut self) {}
}

/// Whether the machine is in the middle of something that deserves an animation.
fn is_active(status: MachineStatus) -> bool {
    matches!(
        status,
        MachineStatus::Heating
            | MachineStatus::Brewing
            | MachineStatus::Cleaning
            | MachineStatus::Descaling
    )
}

fn pad(s: &str, width: usize) -> String {
    let len = s.chars().count();
    if len >= width {
        s.to_owned()
    } else {
        s.to_owned() + &" ".repeat(width - len)
    }
}

struct ColouredStatusDisplay {
    activity: usize,
    width: usize,
    last_was_status: bool,
}

impl ColouredStatusDisplay {
    pub fn new(width: usize) -> Self {
        Self {
            activity: 0,
            width,
            last_was_status: false,
        }
    }

    fn line(&self, status: MachineStatus) -> String {
        const BUBBLE_CHARS: [char; 5] = ['⋅', '∘', '°', 'º', '⚬'];

        let status_text = match status {
            MachineStatus::Idle => "✅ Ready".to_owned(),
            MachineStatus::Off => "💤 Off".to_owned(),
            MachineStatus::Heating => "💡 Heating...".to_owned(),
            MachineStatus::Brewing => "☕ Brewing...".to_owned(),
            MachineStatus::Cleaning => "🚿 Cleaning...".to_owned(),
            MachineStatus::Descaling => "🧪 Descaling...".to_owned(),
            MachineStatus::Error(_) => format!("🔔 {}", render(status)),
            MachineStatus::Unknown | MachineStatus::LinkDown => format!("❓ {}", render(status)),
        };

        let mut line: Vec<char> = pad(&(" ".to_owned() + &status_text), self.width)
            .chars()
            .collect();
        if is_active(status) {
            // Bubbles drift through the padding after the text
            let start = status_text.chars().count() + 3;
            if line.len() > start {
                for i in 0..2 {
                    let pos = start + (self.activity * 7 + 13 * i) % (line.len() - start);
                    line[pos] = BUBBLE_CHARS[(self.activity + i) % BUBBLE_CHARS.len()];
                }
            }
        }
        line.into_iter().collect()
    }
}

impl StatusDisplay for ColouredStatusDisplay {
    fn end_status_line(&mut self) {
        if std::mem::take(&mut self.last_was_status) {
            println!();
        }
    }

    fn display(&mut self, status: MachineStatus) {
        self.activity += 1;
        let line = self.line(status);
        let line = match status {
            MachineStatus::Error(_) | MachineStatus::LinkDown => {
                line.white().on_truecolor(128, 24, 24)
            }
            _ => line.truecolor(183, 161, 129).on_truecolor(92, 69, 6),
        };
        print!("\r▐{}▌ ", line);
        let _ = std::io::stdout().flush();
        self.last_was_status = true;
    }
}

struct BasicStatusDisplay {
    activity: u8,
    width: usize,
    last_was_status: bool,
}

impl BasicStatusDisplay {
    pub fn new(width: usize) -> Self {
        Self {
            activity: 0,
            width,
            last_was_status: false,
        }
    }
}

impl StatusDisplay for BasicStatusDisplay {
    fn end_status_line(&mut self) {
        if std::mem::take(&mut self.last_was_status) {
            println!();
        }
    }

    fn display(&mut self, status: MachineStatus) {
        let spinner = if is_active(status) {
            self.activity = (self.activity + 1) % 8;
            &"/-\\|/-\\|"[self.activity as usize..self.activity as usize + 1]
        } else {
            " "
        };
        print!("\r{} {}", pad(&render(status), self.width - 2), spinner);
        let _ = std::io::stdout().flush();
        self.last_was_status = true;
    }
}
