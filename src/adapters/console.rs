//! Serial console command adapter.
//!
//! A reader thread turns lines typed on the UART console into
//! [`AppCommand`]s and queues them on a bounded `embassy-sync` channel.
//! The main loop drains the queue between ticks, so commands run on the
//! same thread as polling and never race a cycle for the bus.
//!
//! ```text
//! ┌───────────────┐  AppCommand  ┌──────────────┐
//! │ console thread│─────────────▶│  main loop   │
//! │  (stdin)      │   COMMANDS   │ handle_command
//! └───────────────┘              └──────────────┘
//! ```
//!
//! Grammar (addresses in decimal or `0x` hex):
//!
//! ```text
//! poll
//! label <address> [text]      empty text restores the default name
//! address <from> <to>
//! ```

use core::fmt;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::{info, warn};

use crate::app::commands::AppCommand;
use crate::sensors::{NAME_CAP, device_name};

/// Commands that can wait for the main loop.
pub const QUEUE_DEPTH: usize = 4;

/// How long the reader sleeps when the console has nothing to read.
const IDLE_MS: u64 = 50;

const READER_STACK: usize = 4096;

pub const USAGE: &str = "commands: poll | label <addr> [text] | address <from> <to>";

pub type CommandQueue = Channel<CriticalSectionRawMutex, AppCommand, QUEUE_DEPTH>;

/// Console → main loop.
pub static COMMANDS: CommandQueue = Channel::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleError {
    UnknownCommand,
    /// Right command, wrong arguments.
    Usage,
    BadAddress,
    LabelTooLong,
    /// The main loop has not caught up; the command was dropped.
    QueueFull,
}

impl fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownCommand => write!(f, "unknown command"),
            Self::Usage => write!(f, "wrong arguments"),
            Self::BadAddress => write!(f, "address must be 0-255 (decimal or 0x hex)"),
            Self::LabelTooLong => write!(f, "label longer than {} bytes", NAME_CAP),
            Self::QueueFull => write!(f, "command queue full"),
        }
    }
}

fn parse_address(s: &str) -> Result<u8, ConsoleError> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|_| ConsoleError::BadAddress)
}

/// Parse one console line.  Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<AppCommand>, ConsoleError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    let cmd = match verb {
        "poll" => {
            if !rest.is_empty() {
                return Err(ConsoleError::Usage);
            }
            AppCommand::PollNow
        }
        "label" => {
            if rest.is_empty() {
                return Err(ConsoleError::Usage);
            }
            let (address, label) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            let label = label.trim();
            if label.len() > NAME_CAP {
                return Err(ConsoleError::LabelTooLong);
            }
            AppCommand::SetLabel {
                address: parse_address(address)?,
                label: device_name(label),
            }
        }
        "address" => {
            let mut args = rest.split_whitespace();
            let (Some(from), Some(to), None) = (args.next(), args.next(), args.next()) else {
                return Err(ConsoleError::Usage);
            };
            AppCommand::SetAddress {
                from: parse_address(from)?,
                to: parse_address(to)?,
            }
        }
        _ => return Err(ConsoleError::UnknownCommand),
    };
    Ok(Some(cmd))
}

/// Parse `line` and queue the command it names.
pub fn submit(queue: &CommandQueue, line: &str) -> Result<(), ConsoleError> {
    let Some(cmd) = parse_line(line)? else {
        return Ok(());
    };
    queue.try_send(cmd).map_err(|_| ConsoleError::QueueFull)
}

/// Start the thread that feeds console lines into `queue`.
pub fn spawn_reader(queue: &'static CommandQueue) -> std::io::Result<()> {
    std::thread::Builder::new()
        .name("console".into())
        .stack_size(READER_STACK)
        .spawn(move || read_loop(queue))?;
    info!("Console: {}", USAGE);
    Ok(())
}

fn read_loop(queue: &CommandQueue) {
    let stdin = std::io::stdin();
    let mut line = String::new();
    loop {
        match stdin.read_line(&mut line) {
            // ESP-IDF's console reports "no input yet" as EOF or WouldBlock.
            Ok(0) => std::thread::sleep(std::time::Duration::from_millis(IDLE_MS)),
            Ok(_) => {
                if let Err(e) = submit(queue, &line) {
                    warn!("console: '{}': {}. {}", line.trim(), e, USAGE);
                }
                line.clear();
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(std::time::Duration::from_millis(IDLE_MS));
            }
            Err(e) => {
                warn!("console: read failed ({})", e);
                line.clear();
                std::thread::sleep(std::time::Duration::from_millis(IDLE_MS));
            }
        }
    }
}
