//! Pause/resume control channel
//!
//! A second TCP connection carrying ASCII lines. The controller host sends
//! commands; the plant host runs a reader thread that only flips a
//! [`PauseFlag`], which the plant loop polls between cycles.

use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{info, warn};

use crate::error::Result;

pub const PAUSE_LINE: &str = "[CTRL]PAUSE";
pub const RESUME_LINE: &str = "[CTRL]RESUME";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Pause,
    Resume,
}

impl ControlCommand {
    /// Trailing whitespace (including `\r\n`) is ignored.
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim_end() {
            PAUSE_LINE => Some(ControlCommand::Pause),
            RESUME_LINE => Some(ControlCommand::Resume),
            _ => None,
        }
    }

    pub fn line(&self) -> &'static str {
        match self {
            ControlCommand::Pause => PAUSE_LINE,
            ControlCommand::Resume => RESUME_LINE,
        }
    }
}

/// Shared pause state; cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct PauseFlag(Arc<AtomicBool>);

impl PauseFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_paused(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn set(&self, paused: bool) {
        self.0.store(paused, Ordering::SeqCst);
    }

    pub fn apply(&self, command: ControlCommand) {
        self.set(command == ControlCommand::Pause);
    }
}

/// Write one command line and flush
pub fn send_command<W: Write>(writer: &mut W, command: ControlCommand) -> Result<()> {
    writer.write_all(command.line().as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Apply every command line until end of stream. Unknown lines are logged
/// and skipped.
pub fn apply_commands<R: BufRead>(reader: R, flag: &PauseFlag) -> Result<()> {
    for line in reader.lines() {
        let line = line?;
        match ControlCommand::parse(&line) {
            Some(command) => {
                info!(?command, "control command");
                flag.apply(command);
            }
            None => warn!(line = %line.trim_end(), "ignoring unknown control line"),
        }
    }
    Ok(())
}

/// Reader thread for the plant side of the channel
pub fn spawn_listener(stream: TcpStream, flag: PauseFlag) -> JoinHandle<()> {
    thread::spawn(move || {
        if let Err(e) = apply_commands(BufReader::new(stream), &flag) {
            warn!(error = %e, "control channel closed with error");
        } else {
            info!("control channel closed");
        }
    })
}

/// Controller side: remembers the last command sent so a single key toggles.
pub struct CommandSender<W: Write> {
    writer: W,
    paused: bool,
}

impl<W: Write> CommandSender<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            paused: false,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Send PAUSE when running and RESUME when paused
    pub fn toggle(&mut self) -> Result<ControlCommand> {
        let command = if self.paused {
            ControlCommand::Resume
        } else {
            ControlCommand::Pause
        };
        send_command(&mut self.writer, command)?;
        self.paused = !self.paused;
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse() {
        assert_eq!(ControlCommand::parse("[CTRL]PAUSE\n"), Some(ControlCommand::Pause));
        assert_eq!(ControlCommand::parse("[CTRL]RESUME\r\n"), Some(ControlCommand::Resume));
        assert_eq!(ControlCommand::parse("PAUSE"), None);
        assert_eq!(ControlCommand::parse(""), None);
    }

    #[test]
    fn test_toggle_writes_alternating_lines() {
        let mut sender = CommandSender::new(Vec::new());
        assert_eq!(sender.toggle().unwrap(), ControlCommand::Pause);
        assert!(sender.is_paused());
        assert_eq!(sender.toggle().unwrap(), ControlCommand::Resume);
        assert_eq!(
            String::from_utf8(sender.writer).unwrap(),
            "[CTRL]PAUSE\n[CTRL]RESUME\n"
        );
    }

    #[test]
    fn test_apply_commands() {
        let flag = PauseFlag::new();
        apply_commands(Cursor::new("[CTRL]PAUSE\nnoise\n"), &flag).unwrap();
        assert!(flag.is_paused());
        apply_commands(Cursor::new("[CTRL]RESUME\n"), &flag).unwrap();
        assert!(!flag.is_paused());
    }
}
