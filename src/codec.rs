use std::fmt;
use std::io::{self, Read, Write};

use thiserror::Error;

/// Terminator of a speed command; the ACK byte Amarino listens for.
pub const ACK: u8 = 0x13;

pub const MAX_SPEED: u8 = 100;

#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum CommandError {
    #[error("flag {0:?} is not a printable ASCII character")]
    InvalidFlag(char),

    #[error("value {0} is out of range (0..=100)")]
    ValueOutOfRange(u8),
}

/// An encoded command, ready to be written to a transport.
#[derive(Clone, PartialEq, Eq)]
pub struct Command {
    bytes: Vec<u8>,
}

impl Command {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Command(\"{}\")", self.bytes.escape_ascii())
    }
}

/// A single flag/value pair, e.g. `A42` followed by [`ACK`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeedCommand {
    flag: u8,
    value: u8,
}

impl SpeedCommand {
    pub fn new(flag: char, value: u8) -> Result<Self, CommandError> {
        let flag = check_flag(flag)?;
        if value > MAX_SPEED {
            return Err(CommandError::ValueOutOfRange(value));
        }
        Ok(Self { flag, value })
    }

    pub fn encode(&self) -> Command {
        let mut bytes = Vec::with_capacity(5);
        bytes.push(self.flag);
        bytes.extend_from_slice(self.value.to_string().as_bytes());
        bytes.push(ACK);
        Command { bytes }
    }
}

/// Validates a command flag, returning it as a byte.
///
/// Only printable ASCII is accepted, which also keeps [`ACK`] out of the
/// message body.
pub(crate) fn check_flag(flag: char) -> Result<u8, CommandError> {
    if flag.is_ascii_graphic() {
        Ok(flag as u8)
    } else {
        Err(CommandError::InvalidFlag(flag))
    }
}

/// A brightness level, sent as a decimal number and CRLF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelCommand {
    level: u8,
}

impl LevelCommand {
    pub fn new(level: u8) -> Self {
        Self { level }
    }

    pub fn encode(&self) -> Command {
        Command {
            bytes: format!("{}\r\n", self.level).into_bytes(),
        }
    }
}

pub fn format_speed_command(flag: char, value: u8) -> Result<Vec<u8>, CommandError> {
    Ok(SpeedCommand::new(flag, value)?.encode().into_bytes())
}

pub fn format_level_command(level: u8) -> Vec<u8> {
    LevelCommand::new(level).encode().into_bytes()
}

pub struct CommandCodec<T> {
    inner: T,
}

impl<T> CommandCodec<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T> CommandCodec<T>
where
    T: Read,
{
    /// Blocks until a full line has been read, returning it without the
    /// line terminator.
    ///
    /// Reads a single byte at a time so nothing past the newline is consumed.
    pub fn read_line(&mut self) -> io::Result<Vec<u8>> {
        let mut line = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => return Err(io::ErrorKind::UnexpectedEof.into()),
                Ok(_) => {}
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
            if byte[0] == b'\n' {
                break;
            }
            line.push(byte[0]);
        }
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Ok(line)
    }
}

impl<T> CommandCodec<T>
where
    T: Write,
{
    pub fn write_command(&mut self, command: &Command) -> io::Result<()> {
        self.inner.write_all(command.as_bytes())
    }

    pub fn write_raw(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.inner.write_all(bytes)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speed_command_layout() {
        assert_eq!(format_speed_command('A', 0).unwrap(), b"A0\x13");
        assert_eq!(format_speed_command('C', 42).unwrap(), b"C42\x13");
        assert_eq!(format_speed_command('d', 100).unwrap(), b"d100\x13");
    }

    #[test]
    fn speed_command_length_and_sentinel() {
        for flag in ['A', 'B', 'z', '#'] {
            for value in 0..=MAX_SPEED {
                let bytes = format_speed_command(flag, value).unwrap();
                assert_eq!(bytes.len(), 1 + value.to_string().len() + 1);
                assert_eq!(bytes.last(), Some(&ACK));
                assert_eq!(bytes.iter().filter(|&&b| b == ACK).count(), 1);
            }
        }
    }

    #[test]
    fn speed_command_rejects_bad_input() {
        assert_eq!(
            format_speed_command('A', 101),
            Err(CommandError::ValueOutOfRange(101))
        );
        assert_eq!(
            format_speed_command('\x13', 5),
            Err(CommandError::InvalidFlag('\x13'))
        );
        assert_eq!(
            format_speed_command('é', 5),
            Err(CommandError::InvalidFlag('é'))
        );
        assert_eq!(
            format_speed_command(' ', 5),
            Err(CommandError::InvalidFlag(' '))
        );
    }

    #[test]
    fn level_command_layout() {
        assert_eq!(format_level_command(255), b"255\r\n");
        assert_eq!(format_level_command(0), b"0\r\n");
    }

    #[test]
    fn debug_escapes_sentinel() {
        let command = SpeedCommand::new('B', 7).unwrap().encode();
        assert_eq!(format!("{:?}", command), r#"Command("B7\x13")"#);
    }

    #[test]
    fn read_line_strips_terminators() {
        let mut reader = CommandCodec::new(&b"first\r\nsecond\nthird"[..]);
        assert_eq!(reader.read_line().unwrap(), b"first");
        assert_eq!(reader.read_line().unwrap(), b"second");
        let err = reader.read_line().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn write_then_read_line() {
        let mut buffer = Vec::new();
        {
            let mut writer = CommandCodec::new(&mut buffer);
            writer
                .write_command(&LevelCommand::new(12).encode())
                .expect("write failed");
            writer.flush().expect("flush failed");
        }

        let mut reader = CommandCodec::new(buffer.as_slice());
        assert_eq!(reader.read_line().expect("read failed"), b"12");
    }
}
