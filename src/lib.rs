pub mod client;
pub mod codec;
pub mod discovery;
pub mod rfcomm;

use self::codec::{check_flag, Command, CommandCodec, CommandError, LevelCommand, SpeedCommand};
use self::discovery::DiscoveryError;
use rand::Rng;
use serialport::SerialPort;
use std::io::{self, BufRead, Read, Write};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Baud rate used for the throughput measurements.
pub const DEFAULT_BAUD_RATE: u32 = 115200;

/// Serial read timeout, long enough that reads behave as blocking.
const READ_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Motor flags in motor order 1 to 4.
pub const MOTOR_FLAGS: [char; 4] = ['A', 'C', 'B', 'D'];

/// A command sender that owns one byte-stream transport.
///
/// The transport is closed when the link is dropped.
pub struct Link<T> {
    codec: CommandCodec<T>,
}

impl Link<Box<dyn SerialPort>> {
    pub fn open_serial<P: AsRef<str>>(path: P, baud_rate: u32) -> Result<Self, Error> {
        log::debug!("opening {} at {} baud", path.as_ref(), baud_rate);
        let port = serialport::new(path.as_ref(), baud_rate)
            .timeout(READ_TIMEOUT)
            .open()?;
        Ok(Self::new(port))
    }
}

impl<T> Link<T> {
    pub fn new(inner: T) -> Self {
        Self {
            codec: CommandCodec::new(inner),
        }
    }

    pub fn get_ref(&self) -> &T {
        self.codec.get_ref()
    }

    pub fn into_inner(self) -> T {
        self.codec.into_inner()
    }
}

impl<T> Link<T>
where
    T: Write,
{
    pub fn send(&mut self, command: &Command) -> Result<(), Error> {
        log::trace!("sending {:?}", command);
        self.codec.write_command(command)?;
        Ok(())
    }

    /// Sends `bytes` as-is, without any terminator.
    pub fn send_raw(&mut self, bytes: &[u8]) -> Result<(), Error> {
        log::trace!("sending raw \"{}\"", bytes.escape_ascii());
        self.codec.write_raw(bytes)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), Error> {
        self.codec.flush()?;
        Ok(())
    }

    pub fn send_speed(&mut self, flag: char, value: u8) -> Result<(), Error> {
        self.send(&SpeedCommand::new(flag, value)?.encode())
    }

    pub fn set_level(&mut self, level: u8) -> Result<(), Error> {
        self.send(&LevelCommand::new(level).encode())
    }

    /// Sets all four motor speeds, each given as a fraction of full speed.
    pub fn set_motor_speeds(&mut self, speeds: [f64; 4]) -> Result<(), Error> {
        for (flag, speed) in MOTOR_FLAGS.iter().zip(speeds) {
            // Truncates like an integer cast; NaN becomes 0.
            let value = ((100.0 * speed) as i64).clamp(0, codec::MAX_SPEED as i64) as u8;
            self.send_speed(*flag, value)?;
        }
        Ok(())
    }

    /// Sends one speed command with a random value per flag, `count` times
    /// over, and measures how long it took.
    pub fn send_batch(&mut self, flags: &[char], count: usize) -> Result<BatchTiming, Error> {
        self.send_batch_with(flags, count, &mut rand::thread_rng())
    }

    pub fn send_batch_with<R: Rng>(
        &mut self,
        flags: &[char],
        count: usize,
        rng: &mut R,
    ) -> Result<BatchTiming, Error> {
        for &flag in flags {
            check_flag(flag)?;
        }

        let start = Instant::now();
        for _ in 0..count {
            for &flag in flags {
                let value = rng.gen_range(0..=codec::MAX_SPEED);
                self.send_speed(flag, value)?;
            }
        }
        let elapsed = start.elapsed();

        Ok(BatchTiming {
            elapsed,
            count,
            flags: flags.len(),
        })
    }
}

impl<T> Link<T>
where
    T: Read,
{
    /// Blocks until a newline-terminated line arrives and returns it without
    /// the terminator.
    pub fn read_line(&mut self) -> Result<String, Error> {
        let line = self.codec.read_line()?;
        let line = String::from_utf8_lossy(&line).into_owned();
        log::trace!("received {:?}", line);
        Ok(line)
    }
}

impl<T> Link<T>
where
    T: Write,
{
    /// Forwards lines from `input` verbatim until an empty line or EOF.
    ///
    /// Returns the number of lines sent.
    pub fn interactive_session<R: BufRead>(&mut self, mut input: R) -> Result<usize, Error> {
        let mut sent = 0;
        let mut line = Vec::new();
        loop {
            line.clear();
            if input.read_until(b'\n', &mut line)? == 0 {
                break;
            }
            while matches!(line.last(), Some(b'\r' | b'\n')) {
                line.pop();
            }
            if line.is_empty() {
                break;
            }
            self.send_raw(&line)?;
            sent += 1;
        }
        log::debug!("session ended after {} line(s)", sent);
        Ok(sent)
    }
}

/// Wall-clock timing of a [`Link::send_batch`] run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchTiming {
    pub elapsed: Duration,
    /// Number of iterations.
    pub count: usize,
    /// Number of flags sent per iteration.
    pub flags: usize,
}

impl BatchTiming {
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    pub fn messages(&self) -> usize {
        self.count * self.flags
    }

    /// Average time per iteration, which covers one message per flag.
    pub fn per_iteration(&self) -> Option<Duration> {
        average(self.elapsed, self.count)
    }

    /// Average time per individual message.
    pub fn per_message(&self) -> Option<Duration> {
        average(self.elapsed, self.messages())
    }
}

fn average(total: Duration, n: usize) -> Option<Duration> {
    if n == 0 {
        None
    } else {
        Some(total.div_f64(n as f64))
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("serialport: {0}")]
    SerialPort(#[from] serialport::Error),

    #[error("io: {0}")]
    Io(#[from] io::Error),

    #[error("invalid command: {0}")]
    Command(#[from] CommandError),

    #[error("discovery: {0}")]
    Discovery(#[from] DiscoveryError),
}
