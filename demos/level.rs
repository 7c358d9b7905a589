//! Sends a high level, waits, then sends a low level.

mod common;

use cmdlink::Link;
use std::thread;
use std::time::Duration;

/// The serialport default.
const LEVEL_BAUD_RATE: u32 = 9600;
const LEVEL_HIGH: u8 = 255;
const LEVEL_LOW: u8 = 0;
const LEVEL_PAUSE: Duration = Duration::from_secs(2);

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let path = common::device_path()?;
    let mut link = Link::open_serial(path, LEVEL_BAUD_RATE)?;

    link.set_level(LEVEL_HIGH)?;
    thread::sleep(LEVEL_PAUSE);
    link.set_level(LEVEL_LOW)?;
    link.flush()?;

    Ok(())
}
