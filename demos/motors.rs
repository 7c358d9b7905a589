//! Sets all four motors once. Speeds are given as fractions of full speed:
//!
//! `motors <device> <m1> <m2> <m3> <m4>`

use anyhow::Context;
use cmdlink::Link;
use std::env::args;

const MOTOR_BAUD_RATE: u32 = 9600;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut args = args().skip(1);
    let path = args.next().context(USAGE)?;

    let mut speeds = [0.0; 4];
    for speed in speeds.iter_mut() {
        let arg = args.next().context(USAGE)?;
        *speed = arg
            .parse()
            .with_context(|| format!("invalid speed {:?}", arg))?;
    }

    let mut link = Link::open_serial(path, MOTOR_BAUD_RATE)?;
    link.set_motor_speeds(speeds)?;
    link.flush()?;

    Ok(())
}

const USAGE: &str = "usage: [port] [m1] [m2] [m3] [m4]";
