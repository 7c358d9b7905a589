//! Measures how fast speed commands with random values can be pushed over a
//! serial port.

mod common;

use cmdlink::{Link, DEFAULT_BAUD_RATE};

const BATCH_FLAGS: [char; 4] = ['A', 'B', 'C', 'D'];
const BATCH_COUNT: usize = 1000;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let path = common::device_path()?;
    let mut link = Link::open_serial(path, DEFAULT_BAUD_RATE)?;

    let timing = link.send_batch(&BATCH_FLAGS, BATCH_COUNT)?;
    link.flush()?;

    println!(
        "sent {} messages in {:.6} s",
        timing.messages(),
        timing.elapsed_secs()
    );
    if let Some(avg) = timing.per_iteration() {
        println!(
            "average per iteration ({} flags): {:.6} s",
            timing.flags,
            avg.as_secs_f64()
        );
    }
    if let Some(avg) = timing.per_message() {
        println!("average per message: {:.6} s", avg.as_secs_f64());
    }

    Ok(())
}
