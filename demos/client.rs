//! Finds the sample RFCOMM service, connects to it and sends each line typed
//! on stdin. An empty line ends the session.

mod common;

#[cfg(target_os = "linux")]
fn main() -> anyhow::Result<()> {
    use anyhow::Context;
    use cmdlink::client::{self, ClientOutcome, RfcommConnector};
    use cmdlink::discovery::SdpTool;
    use cmdlink::rfcomm::BdAddr;
    use std::io::stdin;

    env_logger::init();

    let address = common::argument("CMDLINK_ADDRESS")
        .map(|addr| addr.parse::<BdAddr>())
        .transpose()
        .context(USAGE)?;
    match address {
        Some(addr) => println!("searching on {}", addr),
        None => println!("no device specified. searching all nearby bluetooth devices"),
    }

    let stdin = stdin();
    let handle = stdin.lock();
    let outcome = client::run(&mut SdpTool::new(), &mut RfcommConnector, address, handle)?;
    if outcome == ClientOutcome::NotFound {
        println!("couldn't find the service");
    }

    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn main() -> anyhow::Result<()> {
    anyhow::bail!("RFCOMM sockets are only supported on Linux")
}

#[allow(dead_code)]
const USAGE: &str = "usage: [address]";
