//! Discover-connect-forward flow of the interactive client.

use std::io::{self, BufRead, Read, Write};

use crate::discovery::{Discovery, SERVICE_UUID};
use crate::rfcomm::BdAddr;
use crate::{Error, Link};

/// Opens a stream to a discovered service.
pub trait Connector {
    type Stream: Read + Write;

    fn connect(&mut self, host: BdAddr, port: u8) -> io::Result<Self::Stream>;
}

#[cfg(target_os = "linux")]
#[derive(Debug, Default, Clone, Copy)]
pub struct RfcommConnector;

#[cfg(target_os = "linux")]
impl Connector for RfcommConnector {
    type Stream = crate::rfcomm::RfcommStream;

    fn connect(&mut self, host: BdAddr, port: u8) -> io::Result<Self::Stream> {
        crate::rfcomm::RfcommStream::connect(host, port)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientOutcome {
    /// Discovery came back empty; nothing was connected.
    NotFound,
    /// The session ran and ended on an empty line.
    Finished { sent: usize },
}

/// Finds the service, connects to the first match and forwards `input` to it.
///
/// The connection is closed before returning.
pub fn run<D, C, R>(
    discovery: &mut D,
    connector: &mut C,
    address: Option<BdAddr>,
    input: R,
) -> Result<ClientOutcome, Error>
where
    D: Discovery + ?Sized,
    C: Connector + ?Sized,
    R: BufRead,
{
    let records = discovery.find_service(SERVICE_UUID, address)?;
    let Some(first) = records.into_iter().next() else {
        return Ok(ClientOutcome::NotFound);
    };

    log::info!("connecting to {:?} on {}", first.name, first.host);
    let stream = connector.connect(first.host, first.port)?;
    let mut link = Link::new(stream);
    let sent = link.interactive_session(input)?;

    Ok(ClientOutcome::Finished { sent })
}
