//! Service discovery by UUID.
//!
//! Lookups are delegated to BlueZ's `sdptool`, whose text output is parsed
//! into [`ServiceRecord`]s.

use std::io;
use std::process::{Command, ExitStatus};

use thiserror::Error;

use crate::rfcomm::BdAddr;

/// Service UUID advertised by the interactive client's peer.
pub const SERVICE_UUID: &str = "94f39d29-7d6d-437d-973b-fba39e49d4ee";

/// A connectable service endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRecord {
    pub name: String,
    pub host: BdAddr,
    pub port: u8,
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("failed to run sdptool: {0}")]
    Spawn(#[source] io::Error),

    #[error("sdptool exited with {status}: {stderr}")]
    Failed { status: ExitStatus, stderr: String },
}

pub trait Discovery {
    /// Looks up all services matching `uuid`, either on `address` or on every
    /// device in range. An empty result is not an error.
    fn find_service(
        &mut self,
        uuid: &str,
        address: Option<BdAddr>,
    ) -> Result<Vec<ServiceRecord>, DiscoveryError>;
}

/// Discovery through the `sdptool search` command.
#[derive(Debug, Clone)]
pub struct SdpTool {
    program: String,
}

impl SdpTool {
    pub fn new() -> Self {
        Self::with_program("sdptool")
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for SdpTool {
    fn default() -> Self {
        Self::new()
    }
}

impl Discovery for SdpTool {
    fn find_service(
        &mut self,
        uuid: &str,
        address: Option<BdAddr>,
    ) -> Result<Vec<ServiceRecord>, DiscoveryError> {
        let mut command = Command::new(&self.program);
        command.arg("search");
        if let Some(address) = address {
            command.arg("--bdaddr").arg(address.to_string());
        }
        command.arg(uuid);

        log::debug!("running {:?}", command);
        let output = command.output().map_err(DiscoveryError::Spawn)?;
        if !output.status.success() {
            return Err(DiscoveryError::Failed {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let records = parse_sdptool_output(&stdout);
        log::debug!("found {} matching service(s)", records.len());
        Ok(records)
    }
}

/// Extracts RFCOMM service records from `sdptool search` output.
pub fn parse_sdptool_output(output: &str) -> Vec<ServiceRecord> {
    #[derive(Default)]
    struct Partial {
        name: String,
        port: Option<u8>,
        has_handle: bool,
    }

    let mut records = Vec::new();
    let mut host: Option<BdAddr> = None;
    let mut current: Option<Partial> = None;

    let mut finish = |host: Option<BdAddr>, partial: Option<Partial>| {
        if let (
            Some(host),
            Some(Partial {
                name,
                port: Some(port),
                ..
            }),
        ) = (host, partial)
        {
            records.push(ServiceRecord { name, host, port });
        }
    };

    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() {
            // Records are separated by a blank line.
            finish(host, current.take());
        } else if let Some(rest) = line.strip_prefix("Searching for ") {
            finish(host, current.take());
            host = rest
                .rsplit_once(" on ")
                .and_then(|(_, tail)| tail.split_whitespace().next())
                .and_then(|addr| addr.parse().ok());
        } else if let Some(name) = line.strip_prefix("Service Name:") {
            finish(host, current.take());
            current = Some(Partial {
                name: name.trim().to_owned(),
                ..Partial::default()
            });
        } else if line.starts_with("Service RecHandle:") {
            match current.as_mut() {
                Some(partial) if !partial.has_handle => partial.has_handle = true,
                _ => {
                    // A second handle, or one without a name, opens a new record.
                    finish(host, current.take());
                    current = Some(Partial {
                        has_handle: true,
                        ..Partial::default()
                    });
                }
            }
        } else if let Some(channel) = line.strip_prefix("Channel:") {
            if let Some(partial) = current.as_mut() {
                partial.port = channel.trim().parse().ok();
            }
        }
    }
    finish(host, current.take());

    records
}

#[cfg(test)]
mod tests {
    use super::*;

    const SINGLE: &str = "\
Searching for 94f39d29-7d6d-437d-973b-fba39e49d4ee on 00:06:66:04:B1:BE ...
Service Name: SampleServer
Service RecHandle: 0x10008
Service Class ID List:
  UUID 128: 94f39d29-7d6d-437d-973b-fba39e49d4ee
  \"Serial Port\" (0x1101)
Protocol Descriptor List:
  \"L2CAP\" (0x0100)
  \"RFCOMM\" (0x0003)
    Channel: 5
Profile Descriptor List:
  \"Serial Port\" (0x1101)
    Version: 0x0100
";

    #[test]
    fn parses_single_record() {
        let records = parse_sdptool_output(SINGLE);
        assert_eq!(
            records,
            vec![ServiceRecord {
                name: "SampleServer".into(),
                host: "00:06:66:04:B1:BE".parse().unwrap(),
                port: 5,
            }]
        );
    }

    #[test]
    fn parses_inquiry_over_several_devices() {
        let output = "\
Inquiring ...
Searching for 94f39d29-7d6d-437d-973b-fba39e49d4ee on AA:BB:CC:DD:EE:FF ...
Service Name: First
Service RecHandle: 0x10001
Protocol Descriptor List:
  \"L2CAP\" (0x0100)
  \"RFCOMM\" (0x0003)
    Channel: 1
Service Name: NoChannel
Service RecHandle: 0x10002
Protocol Descriptor List:
  \"L2CAP\" (0x0100)
    PSM: 25
Searching for 94f39d29-7d6d-437d-973b-fba39e49d4ee on 11:22:33:44:55:66 ...
Service RecHandle: 0x10003
Protocol Descriptor List:
  \"RFCOMM\" (0x0003)
    Channel: 12
";
        let records = parse_sdptool_output(output);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "First");
        assert_eq!(records[0].host.to_string(), "AA:BB:CC:DD:EE:FF");
        assert_eq!(records[0].port, 1);
        assert_eq!(records[1].name, "");
        assert_eq!(records[1].host.to_string(), "11:22:33:44:55:66");
        assert_eq!(records[1].port, 12);
    }

    #[test]
    fn records_on_one_host_stay_separate() {
        let output = "\
Searching for 94f39d29-7d6d-437d-973b-fba39e49d4ee on AA:BB:CC:DD:EE:FF ...
Service Name: First
Service RecHandle: 0x10001
Protocol Descriptor List:
  \"RFCOMM\" (0x0003)
    Channel: 1

Service RecHandle: 0x10002
Protocol Descriptor List:
  \"RFCOMM\" (0x0003)
    Channel: 7
";
        let records = parse_sdptool_output(output);
        let host: BdAddr = "AA:BB:CC:DD:EE:FF".parse().unwrap();
        assert_eq!(
            records,
            vec![
                ServiceRecord {
                    name: "First".into(),
                    host,
                    port: 1,
                },
                ServiceRecord {
                    name: String::new(),
                    host,
                    port: 7,
                },
            ]
        );
    }

    #[test]
    fn record_without_channel_does_not_borrow_next() {
        let output = "\
Searching for 94f39d29-7d6d-437d-973b-fba39e49d4ee on AA:BB:CC:DD:EE:FF ...
Service Name: L2capOnly
Service RecHandle: 0x10001
Protocol Descriptor List:
  \"L2CAP\" (0x0100)
    PSM: 25
Service RecHandle: 0x10002
Protocol Descriptor List:
  \"RFCOMM\" (0x0003)
    Channel: 7
";
        let records = parse_sdptool_output(output);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "");
        assert_eq!(records[0].port, 7);
    }

    #[test]
    fn no_match_is_empty() {
        let output = "\
Searching for 94f39d29-7d6d-437d-973b-fba39e49d4ee on 00:06:66:04:B1:BE ...
";
        assert!(parse_sdptool_output(output).is_empty());
        assert!(parse_sdptool_output("").is_empty());
    }

    #[test]
    fn missing_program_is_spawn_error() {
        let mut sdp = SdpTool::with_program("/nonexistent/sdptool");
        let err = sdp.find_service(SERVICE_UUID, None).unwrap_err();
        assert!(matches!(err, DiscoveryError::Spawn(_)));
    }
}
