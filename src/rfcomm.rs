//! Bluetooth addresses and RFCOMM stream sockets.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A Bluetooth device address, most significant octet first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BdAddr([u8; 6]);

impl BdAddr {
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid bluetooth address {0:?}")]
pub struct ParseBdAddrError(String);

impl FromStr for BdAddr {
    type Err = ParseBdAddrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseBdAddrError(s.to_owned());
        let mut octets = [0u8; 6];
        let mut parts = s.split(':');
        for octet in octets.iter_mut() {
            let part = parts.next().ok_or_else(err)?;
            if part.len() != 2 || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(err());
            }
            *octet = u8::from_str_radix(part, 16).map_err(|_| err())?;
        }
        if parts.next().is_some() {
            return Err(err());
        }
        Ok(Self(octets))
    }
}

impl fmt::Display for BdAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            a, b, c, d, e, g
        )
    }
}

#[cfg(target_os = "linux")]
pub use self::linux::RfcommStream;

#[cfg(target_os = "linux")]
mod linux {
    use super::BdAddr;
    use std::fs::File;
    use std::io::{self, Read, Write};
    use std::mem;
    use std::os::unix::io::{AsRawFd, FromRawFd, OwnedFd};

    const BTPROTO_RFCOMM: libc::c_int = 3;

    /// `struct sockaddr_rc` from BlueZ.
    #[repr(C)]
    struct SockaddrRc {
        rc_family: libc::sa_family_t,
        rc_bdaddr: [u8; 6],
        rc_channel: u8,
    }

    /// A connected RFCOMM socket.
    ///
    /// The descriptor is closed when the stream is dropped.
    #[derive(Debug)]
    pub struct RfcommStream {
        file: File,
    }

    impl RfcommStream {
        pub fn connect(addr: BdAddr, channel: u8) -> io::Result<Self> {
            // SAFETY: plain socket(2) call, result checked below.
            let raw = unsafe {
                libc::socket(
                    libc::AF_BLUETOOTH,
                    libc::SOCK_STREAM | libc::SOCK_CLOEXEC,
                    BTPROTO_RFCOMM,
                )
            };
            if raw < 0 {
                return Err(io::Error::last_os_error());
            }
            // SAFETY: `raw` is a freshly created descriptor that nothing else owns.
            let fd = unsafe { OwnedFd::from_raw_fd(raw) };

            // bdaddr_t is stored little-endian.
            let mut bdaddr = addr.octets();
            bdaddr.reverse();
            let sockaddr = SockaddrRc {
                rc_family: libc::AF_BLUETOOTH as libc::sa_family_t,
                rc_bdaddr: bdaddr,
                rc_channel: channel,
            };

            log::debug!("connecting rfcomm socket to {} channel {}", addr, channel);
            // SAFETY: `sockaddr` outlives the call and the length matches its type.
            let ret = unsafe {
                libc::connect(
                    fd.as_raw_fd(),
                    &sockaddr as *const SockaddrRc as *const libc::sockaddr,
                    mem::size_of::<SockaddrRc>() as libc::socklen_t,
                )
            };
            if ret < 0 {
                return Err(io::Error::last_os_error());
            }

            Ok(Self {
                file: File::from(fd),
            })
        }
    }

    impl Read for RfcommStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.file.read(buf)
        }
    }

    impl Write for RfcommStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.file.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}
