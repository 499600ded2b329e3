//! `host:port` connection strings.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::ops::RangeInclusive;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::Error;

/// An IPv4 address and UDP port identifying a game server. Immutable after
/// construction; validated up front so a malformed connection string never
/// reaches a socket call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ServerEndpoint {
    ip: Ipv4Addr,
    port: u16,
}

impl ServerEndpoint {
    /// Parses `ipv4:port` with `port` in `[1, 65535]`, the range valid for a
    /// game server endpoint.
    pub fn parse(s: &str) -> Result<Self, Error> {
        Self::parse_with_port_range(s, 1..=65535)
    }

    /// Parses `ipv4:port` with `port` in `[0, 65535]`, used for the Master
    /// Server's seed address, whose initial value and sentinel are both
    /// `0.0.0.0:0`.
    pub(crate) fn parse_seed(s: &str) -> Result<Self, Error> {
        Self::parse_with_port_range(s, 0..=65535)
    }

    pub(crate) fn new_unchecked(ip: Ipv4Addr, port: u16) -> Self {
        ServerEndpoint { ip, port }
    }

    fn parse_with_port_range(s: &str, range: RangeInclusive<u16>) -> Result<Self, Error> {
        let invalid = || Error::InvalidConnectionString(s.to_owned());

        let (ip_part, port_part) = s.split_once(':').ok_or_else(invalid)?;

        if ip_part.is_empty() || !ip_part.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
            return Err(invalid());
        }
        let ip: Ipv4Addr = ip_part.parse().map_err(|_| invalid())?;

        if port_part.is_empty() || !port_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let port: u16 = port_part.parse().map_err(|_| invalid())?;
        if !range.contains(&port) {
            return Err(invalid());
        }

        Ok(ServerEndpoint { ip, port })
    }

    pub fn ip(&self) -> Ipv4Addr {
        self.ip
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn to_socket_addr(&self) -> SocketAddrV4 {
        SocketAddrV4::new(self.ip, self.port)
    }

    /// The master's end-of-enumeration marker, `0.0.0.0:0`.
    pub fn is_sentinel(&self) -> bool {
        self.ip == Ipv4Addr::new(0, 0, 0, 0) && self.port == 0
    }
}

impl fmt::Display for ServerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

impl FromStr for ServerEndpoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        Self::parse(s)
    }
}
