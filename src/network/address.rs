use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

/// Default listen address, all interfaces on port 8080
pub const DEFAULT_LISTEN_ADDR: &str = ":8080";

/// Listen address accepted on the command line
///
/// Besides a plain `ip:port` socket address this understands the short
/// `:port` form, which binds every IPv4 interface, and `localhost:port`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenAddr(SocketAddr);

impl ListenAddr {
    pub fn socket_addr(&self) -> SocketAddr {
        self.0
    }
}

impl Default for ListenAddr {
    fn default() -> Self {
        Self(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8080))
    }
}

impl fmt::Display for ListenAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<SocketAddr> for ListenAddr {
    fn from(addr: SocketAddr) -> Self {
        ListenAddr(addr)
    }
}

impl From<ListenAddr> for SocketAddr {
    fn from(addr: ListenAddr) -> Self {
        addr.0
    }
}

impl FromStr for ListenAddr {
    type Err = crate::KvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let parse_port = |port: &str| {
            port.parse::<u16>()
                .map_err(|e| crate::KvError::Config(format!("Invalid port {port:?}: {e}")))
        };

        if let Some(port) = s.strip_prefix(':') {
            return Ok(ListenAddr(SocketAddr::new(
                IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                parse_port(port)?,
            )));
        }
        if let Some(port) = s.strip_prefix("localhost:") {
            return Ok(ListenAddr(SocketAddr::new(
                IpAddr::V4(Ipv4Addr::LOCALHOST),
                parse_port(port)?,
            )));
        }

        s.parse::<SocketAddr>()
            .map(ListenAddr)
            .map_err(|e| crate::KvError::Config(format!("Invalid listen address {s:?}: {e}")))
    }
}
