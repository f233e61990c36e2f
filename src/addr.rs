//! Socket address handling.
//!
//! A resolved candidate is a tagged variant over the concrete address families
//! rather than a raw `sockaddr` blob: the family discriminant is what the
//! dialer needs to create a matching socket, so it is carried explicitly.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use socket2::Domain;

/// A socket address tagged with its family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SockAddr {
    /// IPv4 socket address
    V4(std::net::SocketAddrV4),
    /// IPv6 socket address
    V6(std::net::SocketAddrV6),
}

/// Address-family discriminant for a [`SockAddr`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    /// IPv4
    V4,
    /// IPv6
    V6,
}

impl Family {
    /// The socket2 domain used to create a socket of this family.
    pub fn domain(self) -> Domain {
        match self {
            Family::V4 => Domain::IPV4,
            Family::V6 => Domain::IPV6,
        }
    }

    /// Family name as used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Family::V4 => "IPv4",
            Family::V6 => "IPv6",
        }
    }
}

impl SockAddr {
    /// Create a new IPv4 socket address.
    pub fn new_v4(ip: Ipv4Addr, port: u16) -> Self {
        SockAddr::V4(std::net::SocketAddrV4::new(ip, port))
    }

    /// Create a new IPv6 socket address.
    pub fn new_v6(ip: Ipv6Addr, port: u16) -> Self {
        SockAddr::V6(std::net::SocketAddrV6::new(ip, port, 0, 0))
    }

    /// Create from a standard library `SocketAddr`.
    pub fn from_std(addr: SocketAddr) -> Self {
        match addr {
            SocketAddr::V4(v4) => SockAddr::V4(v4),
            SocketAddr::V6(v6) => SockAddr::V6(v6),
        }
    }

    /// Convert to a standard library `SocketAddr`.
    pub fn to_std(&self) -> SocketAddr {
        match self {
            SockAddr::V4(v4) => SocketAddr::V4(*v4),
            SockAddr::V6(v6) => SocketAddr::V6(*v6),
        }
    }

    /// The address family tag.
    pub fn family(&self) -> Family {
        match self {
            SockAddr::V4(_) => Family::V4,
            SockAddr::V6(_) => Family::V6,
        }
    }

    /// The port number.
    pub fn port(&self) -> u16 {
        match self {
            SockAddr::V4(v4) => v4.port(),
            SockAddr::V6(v6) => v6.port(),
        }
    }

    /// The IP address.
    pub fn ip(&self) -> IpAddr {
        match self {
            SockAddr::V4(v4) => IpAddr::V4(*v4.ip()),
            SockAddr::V6(v6) => IpAddr::V6(*v6.ip()),
        }
    }

    /// Check if this is an IPv4 address.
    pub fn is_ipv4(&self) -> bool {
        matches!(self, SockAddr::V4(_))
    }

    /// Check if this is an IPv6 address.
    pub fn is_ipv6(&self) -> bool {
        matches!(self, SockAddr::V6(_))
    }

    /// Format the address part without the port.
    ///
    /// IPv4-mapped IPv6 addresses (`::ffff:x.x.x.x`) display as IPv4.
    pub fn addr_string(&self) -> String {
        match self {
            SockAddr::V4(v4) => v4.ip().to_string(),
            SockAddr::V6(v6) => {
                let ip = v6.ip();
                if let Some(ipv4) = ip.to_ipv4_mapped() {
                    ipv4.to_string()
                } else {
                    ip.to_string()
                }
            }
        }
    }
}

impl fmt::Display for SockAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SockAddr::V4(v4) => write!(f, "{}", v4),
            SockAddr::V6(v6) => write!(f, "{}", v6),
        }
    }
}

impl From<SocketAddr> for SockAddr {
    fn from(addr: SocketAddr) -> Self {
        SockAddr::from_std(addr)
    }
}

impl From<SockAddr> for SocketAddr {
    fn from(addr: SockAddr) -> Self {
        addr.to_std()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ipv4_basic() {
        let addr = SockAddr::new_v4(Ipv4Addr::new(127, 0, 0, 1), 8080);
        assert!(addr.is_ipv4());
        assert!(!addr.is_ipv6());
        assert_eq!(addr.port(), 8080);
        assert_eq!(addr.family(), Family::V4);
        assert_eq!(addr.family().name(), "IPv4");
        assert_eq!(addr.addr_string(), "127.0.0.1");
    }

    #[test]
    fn ipv6_basic() {
        let addr = SockAddr::new_v6(Ipv6Addr::new(0, 0, 0, 0, 0, 0, 0, 1), 8080);
        assert!(addr.is_ipv6());
        assert_eq!(addr.family(), Family::V6);
        assert_eq!(addr.addr_string(), "::1");
    }

    #[test]
    fn ipv4_mapped_displays_as_ipv4() {
        let ipv6 = Ipv6Addr::new(0, 0, 0, 0, 0, 0xffff, 0x7f00, 0x0001);
        let addr = SockAddr::new_v6(ipv6, 8080);
        assert_eq!(addr.addr_string(), "127.0.0.1");
    }

    #[test]
    fn round_trips_through_std() {
        let std_addr: SocketAddr = "127.0.0.1:8080".parse().unwrap();
        let addr = SockAddr::from_std(std_addr);
        assert!(addr.is_ipv4());
        assert_eq!(addr.to_std(), std_addr);
    }

    #[test]
    fn display_includes_port() {
        let addr = SockAddr::new_v4(Ipv4Addr::new(192, 168, 1, 1), 80);
        assert_eq!(addr.to_string(), "192.168.1.1:80");
    }
}
