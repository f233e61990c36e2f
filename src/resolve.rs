//! Hostname resolution.
//!
//! Resolution produces an [`AddressSet`]: an ordered sequence of candidate
//! endpoints for one `(hostname, port)` pair. The order is the order the
//! system resolver returned and is significant — it is the order the dialer
//! tries candidates in.

use std::net::ToSocketAddrs;

use crate::{Error, Family, Result, SockAddr};

/// One candidate endpoint produced by resolution.
///
/// Immutable once built; owned collectively by the [`AddressSet`] that
/// produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedAddress(SockAddr);

impl ResolvedAddress {
    /// The candidate's socket address.
    pub fn addr(&self) -> SockAddr {
        self.0
    }

    /// The candidate's address family, used to create a matching socket.
    pub fn family(&self) -> Family {
        self.0.family()
    }

    /// The target port.
    pub fn port(&self) -> u16 {
        self.0.port()
    }
}

impl std::fmt::Display for ResolvedAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An ordered set of resolved candidate addresses for one host.
///
/// Owns all of its entries; dropping the set releases them as one unit.
#[derive(Debug, Clone)]
pub struct AddressSet {
    hostname: String,
    port: u16,
    candidates: Vec<ResolvedAddress>,
}

impl AddressSet {
    /// The hostname this set was resolved from.
    pub fn host(&self) -> &str {
        &self.hostname
    }

    /// The port every candidate targets.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Number of candidates. At least one for any set returned by [`resolve`].
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Whether the set is empty. Never true for a set returned by [`resolve`].
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// The candidate at `index`, in resolution order.
    pub fn get(&self, index: usize) -> Option<&ResolvedAddress> {
        self.candidates.get(index)
    }

    /// Iterate candidates in resolution order.
    pub fn iter(&self) -> std::slice::Iter<'_, ResolvedAddress> {
        self.candidates.iter()
    }

    /// Build a set from already-resolved addresses, preserving their order.
    ///
    /// Useful for driving the dialer with a hand-picked candidate list.
    pub fn from_addrs<I>(hostname: &str, port: u16, addrs: I) -> Self
    where
        I: IntoIterator<Item = SockAddr>,
    {
        AddressSet {
            hostname: hostname.to_string(),
            port,
            candidates: addrs.into_iter().map(ResolvedAddress).collect(),
        }
    }
}

impl<'a> IntoIterator for &'a AddressSet {
    type Item = &'a ResolvedAddress;
    type IntoIter = std::slice::Iter<'a, ResolvedAddress>;

    fn into_iter(self) -> Self::IntoIter {
        self.candidates.iter()
    }
}

/// Resolve a hostname and port into an ordered candidate set.
///
/// Resolution is restricted to stream-capable families and preserves the
/// order the system resolver returned. A dual-stack host yields both IPv6 and
/// IPv4 candidates, each tagged with its family.
///
/// # Errors
///
/// [`Error::InvalidHost`] for an empty hostname; [`Error::ResolutionFailed`]
/// when the resolver fails or returns no addresses. Resolver failures are
/// opaque — only the message is carried, never interpreted.
pub fn resolve(hostname: &str, port: u16) -> Result<AddressSet> {
    if hostname.trim().is_empty() {
        return Err(Error::InvalidHost("empty hostname".to_string()));
    }

    // The (host, port) impl of ToSocketAddrs handles bare IPv6 literals and
    // defers hostnames to the system resolver (getaddrinfo, SOCK_STREAM).
    let candidates: Vec<ResolvedAddress> = (hostname, port)
        .to_socket_addrs()
        .map_err(|e| Error::ResolutionFailed(format!("{}: {}", hostname, e)))?
        .map(|addr| ResolvedAddress(SockAddr::from_std(addr)))
        .collect();

    if candidates.is_empty() {
        return Err(Error::ResolutionFailed(format!(
            "no addresses found for {}",
            hostname
        )));
    }

    tracing::debug!(
        host = hostname,
        port,
        candidates = candidates.len(),
        "resolved host"
    );

    Ok(AddressSet {
        hostname: hostname.to_string(),
        port,
        candidates,
    })
}
