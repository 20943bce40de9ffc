use crate::error::{Error, Result};
use std::net::{IpAddr, Ipv4Addr};
use tracing::debug;

/// Name resolution used by the controllers.
pub trait Resolver {
    /// Resolves a hostname or dotted-quad literal to an IPv4 address.
    fn lookup_host(&self, host: &str) -> Result<Ipv4Addr>;

    /// Reverse lookup, `None` when the address has no name.
    fn lookup_addr(&self, address: IpAddr) -> Option<String>;
}

/// System resolver via `getaddrinfo`/`getnameinfo`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DnsResolver;

impl Resolver for DnsResolver {
    fn lookup_host(&self, host: &str) -> Result<Ipv4Addr> {
        let host = host.trim();
        if let Ok(address) = host.parse::<Ipv4Addr>() {
            return Ok(address);
        }

        let addresses = dns_lookup::lookup_host(host).map_err(|e| Error::UnresolvedHost {
            host: host.to_string(),
            reason: e.to_string(),
        })?;
        addresses
            .into_iter()
            .find_map(|address| match address {
                IpAddr::V4(v4) => Some(v4),
                IpAddr::V6(_) => None,
            })
            .ok_or_else(|| Error::UnresolvedHost {
                host: host.to_string(),
                reason: "no IPv4 address".to_string(),
            })
    }

    fn lookup_addr(&self, address: IpAddr) -> Option<String> {
        match dns_lookup::lookup_addr(&address) {
            Ok(hostname) if hostname != address.to_string() => Some(hostname),
            Ok(_) => None,
            Err(e) => {
                debug!(%address, error = %e, "reverse lookup failed");
                None
            }
        }
    }
}

/// Formats a hop address as `name [ip]`, or just the ip when it has no name.
pub fn display_address(resolver: &impl Resolver, address: IpAddr) -> String {
    match resolver.lookup_addr(address) {
        Some(hostname) => format!("{} [{}]", hostname, address),
        None => address.to_string(),
    }
}
