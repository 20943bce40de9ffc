//! ICMP echo prober: ping and traceroute over raw IPv4 sockets.

pub mod checksum;
pub mod codes;
pub mod config;
pub mod dns_resolver;
pub mod error;
pub mod interrupt;
pub mod logging;
pub mod packet;
pub mod ping;
pub mod probe;
pub mod report;
pub mod tracer;
pub mod transport;

pub use config::{PingConfig, TraceConfig};
pub use dns_resolver::{DnsResolver, Resolver};
pub use error::{Error, Result};
pub use interrupt::Interrupt;
pub use packet::{EchoReply, EchoRequest, ValidityFlags, build_echo_request, validate};
pub use ping::{PingProbe, PingReport, PingSummary, Pinger};
pub use probe::{ProbeFailure, ProbeOutcome, ProbeSession, ProbeState};
pub use tracer::{HopError, TraceHop, TraceRoute, Tracer};
pub use transport::{Datagram, IcmpChannel, IcmpTransport, PnetTransport};
