use crate::codes;
use crate::config::TraceConfig;
use crate::dns_resolver::{Resolver, display_address};
use crate::error::Result;
use crate::interrupt::Interrupt;
use crate::packet::{EchoRequest, process_identifier};
use crate::probe::{ProbeOutcome, ProbeSession};
use crate::transport::IcmpTransport;
use std::iter::FusedIterator;
use std::net::{IpAddr, Ipv4Addr};
use tracing::{debug, info};

pub const PROBES_PER_HOP: usize = 3;

/// The first ICMP error seen at a hop that never answered with Time
/// Exceeded or Echo Reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HopError {
    pub icmp_type: u8,
    pub icmp_code: u8,
    pub description: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TraceHop {
    pub ttl: u8,
    /// Milliseconds per probe, `None` where no usable answer came back.
    pub rtts: [Option<f64>; PROBES_PER_HOP],
    /// `name [ip]`, or the bare ip when unresolved.
    pub address: Option<String>,
    pub source: Option<IpAddr>,
    /// The destination answered at this TTL.
    pub terminal: bool,
    pub error: Option<HopError>,
}

pub struct Tracer<T, R> {
    transport: T,
    resolver: R,
    config: TraceConfig,
    identifier: u16,
    interrupt: Interrupt,
}

impl<T: IcmpTransport, R: Resolver> Tracer<T, R> {
    pub fn new(transport: T, resolver: R, config: TraceConfig) -> Tracer<T, R> {
        Tracer {
            transport,
            resolver,
            config,
            identifier: process_identifier(),
            interrupt: Interrupt::default(),
        }
    }

    pub fn with_identifier(mut self, identifier: u16) -> Self {
        self.identifier = identifier;
        self
    }

    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub fn max_hops(&self) -> u8 {
        self.config.max_hops
    }

    /// Resolves `host` and returns the hops towards it. Nothing is sent
    /// until the iterator is advanced.
    pub fn trace(&self, host: &str) -> Result<TraceRoute<'_, T, R>> {
        self.config.validate()?;
        let target = self.resolver.lookup_host(host)?;
        info!(host, %target, max_hops = self.config.max_hops, "traceroute started");
        Ok(TraceRoute { tracer: self, target, next_ttl: 1, finished: false, interrupted: false })
    }

    fn probe_hop(&self, target: Ipv4Addr, ttl: u8) -> TraceHop {
        let mut rtts = [None; PROBES_PER_HOP];
        let mut source = None;
        let mut answered = false;
        let mut terminal = false;
        let mut error = None;

        for rtt_slot in rtts.iter_mut() {
            let request = EchoRequest::new(self.identifier, u16::from(ttl));
            let outcome = ProbeSession::new(&request, ttl, self.config.timeout)
                .run(&self.transport, target);
            debug!(ttl, ?outcome, "trace probe resolved");

            match outcome {
                ProbeOutcome::EchoReplyReceived { rtt, source: from, .. } => {
                    *rtt_slot = Some(rtt);
                    source = Some(from);
                    answered = true;
                    terminal = true;
                    error = None;
                }
                ProbeOutcome::ErrorReceived { icmp_type: codes::TIME_EXCEEDED, rtt, source: from, .. } => {
                    *rtt_slot = rtt;
                    source = Some(from);
                    answered = true;
                    error = None;
                }
                ProbeOutcome::ErrorReceived { icmp_type, icmp_code, description, source: from, .. } => {
                    if !answered && error.is_none() {
                        error = Some(HopError { icmp_type, icmp_code, description });
                        source = Some(from);
                    }
                }
                ProbeOutcome::TimedOut | ProbeOutcome::Failed(_) => {}
            }
        }

        let address = source.map(|from| {
            if self.config.resolve_hops {
                display_address(&self.resolver, from)
            } else {
                from.to_string()
            }
        });
        TraceHop { ttl, rtts, address, source, terminal, error }
    }
}

/// Hops of one traceroute run, one per TTL. Ends after the destination
/// answers, after `max_hops`, or once the interrupt is triggered.
pub struct TraceRoute<'a, T, R> {
    tracer: &'a Tracer<T, R>,
    target: Ipv4Addr,
    next_ttl: u16,
    finished: bool,
    interrupted: bool,
}

impl<T, R> TraceRoute<'_, T, R> {
    pub fn target(&self) -> Ipv4Addr {
        self.target
    }

    /// True when the run was cut short by the interrupt.
    pub fn interrupted(&self) -> bool {
        self.interrupted
    }
}

impl<T: IcmpTransport, R: Resolver> Iterator for TraceRoute<'_, T, R> {
    type Item = TraceHop;

    fn next(&mut self) -> Option<TraceHop> {
        if self.finished || self.next_ttl > u16::from(self.tracer.config.max_hops) {
            self.finished = true;
            return None;
        }
        if self.tracer.interrupt.is_triggered() {
            self.finished = true;
            self.interrupted = true;
            return None;
        }

        let ttl = self.next_ttl as u8;
        self.next_ttl += 1;
        let hop = self.tracer.probe_hop(self.target, ttl);
        if hop.terminal {
            info!(ttl, "destination reached");
            self.finished = true;
        }
        Some(hop)
    }
}

impl<T: IcmpTransport, R: Resolver> FusedIterator for TraceRoute<'_, T, R> {}
