use crate::config::PingConfig;
use crate::dns_resolver::Resolver;
use crate::error::Result;
use crate::interrupt::Interrupt;
use crate::packet::{EchoRequest, process_identifier};
use crate::probe::{ProbeOutcome, ProbeSession};
use crate::transport::IcmpTransport;
use std::net::Ipv4Addr;
use tracing::{debug, info};

/// Running statistics over a ping run. Every field is kept current after
/// each [`PingSummary::record`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PingSummary {
    pub sent: u32,
    pub received: u32,
    pub min_rtt: Option<f64>,
    pub max_rtt: Option<f64>,
    pub avg_rtt: Option<f64>,
    /// Fraction in `0.0..=1.0`.
    pub loss_rate: f64,
    rtt_sum: f64,
}

impl PingSummary {
    pub fn record(&mut self, outcome: &ProbeOutcome) {
        self.sent += 1;
        if let ProbeOutcome::EchoReplyReceived { rtt, .. } = outcome {
            self.received += 1;
            self.rtt_sum += rtt;
            self.min_rtt = Some(self.min_rtt.map_or(*rtt, |min| min.min(*rtt)));
            self.max_rtt = Some(self.max_rtt.map_or(*rtt, |max| max.max(*rtt)));
            self.avg_rtt = Some(self.rtt_sum / f64::from(self.received));
        }
        self.loss_rate = f64::from(self.sent - self.received) / f64::from(self.sent);
    }
}

/// One request of a ping run and what came back.
#[derive(Debug, Clone, PartialEq)]
pub struct PingProbe {
    pub ttl: u8,
    pub request: EchoRequest,
    pub outcome: ProbeOutcome,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PingReport {
    pub host: String,
    pub target: Ipv4Addr,
    pub identifier: u16,
    pub probes: Vec<PingProbe>,
    pub summary: PingSummary,
    /// The run was stopped before `count` probes were sent.
    pub interrupted: bool,
}

pub struct Pinger<T, R> {
    transport: T,
    resolver: R,
    config: PingConfig,
    identifier: u16,
    interrupt: Interrupt,
}

impl<T: IcmpTransport, R: Resolver> Pinger<T, R> {
    pub fn new(transport: T, resolver: R, config: PingConfig) -> Pinger<T, R> {
        Pinger {
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

    pub fn identifier(&self) -> u16 {
        self.identifier
    }

    pub fn ping(&self, host: &str) -> Result<PingReport> {
        let target = self.prepare(host)?;
        Ok(self.ping_address(host, target, |_| {}))
    }

    /// Checks the configuration and resolves `host`. Nothing is sent.
    pub fn prepare(&self, host: &str) -> Result<Ipv4Addr> {
        self.config.validate()?;
        self.resolver.lookup_host(host)
    }

    /// Pings an already resolved target, handing each probe to `on_probe`
    /// as soon as it resolves. Per-probe failures are part of the report.
    pub fn ping_address(&self, host: &str, target: Ipv4Addr, mut on_probe: impl FnMut(&PingProbe)) -> PingReport {
        info!(host, %target, count = self.config.count, identifier = self.identifier, "ping started");

        let mut report = PingReport {
            host: host.to_string(),
            target,
            identifier: self.identifier,
            probes: Vec::with_capacity(self.config.count as usize),
            summary: PingSummary::default(),
            interrupted: false,
        };

        for sequence in 0..self.config.count {
            if self.interrupt.is_triggered() {
                report.interrupted = true;
                break;
            }
            let request = EchoRequest::new(self.identifier, sequence);
            let outcome = ProbeSession::new(&request, self.config.ttl, self.config.timeout)
                .run(&self.transport, target);
            debug!(sequence, ?outcome, "ping probe resolved");

            report.summary.record(&outcome);
            let probe = PingProbe { ttl: self.config.ttl, request, outcome };
            on_probe(&probe);
            report.probes.push(probe);
        }

        info!(
            sent = report.summary.sent,
            received = report.summary.received,
            "ping finished"
        );
        report
    }
}
