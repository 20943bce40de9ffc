//! A single request/reply exchange.

use crate::codes;
use crate::error::{Error, Result};
use crate::packet::{
    EchoReply, EchoRequest, HexBytes, QuotedEcho, ValidityFlags, quoted_echo, unix_time,
    validate,
};
use crate::transport::{Datagram, IcmpChannel, IcmpTransport};
use std::io;
use std::net::{IpAddr, Ipv4Addr};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeState {
    Idle,
    Sent,
    AwaitingReply,
    Resolved,
}

/// Why a probe produced no usable answer, other than running out of time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeFailure {
    Malformed { len: usize },
    Transport(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    EchoReplyReceived {
        /// Milliseconds, from the timestamp echoed back in the reply.
        rtt: f64,
        validity: ValidityFlags,
        source: IpAddr,
        reply: EchoReply,
    },
    ErrorReceived {
        icmp_type: u8,
        icmp_code: u8,
        description: &'static str,
        source: IpAddr,
        /// Only measured for Time Exceeded.
        rtt: Option<f64>,
        /// The request this error refers to, when the router quoted it.
        quoted: Option<QuotedEcho>,
    },
    TimedOut,
    Failed(ProbeFailure),
}

impl ProbeOutcome {
    pub fn rtt(&self) -> Option<f64> {
        match self {
            ProbeOutcome::EchoReplyReceived { rtt, .. } => Some(*rtt),
            ProbeOutcome::ErrorReceived { rtt, .. } => *rtt,
            _ => None,
        }
    }

    pub fn source(&self) -> Option<IpAddr> {
        match self {
            ProbeOutcome::EchoReplyReceived { source, .. }
            | ProbeOutcome::ErrorReceived { source, .. } => Some(*source),
            _ => None,
        }
    }

    /// True only for an Echo Reply whose identifier, sequence and data all match.
    pub fn is_valid_reply(&self) -> bool {
        matches!(self, ProbeOutcome::EchoReplyReceived { validity, .. } if validity.is_valid())
    }
}

pub struct ProbeSession<'a> {
    request: &'a EchoRequest,
    ttl: u8,
    timeout: Duration,
    state: ProbeState,
}

impl<'a> ProbeSession<'a> {
    pub fn new(request: &'a EchoRequest, ttl: u8, timeout: Duration) -> ProbeSession<'a> {
        ProbeSession { request, ttl, timeout, state: ProbeState::Idle }
    }

    pub fn state(&self) -> ProbeState {
        self.state
    }

    /// Sends the request and waits at most `timeout` for an answer. Always
    /// ends in [`ProbeState::Resolved`]; the channel is closed before this
    /// returns.
    pub fn run<T: IcmpTransport>(&mut self, transport: &T, target: Ipv4Addr) -> ProbeOutcome {
        let outcome = match self.exchange(transport, target) {
            Ok(outcome) => outcome,
            Err(Error::Transport(e)) if is_timeout(&e) => ProbeOutcome::TimedOut,
            Err(Error::MalformedPacket { len }) => {
                warn!(len, seq = self.request.sequence_number(), "malformed reply");
                ProbeOutcome::Failed(ProbeFailure::Malformed { len })
            }
            Err(e) => {
                warn!(error = %e, seq = self.request.sequence_number(), "probe failed");
                ProbeOutcome::Failed(ProbeFailure::Transport(e.to_string()))
            }
        };
        self.enter(ProbeState::Resolved);
        outcome
    }

    fn exchange<T: IcmpTransport>(&mut self, transport: &T, target: Ipv4Addr) -> Result<ProbeOutcome> {
        let mut channel = transport.open(self.ttl).map_err(Error::Transport)?;
        trace!(
            seq = self.request.sequence_number(),
            bytes = %HexBytes(self.request.as_bytes()),
            "sending request"
        );
        channel
            .send_to(self.request.as_bytes(), target)
            .map_err(Error::Transport)?;
        let sent_at = Instant::now();
        self.enter(ProbeState::Sent);

        let deadline = sent_at
            .checked_add(self.timeout)
            .ok_or_else(|| Error::Config(format!("timeout {:?} is out of range", self.timeout)))?;
        self.enter(ProbeState::AwaitingReply);
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(ProbeOutcome::TimedOut);
            }
            let Some(datagram) = channel.recv_timeout(remaining).map_err(Error::Transport)? else {
                return Ok(ProbeOutcome::TimedOut);
            };
            let received_at = unix_time();
            let elapsed = sent_at.elapsed();
            trace!(source = %datagram.source, bytes = %HexBytes(&datagram.bytes), "datagram received");

            // probing a local address loops our own request back to us
            if datagram.bytes.first() == Some(&codes::ECHO_REQUEST) {
                trace!(source = %datagram.source, "ignoring echo request");
                continue;
            }
            let outcome = self.classify(&datagram, received_at, elapsed)?;
            if let ProbeOutcome::ErrorReceived { quoted: Some(quoted), .. } = &outcome {
                if !self.is_own(quoted) {
                    debug!(
                        source = %datagram.source,
                        identifier = quoted.identifier,
                        seq = quoted.sequence_number,
                        "ignoring error about another request"
                    );
                    continue;
                }
            }
            return Ok(outcome);
        }
    }

    fn is_own(&self, quoted: &QuotedEcho) -> bool {
        quoted.identifier == self.request.identifier()
            && quoted.sequence_number == self.request.sequence_number()
    }

    fn classify(&self, datagram: &Datagram, received_at: f64, elapsed: Duration) -> Result<ProbeOutcome> {
        let bytes = &datagram.bytes;
        let (icmp_type, icmp_code) = match bytes.as_slice() {
            [icmp_type, icmp_code, ..] => (*icmp_type, *icmp_code),
            _ => return Err(Error::MalformedPacket { len: bytes.len() }),
        };
        debug!(icmp_type, icmp_code, source = %datagram.source, ttl = self.ttl, "reply received");

        if icmp_type == codes::ECHO_REPLY {
            let reply = EchoReply::parse(bytes)?;
            let validity = validate(self.request, &reply);
            let rtt = (received_at - reply.timestamp_sent) * 1000.0;
            return Ok(ProbeOutcome::EchoReplyReceived {
                rtt,
                validity,
                source: datagram.source,
                reply,
            });
        }

        let quoted = if codes::is_known_error(icmp_type) { quoted_echo(bytes) } else { None };
        Ok(ProbeOutcome::ErrorReceived {
            icmp_type,
            icmp_code,
            description: codes::describe(icmp_type, icmp_code),
            source: datagram.source,
            rtt: (icmp_type == codes::TIME_EXCEEDED).then(|| elapsed.as_secs_f64() * 1000.0),
            quoted,
        })
    }

    fn enter(&mut self, state: ProbeState) {
        trace!(from = ?self.state, to = ?state, seq = self.request.sequence_number(), "probe state");
        self.state = state;
    }
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
}
