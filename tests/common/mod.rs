#![allow(dead_code)]

use icmp_probe::checksum::checksum;
use icmp_probe::packet::unix_time;
use icmp_probe::{Datagram, EchoRequest, IcmpChannel, IcmpTransport, Resolver, Result};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::MutableIpv4Packet;
use std::cell::RefCell;
use std::collections::HashMap;
use std::io;
use std::net::{IpAddr, Ipv4Addr};
use std::rc::Rc;
use std::time::Duration;

pub const TARGET: Ipv4Addr = Ipv4Addr::new(203, 0, 113, 5);

type Responder = dyn Fn(u8, &[u8]) -> Option<Datagram>;

#[derive(Debug, Default)]
pub struct Log {
    /// Calls to `open`, including refused ones.
    pub attempts: usize,
    pub opened: usize,
    pub closed: usize,
    /// (ttl, packet) for every request put on the wire
    pub sent: Vec<(u8, Vec<u8>)>,
}

/// Simulated network: `responder` sees each request with its TTL and
/// decides what, if anything, comes back.
pub struct FakeNetwork {
    log: Rc<RefCell<Log>>,
    responder: Rc<Responder>,
    refused_opens: Vec<usize>,
    failed_sends: Rc<Vec<u16>>,
}

impl FakeNetwork {
    pub fn new(responder: impl Fn(u8, &[u8]) -> Option<Datagram> + 'static) -> FakeNetwork {
        FakeNetwork {
            log: Rc::default(),
            responder: Rc::new(responder),
            refused_opens: Vec::new(),
            failed_sends: Rc::default(),
        }
    }

    /// The `attempt`-th call to `open` (counting from 0) fails.
    pub fn refusing_open(mut self, attempt: usize) -> FakeNetwork {
        self.refused_opens.push(attempt);
        self
    }

    /// Sending the request with this sequence number fails.
    pub fn failing_send(mut self, sequence: u16) -> FakeNetwork {
        Rc::make_mut(&mut self.failed_sends).push(sequence);
        self
    }

    pub fn log(&self) -> Rc<RefCell<Log>> {
        Rc::clone(&self.log)
    }
}

pub struct FakeChannel {
    log: Rc<RefCell<Log>>,
    responder: Rc<Responder>,
    failed_sends: Rc<Vec<u16>>,
    ttl: u8,
    pending: Option<Datagram>,
}

impl IcmpTransport for FakeNetwork {
    type Channel = FakeChannel;

    fn open(&self, ttl: u8) -> io::Result<FakeChannel> {
        let mut log = self.log.borrow_mut();
        let attempt = log.attempts;
        log.attempts += 1;
        if self.refused_opens.contains(&attempt) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "operation not permitted"));
        }
        log.opened += 1;
        Ok(FakeChannel {
            log: Rc::clone(&self.log),
            responder: Rc::clone(&self.responder),
            failed_sends: Rc::clone(&self.failed_sends),
            ttl,
            pending: None,
        })
    }
}

impl IcmpChannel for FakeChannel {
    fn send_to(&mut self, packet: &[u8], destination: Ipv4Addr) -> io::Result<()> {
        assert_eq!(destination, TARGET);
        if self.failed_sends.contains(&sequence_of(packet)) {
            return Err(io::Error::other("network is unreachable"));
        }
        self.log.borrow_mut().sent.push((self.ttl, packet.to_vec()));
        self.pending = (self.responder)(self.ttl, packet);
        Ok(())
    }

    fn recv_timeout(&mut self, _timeout: Duration) -> io::Result<Option<Datagram>> {
        Ok(self.pending.take())
    }
}

impl Drop for FakeChannel {
    fn drop(&mut self) {
        self.log.borrow_mut().closed += 1;
    }
}

pub struct StaticResolver {
    hosts: HashMap<String, Ipv4Addr>,
    names: HashMap<IpAddr, String>,
}

impl StaticResolver {
    pub fn new() -> StaticResolver {
        let mut hosts = HashMap::new();
        hosts.insert("target.example".to_string(), TARGET);
        StaticResolver { hosts, names: HashMap::new() }
    }

    pub fn with_name(mut self, address: Ipv4Addr, name: &str) -> StaticResolver {
        self.names.insert(IpAddr::V4(address), name.to_string());
        self
    }
}

impl Resolver for StaticResolver {
    fn lookup_host(&self, host: &str) -> Result<Ipv4Addr> {
        self.hosts.get(host).copied().ok_or_else(|| icmp_probe::Error::UnresolvedHost {
            host: host.to_string(),
            reason: "not in table".to_string(),
        })
    }

    fn lookup_addr(&self, address: IpAddr) -> Option<String> {
        self.names.get(&address).cloned()
    }
}

pub fn router(n: u8) -> Ipv4Addr {
    Ipv4Addr::new(10, 0, 0, n)
}

pub fn from(source: Ipv4Addr, bytes: Vec<u8>) -> Option<Datagram> {
    Some(Datagram { bytes, source: IpAddr::V4(source) })
}

pub fn sequence_of(request: &[u8]) -> u16 {
    u16::from_be_bytes([request[6], request[7]])
}

pub fn identifier_of(request: &[u8]) -> u16 {
    u16::from_be_bytes([request[4], request[5]])
}

fn with_checksum(mut message: Vec<u8>) -> Vec<u8> {
    message[2] = 0;
    message[3] = 0;
    let sum = checksum(&message);
    message[2..4].copy_from_slice(&sum.to_be_bytes());
    message
}

/// What an echoing host sends back.
pub fn echo_reply(request: &[u8]) -> Vec<u8> {
    let mut reply = request.to_vec();
    reply[0] = 0;
    with_checksum(reply)
}

/// An echo reply whose embedded send time lies `age` in the past.
pub fn echo_reply_aged(request: &[u8], age: Duration) -> Vec<u8> {
    let mut reply = request.to_vec();
    reply[0] = 0;
    let sent = unix_time() - age.as_secs_f64();
    reply[8..16].copy_from_slice(&sent.to_ne_bytes());
    with_checksum(reply)
}

/// An ICMP error of `icmp_type`/`icmp_code` quoting the first 8 bytes of `request`.
pub fn icmp_error(icmp_type: u8, icmp_code: u8, request: &[u8]) -> Vec<u8> {
    let quoted_len = 20 + 8;
    let mut quoted = vec![0u8; quoted_len];
    {
        let mut ip = MutableIpv4Packet::new(&mut quoted).unwrap();
        ip.set_version(4);
        ip.set_header_length(5);
        ip.set_total_length(quoted_len as u16);
        ip.set_ttl(1);
        ip.set_next_level_protocol(IpNextHeaderProtocols::Icmp);
        ip.set_destination(TARGET);
    }
    quoted[20..].copy_from_slice(&request[..8]);

    let mut message = vec![icmp_type, icmp_code, 0, 0, 0, 0, 0, 0];
    message.extend(quoted);
    with_checksum(message)
}

pub fn time_exceeded(request: &[u8]) -> Vec<u8> {
    icmp_error(11, 0, request)
}

/// Time Exceeded for somebody else's echo request (identifier 0x9999, seq 40).
pub fn foreign_time_exceeded() -> Vec<u8> {
    time_exceeded(EchoRequest::new(0x9999, 40).as_bytes())
}
