//! Echo Request encoding and Echo Reply decoding.
//!
//! All offsets are relative to the start of the ICMP message; the IPv4
//! header is stripped by the transport before anything here sees the bytes.
//!
//! ```text
//!  0      1      2             4             6             8              16
//!  +------+------+-------------+-------------+-------------+--------------+---------
//!  | type | code |  checksum   | identifier  |  sequence   |  timestamp   | payload
//!  +------+------+-------------+-------------+-------------+--------------+---------
//! ```

use crate::checksum::checksum;
use crate::codes;
use crate::error::{Error, Result};
use pnet::packet::icmp::echo_reply::EchoReplyPacket;
use pnet::packet::Packet;
use pnet::packet::icmp::echo_request::{EchoRequestPacket, MutableEchoRequestPacket};
use pnet::packet::icmp::{IcmpCode, IcmpTypes};
use pnet::packet::ipv4::Ipv4Packet;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

pub const PAYLOAD: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

pub const HEADER_LEN: usize = 8;
pub const TIMESTAMP_LEN: usize = 8;
/// Smallest ICMP message that carries an echo header and a timestamp.
pub const ECHO_PREFIX_LEN: usize = HEADER_LEN + TIMESTAMP_LEN;

/// Offset of the quoted IPv4 header inside an ICMP error message.
const QUOTED_IP_OFFSET: usize = 8;

/// Seconds since the Unix epoch, the unit carried in the echo timestamp.
pub fn unix_time() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Identifier shared by every request of one run: the low 16 bits of the pid.
pub fn process_identifier() -> u16 {
    (std::process::id() & 0xffff) as u16
}

/// A packed, checksummed Echo Request.
#[derive(Debug, Clone, PartialEq)]
pub struct EchoRequest {
    identifier: u16,
    sequence_number: u16,
    timestamp_sent: f64,
    checksum: u16,
    bytes: Vec<u8>,
}

impl EchoRequest {
    /// Builds a request stamped with the current time.
    pub fn new(identifier: u16, sequence_number: u16) -> EchoRequest {
        Self::with_timestamp(identifier, sequence_number, unix_time())
    }

    pub fn with_timestamp(identifier: u16, sequence_number: u16, timestamp_sent: f64) -> EchoRequest {
        let mut data = Vec::with_capacity(TIMESTAMP_LEN + PAYLOAD.len());
        data.extend_from_slice(&timestamp_sent.to_ne_bytes());
        data.extend_from_slice(PAYLOAD.as_bytes());

        let mut bytes = vec![0u8; HEADER_LEN + data.len()];
        let Some(mut echo) = MutableEchoRequestPacket::new(&mut bytes) else {
            unreachable!("echo buffer is shorter than an ICMP header");
        };
        echo.set_icmp_type(IcmpTypes::EchoRequest);
        echo.set_icmp_code(IcmpCode::new(0));
        echo.set_checksum(0);
        echo.set_identifier(identifier);
        echo.set_sequence_number(sequence_number);
        echo.set_payload(&data);

        let checksum = checksum(echo.packet());
        echo.set_checksum(checksum);

        EchoRequest { identifier, sequence_number, timestamp_sent, checksum, bytes }
    }

    pub fn identifier(&self) -> u16 {
        self.identifier
    }

    pub fn sequence_number(&self) -> u16 {
        self.sequence_number
    }

    pub fn timestamp_sent(&self) -> f64 {
        self.timestamp_sent
    }

    pub fn checksum(&self) -> u16 {
        self.checksum
    }

    pub fn payload(&self) -> &'static str {
        PAYLOAD
    }

    /// The bytes handed to the transport.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Shorthand for [`EchoRequest::new`].
pub fn build_echo_request(identifier: u16, sequence_number: u16) -> EchoRequest {
    EchoRequest::new(identifier, sequence_number)
}

/// Lowercase hex, space separated, for packet dumps in logs.
pub struct HexBytes<'a>(pub &'a [u8]);

impl fmt::Display for HexBytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Decoded view of an Echo Reply.
#[derive(Debug, Clone, PartialEq)]
pub struct EchoReply {
    pub icmp_type: u8,
    pub icmp_code: u8,
    pub header_checksum: u16,
    pub identifier: u16,
    pub sequence_number: u16,
    pub timestamp_sent: f64,
    pub payload: String,
}

impl EchoReply {
    pub fn parse(bytes: &[u8]) -> Result<EchoReply> {
        let len = bytes.len();
        if len < ECHO_PREFIX_LEN {
            return Err(Error::MalformedPacket { len });
        }
        let packet = EchoReplyPacket::new(bytes).ok_or(Error::MalformedPacket { len })?;

        let mut stamp = [0u8; TIMESTAMP_LEN];
        stamp.copy_from_slice(&bytes[HEADER_LEN..ECHO_PREFIX_LEN]);

        Ok(EchoReply {
            icmp_type: packet.get_icmp_type().0,
            icmp_code: packet.get_icmp_code().0,
            header_checksum: packet.get_checksum(),
            identifier: packet.get_identifier(),
            sequence_number: packet.get_sequence_number(),
            timestamp_sent: f64::from_ne_bytes(stamp),
            payload: String::from_utf8_lossy(&bytes[ECHO_PREFIX_LEN..]).into_owned(),
        })
    }
}

/// Which reply fields matched the request they answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidityFlags {
    pub identifier: bool,
    pub sequence: bool,
    pub payload: bool,
}

impl ValidityFlags {
    pub fn is_valid(&self) -> bool {
        self.identifier && self.sequence && self.payload
    }

    /// Names of the fields that did not match.
    pub fn mismatches(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if !self.identifier {
            fields.push("identifier");
        }
        if !self.sequence {
            fields.push("sequence number");
        }
        if !self.payload {
            fields.push("data");
        }
        fields
    }
}

pub fn validate(request: &EchoRequest, reply: &EchoReply) -> ValidityFlags {
    ValidityFlags {
        identifier: request.identifier() == reply.identifier,
        sequence: request.sequence_number() == reply.sequence_number,
        payload: request.payload() == reply.payload,
    }
}

/// Identifier and sequence of the Echo Request quoted by an ICMP error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotedEcho {
    pub identifier: u16,
    pub sequence_number: u16,
}

/// Digs the original echo header out of an error message's quoted datagram.
pub fn quoted_echo(bytes: &[u8]) -> Option<QuotedEcho> {
    let quoted_ip = Ipv4Packet::new(bytes.get(QUOTED_IP_OFFSET..)?)?;
    let ihl = quoted_ip.get_header_length() as usize * 4;
    let original = EchoRequestPacket::new(bytes.get(QUOTED_IP_OFFSET + ihl..)?)?;
    if original.get_icmp_type().0 != codes::ECHO_REQUEST {
        return None;
    }
    Some(QuotedEcho {
        identifier: original.get_identifier(),
        sequence_number: original.get_sequence_number(),
    })
}
