use pnet::packet::Packet;
use pnet::packet::icmp::IcmpPacket;
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::transport::TransportChannelType::Layer4;
use pnet::transport::TransportProtocol::Ipv4;
use pnet::transport::{TransportReceiver, TransportSender, icmp_packet_iter, transport_channel};
use std::io;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

const BUFFER_SIZE: usize = 1024;

/// Shortest wait handed to the socket. A receive timeout that truncates to
/// zero microseconds disables the timeout instead.
const MIN_READ_TIMEOUT: Duration = Duration::from_millis(1);

/// An ICMP message as read off the wire, IPv4 header already stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    pub bytes: Vec<u8>,
    pub source: IpAddr,
}

/// Opens one channel per probe. Dropping the channel releases the socket.
pub trait IcmpTransport {
    type Channel: IcmpChannel;

    fn open(&self, ttl: u8) -> io::Result<Self::Channel>;
}

pub trait IcmpChannel {
    fn send_to(&mut self, packet: &[u8], destination: Ipv4Addr) -> io::Result<()>;

    /// Waits until a datagram is readable or `timeout` elapses.
    /// `Ok(None)` means nothing arrived in time.
    fn recv_timeout(&mut self, timeout: Duration) -> io::Result<Option<Datagram>>;
}

/// Raw ICMP sockets through `pnet`. Needs root or CAP_NET_RAW.
#[derive(Debug, Default, Clone, Copy)]
pub struct PnetTransport;

pub struct PnetChannel {
    sender: TransportSender,
    receiver: TransportReceiver,
}

impl IcmpTransport for PnetTransport {
    type Channel = PnetChannel;

    fn open(&self, ttl: u8) -> io::Result<PnetChannel> {
        let (mut sender, receiver) =
            transport_channel(BUFFER_SIZE, Layer4(Ipv4(IpNextHeaderProtocols::Icmp)))?;
        sender.set_ttl(ttl)?;
        Ok(PnetChannel { sender, receiver })
    }
}

impl IcmpChannel for PnetChannel {
    fn send_to(&mut self, packet: &[u8], destination: Ipv4Addr) -> io::Result<()> {
        let icmp = IcmpPacket::new(packet).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "packet shorter than an ICMP header")
        })?;
        self.sender.send_to(icmp, IpAddr::V4(destination))?;
        Ok(())
    }

    fn recv_timeout(&mut self, timeout: Duration) -> io::Result<Option<Datagram>> {
        let mut packets = icmp_packet_iter(&mut self.receiver);
        Ok(packets.next_with_timeout(read_timeout(timeout))?.map(|(packet, source)| Datagram {
            bytes: packet.packet().to_vec(),
            source,
        }))
    }
}

fn read_timeout(timeout: Duration) -> Duration {
    timeout.max(MIN_READ_TIMEOUT)
}
