use std::fmt::{Display, Formatter};
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

/// IP protocols which can appear in a trace, numbered as assigned by IANA
///
/// Only TCP and UDP packets are cached, the rest are recognised so a trace containing them can
/// still be replayed
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum Protocol {
    Icmp = 1,
    Igmp = 2,
    IpIp = 4,
    Tcp = 6,
    Egp = 8,
    Igp = 9,
    Udp = 17,
    Rsvp = 46,
    Gre = 47,
    Esp = 50,
    Ah = 51,
    IcmpV6 = 58,
    Eigrp = 88,
    Ospf = 89,
    Vrrp = 112,
    L2tp = 115,
}

impl Protocol {
    /// The protocol number, as carried in the IPv4 header
    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Protocol::Icmp => "ICMP",
            Protocol::Igmp => "IGMP",
            Protocol::IpIp => "IPIP",
            Protocol::Tcp => "TCP",
            Protocol::Egp => "EGP",
            Protocol::Igp => "IGP",
            Protocol::Udp => "UDP",
            Protocol::Rsvp => "RSVP",
            Protocol::Gre => "GRE",
            Protocol::Esp => "ESP",
            Protocol::Ah => "AH",
            Protocol::IcmpV6 => "ICMPv6",
            Protocol::Eigrp => "EIGRP",
            Protocol::Ospf => "OSPF",
            Protocol::Vrrp => "VRRP",
            Protocol::L2tp => "L2TP",
        }
    }
}

impl FromStr for Protocol {
    type Err = String;

    /// Protocol names are matched case-insensitively, so both `tcp` and `TCP` are accepted
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const ALL: [Protocol; 16] = [
            Protocol::Icmp, Protocol::Igmp, Protocol::IpIp, Protocol::Tcp,
            Protocol::Egp, Protocol::Igp, Protocol::Udp, Protocol::Rsvp,
            Protocol::Gre, Protocol::Esp, Protocol::Ah, Protocol::IcmpV6,
            Protocol::Eigrp, Protocol::Ospf, Protocol::Vrrp, Protocol::L2tp,
        ];
        ALL.into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| s.to_string())
    }
}

impl Display for Protocol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The five-tuple identifying one direction of a flow. This is the key every cache is indexed by
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct FlowKey {
    pub protocol: Protocol,
    pub src_addr: Ipv4Addr,
    pub dst_addr: Ipv4Addr,
    pub src_port: u16,
    pub dst_port: u16,
}

impl FlowKey {
    pub fn new(protocol: Protocol, src_addr: Ipv4Addr, dst_addr: Ipv4Addr, src_port: u16, dst_port: u16) -> Self {
        Self {
            protocol,
            src_addr,
            dst_addr,
            src_port,
            dst_port,
        }
    }

    /// Derives the key for a packet. Only TCP and UDP packets have one, anything else is never
    /// cached
    pub fn from_packet(packet: &Packet) -> Option<Self> {
        match packet.protocol {
            Protocol::Tcp | Protocol::Udp => Some(Self::new(
                packet.protocol,
                address_to_v4(packet.src_addr),
                address_to_v4(packet.dst_addr),
                packet.src_port,
                packet.dst_port,
            )),
            _ => None,
        }
    }

    /// The key of the reply direction of the same flow
    pub fn reversed(&self) -> Self {
        Self {
            protocol: self.protocol,
            src_addr: self.dst_addr,
            dst_addr: self.src_addr,
            src_port: self.dst_port,
            dst_port: self.src_port,
        }
    }

    /// The canonical big-endian encoding: protocol, source and destination address, then source
    /// and destination port
    pub fn to_be_bytes(&self) -> [u8; 13] {
        let mut out = [0u8; 13];
        out[0] = self.protocol.number();
        out[1..5].copy_from_slice(&self.src_addr.octets());
        out[5..9].copy_from_slice(&self.dst_addr.octets());
        out[9..11].copy_from_slice(&self.src_port.to_be_bytes());
        out[11..13].copy_from_slice(&self.dst_port.to_be_bytes());
        out
    }
}

impl Display for FlowKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "FiveTuple{{{}, {}, {}, {}, {}}}", self.protocol, self.src_addr, self.dst_addr, self.src_port, self.dst_port)
    }
}

/// Keys only hold 32 bit addresses, IPv6 addresses are reduced to their last four octets
fn address_to_v4(addr: IpAddr) -> Ipv4Addr {
    match addr {
        IpAddr::V4(v4) => v4,
        IpAddr::V6(v6) => {
            let octets = v6.octets();
            Ipv4Addr::new(octets[12], octets[13], octets[14], octets[15])
        }
    }
}

/// A decoded trace record
///
/// For ICMP packets the port fields hold the ICMP type and code
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    pub timestamp: f64,
    pub length: u32,
    pub protocol: Protocol,
    pub src_addr: IpAddr,
    pub dst_addr: IpAddr,
    pub src_port: u16,
    pub dst_port: u16,
}

impl Packet {
    pub fn flow_key(&self) -> Option<FlowKey> {
        FlowKey::from_packet(self)
    }
}
