use std::net::{IpAddr, Ipv4Addr};
use crate::error::TraceError;
use crate::flow_key::{FlowKey, Protocol};
use crate::trace::parse_record;

#[test]
fn protocol_names_are_case_insensitive() {
    assert_eq!("tcp".parse::<Protocol>(), Ok(Protocol::Tcp));
    assert_eq!("UDP".parse::<Protocol>(), Ok(Protocol::Udp));
    assert_eq!("icmpv6".parse::<Protocol>(), Ok(Protocol::IcmpV6));
    assert_eq!("sctp".parse::<Protocol>(), Err("sctp".to_string()));
    assert_eq!(Protocol::Tcp.number(), 6);
    assert_eq!(Protocol::Udp.number(), 17);
    assert_eq!(Protocol::IcmpV6.to_string(), "ICMPv6");
}

#[test]
fn only_tcp_and_udp_packets_have_keys() {
    let tcp = parse_record("0.1\t60\t10.0.0.1\t10.0.0.2\ttcp\t1000\t80").unwrap();
    let udp = parse_record("0.2\t60\t10.0.0.1\t10.0.0.2\tudp\t1000\t53").unwrap();
    let icmp = parse_record("0.3\t84\t10.0.0.1\t10.0.0.2\ticmp\t8\t0").unwrap();
    assert_eq!(
        tcp.flow_key(),
        Some(FlowKey::new(Protocol::Tcp, Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2), 1000, 80))
    );
    assert_eq!(udp.flow_key().map(|key| key.protocol), Some(Protocol::Udp));
    assert_eq!(icmp.flow_key(), None);
}

#[test]
fn reversed_swaps_endpoints() {
    let key = FlowKey::new(Protocol::Tcp, Ipv4Addr::new(1, 2, 3, 4), Ipv4Addr::new(5, 6, 7, 8), 1234, 443);
    let reversed = key.reversed();
    assert_eq!(reversed.src_addr, key.dst_addr);
    assert_eq!(reversed.dst_port, key.src_port);
    assert_eq!(reversed.protocol, Protocol::Tcp);
    assert_ne!(reversed, key);
    assert_eq!(reversed.reversed(), key);
}

#[test]
fn key_encoding_is_big_endian() {
    let key = FlowKey::new(Protocol::Udp, Ipv4Addr::new(1, 2, 3, 4), Ipv4Addr::new(5, 6, 7, 8), 0x0102, 0xABCD);
    assert_eq!(key.to_be_bytes(), [17, 1, 2, 3, 4, 5, 6, 7, 8, 0x01, 0x02, 0xAB, 0xCD]);
    assert_eq!(key.to_string(), "FiveTuple{UDP, 1.2.3.4, 5.6.7.8, 258, 43981}");
}

#[test]
fn ipv6_addresses_keep_their_last_four_octets() {
    let packet = parse_record("1.0\t100\t2001:db8::a00:1\t::ffff:192.168.1.9\tudp\t53\t5353").unwrap();
    assert_eq!(packet.src_addr, "2001:db8::a00:1".parse::<IpAddr>().unwrap());
    let key = packet.flow_key().unwrap();
    assert_eq!(key.src_addr, Ipv4Addr::new(10, 0, 0, 1));
    assert_eq!(key.dst_addr, Ipv4Addr::new(192, 168, 1, 9));
}

#[test]
fn records_are_parsed_field_by_field() {
    let packet = parse_record("12.5\t1500\t10.1.1.1\t10.2.2.2\tTCP\t40000\t22\r\n").unwrap();
    assert_eq!(packet.timestamp, 12.5);
    assert_eq!(packet.length, 1500);
    assert_eq!(packet.src_port, 40000);
    assert_eq!(packet.dst_port, 22);

    // Ports may be empty for protocols without them
    let gre = parse_record("0\t80\t10.0.0.1\t10.0.0.2\tgre\t\t").unwrap();
    assert_eq!((gre.src_port, gre.dst_port), (0, 0));
}

#[test]
fn malformed_records_are_rejected() {
    assert!(matches!(parse_record("0.1\t60\t10.0.0.1\t10.0.0.2\ttcp\t1000"), Err(TraceError::FieldCount(6))));
    assert!(matches!(parse_record("soon\t60\t10.0.0.1\t10.0.0.2\ttcp\t1\t2"), Err(TraceError::Timestamp(_))));
    assert!(matches!(parse_record("0.1\t-1\t10.0.0.1\t10.0.0.2\ttcp\t1\t2"), Err(TraceError::Length(_))));
    assert!(matches!(parse_record("0.1\t60\t10.0.0\t10.0.0.2\ttcp\t1\t2"), Err(TraceError::Address { .. })));
    assert!(matches!(parse_record("0.1\t60\t10.0.0.1\t10.0.0.2\tsctp\t1\t2"), Err(TraceError::UnknownProtocol(p)) if p == "sctp"));
    assert!(matches!(parse_record("0.1\t60\t10.0.0.1\t10.0.0.2\tudp\t70000\t2"), Err(TraceError::Port { .. })));
    assert!(matches!(parse_record("0.1\t60\t10.0.0.1\t10.0.0.2\ttcp\t\t80"), Err(TraceError::Port { .. })));
}
