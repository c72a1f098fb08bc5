use std::net::IpAddr;
use crate::error::TraceError;
use crate::flow_key::{Packet, Protocol};

const FIELD_COUNT: usize = 7;

/// Parses one tab separated trace record
///
/// The fields are timestamp, length, source address, destination address, protocol, source port
/// and destination port. TCP and UDP records must carry both ports, other protocols may leave them
/// empty, in which case they read as 0
///
/// # Examples
///
/// ```
/// use flowcache::flow_key::Protocol;
/// use flowcache::trace::parse_record;
/// let packet = parse_record("0.5\t60\t10.0.0.1\t10.0.0.2\ttcp\t1000\t80").unwrap();
/// assert_eq!(packet.protocol, Protocol::Tcp);
/// assert_eq!(packet.dst_port, 80);
/// ```
pub fn parse_record(line: &str) -> Result<Packet, TraceError> {
    let fields = line.trim_end_matches(|c| c == '\r' || c == '\n')
        .split('\t')
        .collect::<Vec<_>>();
    if fields.len() != FIELD_COUNT {
        return Err(TraceError::FieldCount(fields.len()));
    }
    let timestamp = fields[0].parse::<f64>().map_err(TraceError::Timestamp)?;
    let length = fields[1].parse::<u32>().map_err(TraceError::Length)?;
    let src_addr = parse_address(fields[2])?;
    let dst_addr = parse_address(fields[3])?;
    let protocol = fields[4].parse::<Protocol>().map_err(TraceError::UnknownProtocol)?;
    let ports_required = matches!(protocol, Protocol::Tcp | Protocol::Udp);
    Ok(Packet {
        timestamp,
        length,
        protocol,
        src_addr,
        dst_addr,
        src_port: parse_port(fields[5], ports_required)?,
        dst_port: parse_port(fields[6], ports_required)?,
    })
}

fn parse_address(value: &str) -> Result<IpAddr, TraceError> {
    value.parse::<IpAddr>().map_err(|source| TraceError::Address {
        value: value.to_string(),
        source,
    })
}

fn parse_port(value: &str, required: bool) -> Result<u16, TraceError> {
    if value.is_empty() && !required {
        return Ok(0);
    }
    value.parse::<u16>().map_err(|source| TraceError::Port {
        value: value.to_string(),
        source,
    })
}
