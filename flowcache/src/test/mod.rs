use std::net::Ipv4Addr;
use crate::flow_key::{FlowKey, Protocol};

mod flow_key;
mod leaf_engines;

/// A distinct TCP key per `n`, none of which are the reverse of another
fn tcp_key(n: u16) -> FlowKey {
    FlowKey::new(Protocol::Tcp, Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 1, 1), 10_000 + n, 80)
}

fn udp_key(n: u16) -> FlowKey {
    FlowKey::new(Protocol::Udp, Ipv4Addr::new(10, 0, 0, 2), Ipv4Addr::new(10, 0, 1, 2), 20_000 + n, 53)
}
