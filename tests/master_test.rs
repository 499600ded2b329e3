#![cfg(not(feature = "async"))]

mod common;

use std::net::Ipv4Addr;
use std::time::Duration;

use a2s::{Filter, GroupOp, MasterEnumeration, Region, TransportConfig};

const PREAMBLE: [u8; 6] = [0xFF, 0xFF, 0xFF, 0xFF, 0x66, 0x0A];

fn record(ip: [u8; 4], port: u16) -> [u8; 6] {
    let mut r = [0u8; 6];
    r[..4].copy_from_slice(&ip);
    r[4..].copy_from_slice(&port.to_be_bytes());
    r
}

fn fast_config() -> TransportConfig {
    TransportConfig { max_retries: 1, base_timeout: Duration::from_millis(200), recv_buffer: 4096 }
}

#[test]
fn enumeration_stops_at_the_sentinel() {
    let addr = common::spawn_fake_server(|_datagram, peer, socket| {
        let mut reply = PREAMBLE.to_vec();
        reply.extend_from_slice(&record([1, 2, 3, 4], 27015));
        reply.extend_from_slice(&record([0, 0, 0, 0], 0));
        socket.send_to(&reply, peer).unwrap();
    });

    let master = MasterEnumeration::connect_to(
        &addr.to_string(),
        Region::All,
        &[Filter::Bool("dedicated".into(), true)],
        fast_config(),
    )
    .unwrap();

    let endpoints: Vec<_> = master.collect();
    assert_eq!(endpoints.len(), 1);
    assert_eq!(endpoints[0].as_ref().unwrap().ip(), Ipv4Addr::new(1, 2, 3, 4));
}

#[test]
fn enumeration_stops_after_query_cap_even_without_a_sentinel() {
    // Every response hands back one more live server and never the
    // sentinel, so only QUERY_CAP requests should ever be sent.
    let addr = common::spawn_fake_server(|_datagram, peer, socket| {
        let mut reply = PREAMBLE.to_vec();
        reply.extend_from_slice(&record([9, 9, 9, 9], 1234));
        socket.send_to(&reply, peer).unwrap();
    });

    let master = MasterEnumeration::connect_to(
        &addr.to_string(),
        Region::All,
        &[Filter::Bool("secure".into(), false)],
        fast_config(),
    )
    .unwrap();

    let endpoints: Vec<_> = master.collect();
    assert_eq!(endpoints.len(), 10);
    assert!(endpoints.iter().all(Result::is_ok));
}

#[test]
fn nested_group_filters_reach_the_wire_request() {
    let addr = common::spawn_fake_server(|datagram, peer, socket| {
        let seed_end = datagram[2..].iter().position(|&b| b == 0).unwrap() + 2;
        assert!(datagram[seed_end + 1..].starts_with(b"\\nor\\1\\secure\\1"));
        let mut reply = PREAMBLE.to_vec();
        reply.extend_from_slice(&record([0, 0, 0, 0], 0));
        socket.send_to(&reply, peer).unwrap();
    });

    let master = MasterEnumeration::connect_to(
        &addr.to_string(),
        Region::All,
        &[Filter::Group(GroupOp::Nor, vec![Filter::Bool("secure".into(), true)])],
        fast_config(),
    )
    .unwrap();

    let endpoints: Vec<_> = master.collect();
    assert!(endpoints.is_empty());
}

#[test]
fn bad_filter_is_rejected_before_any_network_io() {
    let err = MasterEnumeration::connect_to(
        "127.0.0.1:1",
        Region::All,
        &[Filter::Str("not_a_real_key".into(), "x".into())],
        fast_config(),
    )
    .unwrap_err();
    assert!(matches!(err, a2s::Error::BadFilter { .. }));
}
