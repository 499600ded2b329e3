#![cfg(not(feature = "async"))]

mod common;

use a2s::ServerQuery;

#[test]
fn info_round_trip_over_loopback() {
    let addr = common::spawn_fake_server(|datagram, peer, socket| {
        assert!(common::is_info_request(&datagram));
        let reply = common::frame_single(&common::info_reply("Half-Life"));
        socket.send_to(&reply, peer).unwrap();
    });

    let mut query = ServerQuery::connect(addr, addr.to_string()).unwrap();
    let info = query.info().unwrap();
    assert_eq!(info.name, "Fake Server");
    assert_eq!(info.game, "Half-Life");
    assert_eq!(info.map, "de_fake");

    // Cached: a second call must not require another datagram round trip.
    let info2 = query.info().unwrap();
    assert_eq!(info2.name, "Fake Server");
}

#[test]
fn refresh_info_always_hits_the_network() {
    let addr = common::spawn_fake_server(|datagram, peer, socket| {
        assert!(common::is_info_request(&datagram));
        let reply = common::frame_single(&common::info_reply("The Ship"));
        socket.send_to(&reply, peer).unwrap();
    });

    let mut query = ServerQuery::connect(addr, addr.to_string()).unwrap();
    let info = query.refresh_info().unwrap();
    assert!(info.is_the_ship());
}
