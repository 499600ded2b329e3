#![cfg(feature = "async")]

use a2s::ServerQuery;
use futures::future;
use std::net::{SocketAddr, UdpSocket};
use std::thread;

fn spawn_fake_server() -> std::net::SocketAddr {
    let socket = UdpSocket::bind("127.0.0.1:0").expect("bind fake server");
    let addr = socket.local_addr().unwrap();
    thread::spawn(move || {
        let mut buf = [0u8; 4096];
        loop {
            match socket.recv_from(&mut buf) {
                Ok((n, peer)) if n >= 5 && buf[4] == 0x54 => {
                    let mut payload = vec![0x49, 0x11];
                    payload.extend_from_slice(b"Async Server\0de_fake\0folder\0Half-Life\0");
                    payload.extend_from_slice(&10i16.to_le_bytes());
                    payload.extend_from_slice(&[1, 8, 0, 0, 0, 0, 0]);
                    payload.extend_from_slice(b"1.0\0");
                    payload.push(0);
                    let mut framed = (-1i32).to_le_bytes().to_vec();
                    framed.extend_from_slice(&payload);
                    socket.send_to(&framed, peer).unwrap();
                }
                Ok(_) => {}
                Err(_) => break,
            }
        }
    });
    addr
}

#[tokio::test]
async fn async_info_round_trip_over_loopback() {
    let addr = spawn_fake_server();
    let mut query = ServerQuery::connect(addr, addr.to_string()).await.unwrap();
    let info = query.info().await.unwrap();
    assert_eq!(info.name, "Async Server");
    assert_eq!(info.game, "Half-Life");
}

/// Fans Info queries out across several independent loopback servers
/// concurrently, using `future::join_all` to connect and a manual
/// `Box::pin`/`select_all` drain to collect results as each query
/// finishes, since each `ServerQuery` owns its own socket and there is
/// no restriction on running many sessions side by side.
#[tokio::test]
async fn async_info_queries_fan_out_across_servers() {
    let addrs: Vec<SocketAddr> = (0..3).map(|_| spawn_fake_server()).collect();

    let connects = addrs.iter().map(|a| ServerQuery::connect(*a, a.to_string()));
    let queries = future::join_all(connects).await;

    let mut fut: Vec<_> = queries
        .into_iter()
        .map(|q| q.unwrap())
        .map(|mut q| Box::pin(async move { q.info().await.map(|info| info.name.clone()) }))
        .collect();

    let mut names = Vec::new();
    while !fut.is_empty() {
        let (result, _index, remaining) = future::select_all(fut).await;
        names.push(result.unwrap());
        fut = remaining;
    }

    assert_eq!(names.len(), 3);
    assert!(names.iter().all(|n| n == "Async Server"));
}
