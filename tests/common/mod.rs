//! Loopback fake-server helpers shared across the integration tests. Each
//! test spins up a real UDP socket on `127.0.0.1` and a background thread
//! that scripts the server side of a conversation, so the client code under
//! test runs its real socket and framing logic without reaching the network.

#![allow(dead_code)]

use std::net::{SocketAddr, UdpSocket};
use std::thread;

pub fn spawn_fake_server<F>(mut respond: F) -> SocketAddr
where
    F: FnMut(Vec<u8>, SocketAddr, &UdpSocket) + Send + 'static,
{
    let socket = UdpSocket::bind("127.0.0.1:0").expect("bind fake server");
    let addr = socket.local_addr().unwrap();
    thread::spawn(move || {
        let mut buf = [0u8; 4096];
        loop {
            match socket.recv_from(&mut buf) {
                Ok((n, peer)) => respond(buf[..n].to_vec(), peer, &socket),
                Err(_) => break,
            }
        }
    });
    addr
}

pub fn frame_single(payload: &[u8]) -> Vec<u8> {
    let mut framed = (-1i32).to_le_bytes().to_vec();
    framed.extend_from_slice(payload);
    framed
}

pub fn info_reply(game: &str) -> Vec<u8> {
    let mut p = vec![0x49, 0x11];
    p.extend_from_slice(b"Fake Server\0");
    p.extend_from_slice(b"de_fake\0");
    p.extend_from_slice(b"folder\0");
    p.extend_from_slice(game.as_bytes());
    p.push(0);
    p.extend_from_slice(&10i16.to_le_bytes());
    p.extend_from_slice(&[1, 8, 0, 0, 0, 0, 0]);
    if game == "The Ship" {
        p.extend_from_slice(&[1, 2, 60]); // mode, witnesses, duration
    }
    p.extend_from_slice(b"1.0\0");
    p.push(0x00);
    p
}

pub fn is_info_request(datagram: &[u8]) -> bool {
    datagram.len() >= 5 && datagram[4] == 0x54
}

/// True for the initial challenge-request datagram of a given command byte
/// (0x55 for Players, 0x56 for Rules), which carries the sentinel challenge
/// `FF FF FF FF` rather than one the server issued.
pub fn is_challenge_request(datagram: &[u8], command: u8) -> bool {
    if datagram.len() != 9 || datagram[4] != command {
        return false;
    }
    let mut challenge = [0u8; 4];
    challenge.copy_from_slice(&datagram[5..9]);
    challenge == [0xFF, 0xFF, 0xFF, 0xFF]
}

pub fn challenge_reply(challenge: [u8; 4]) -> Vec<u8> {
    let mut payload = vec![0x41];
    payload.extend_from_slice(&challenge);
    frame_single(&payload)
}
