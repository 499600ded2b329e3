//! A2S_PLAYER request/response.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::cursor::ByteCursor;
use crate::errors::DecodeError;

/// `FF FF FF FF 55 FF FF FF FF`
pub const PLAYER_CHALLENGE_REQUEST: [u8; 9] = [0xFF, 0xFF, 0xFF, 0xFF, 0x55, 0xFF, 0xFF, 0xFF, 0xFF];

const CHALLENGE_COMMAND: u8 = 0x41;
const COMMAND: u8 = 0x44;

/// A single player's scoreboard line. `deaths`/`money` are only populated
/// for The Ship, where they're read from a separate trailing block.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PlayerRecord {
    pub index: u8,
    pub score: i32,
    pub duration_seconds: f32,
    pub deaths: Option<i32>,
    pub money: Option<i32>,
}

/// A decoded A2S_PLAYER reply: either a roster, or — on CS:GO servers with
/// player reporting disabled in a specific degenerate way — a bare
/// `(max_players, uptime)` pair.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PlayerRoster {
    Players { count: u8, players: Vec<(PlayerRecord, String)> },
    Degenerate { max_players: u8, uptime_seconds: f32 },
}

pub(crate) fn build_request(challenge: [u8; 4]) -> Vec<u8> {
    let mut req = vec![0xFF, 0xFF, 0xFF, 0xFF, 0x55];
    req.extend_from_slice(&challenge);
    req
}

/// Parses the challenge reply's payload — already stripped of the 4-byte
/// single-packet header by the framer, so a 5-byte buffer here corresponds
/// to the 9-byte datagram on the wire — returning the 4-byte challenge to
/// echo back verbatim in the real request.
pub(crate) fn decode_challenge(payload: &[u8]) -> Result<[u8; 4], DecodeError> {
    if payload.len() != 5 {
        return Err(DecodeError::Cursor(crate::cursor::CursorError::Truncated));
    }
    if payload[0] != CHALLENGE_COMMAND {
        return Err(DecodeError::WrongCommand { expected: CHALLENGE_COMMAND, got: payload[0] });
    }
    let mut challenge = [0u8; 4];
    challenge.copy_from_slice(&payload[1..5]);
    Ok(challenge)
}

pub(crate) fn decode(payload: &[u8], is_csgo: bool, is_the_ship: bool) -> Result<PlayerRoster, DecodeError> {
    if payload.len() < 2 {
        return Err(DecodeError::Cursor(crate::cursor::CursorError::Truncated));
    }
    if payload[0] != COMMAND {
        return Err(DecodeError::WrongCommand { expected: COMMAND, got: payload[0] });
    }

    if is_csgo && payload.len() == 6 {
        let mut cur = ByteCursor::new(&payload[1..]);
        let max_players = cur.read_u8()?;
        let uptime_seconds = cur.read_f32_le()?;
        return Ok(PlayerRoster::Degenerate { max_players, uptime_seconds });
    }

    let mut cur = ByteCursor::new(payload);
    cur.advance();
    let count = cur.read_u8()?;

    if is_the_ship {
        let mut heads = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let index = cur.read_u8()?;
            let name = cur.read_cstring()?;
            let score = cur.read_i32_le()?;
            let duration_seconds = cur.read_f32_le()?;
            heads.push((index, name, score, duration_seconds));
        }
        if cur.remaining_slice().len() != heads.len() * 8 {
            return Err(DecodeError::ShipTailMismatch);
        }
        let mut players = Vec::with_capacity(heads.len());
        for (index, name, score, duration_seconds) in heads {
            let deaths = cur.read_i32_le()?;
            let money = cur.read_i32_le()?;
            players.push((
                PlayerRecord { index, score, duration_seconds, deaths: Some(deaths), money: Some(money) },
                name,
            ));
        }
        Ok(PlayerRoster::Players { count, players })
    } else {
        // Read until the cursor runs dry rather than stopping at `count`,
        // tolerating the "joining player with blank name" server anomaly.
        let mut players = Vec::new();
        while !cur.is_empty() {
            let index = cur.read_u8()?;
            let name = cur.read_cstring()?;
            let score = cur.read_i32_le()?;
            let duration_seconds = cur.read_f32_le()?;
            players.push((PlayerRecord { index, score, duration_seconds, deaths: None, money: None }, name));
        }
        Ok(PlayerRoster::Players { count, players })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player_bytes(index: u8, name: &str, score: i32, duration: f32) -> Vec<u8> {
        let mut b = vec![index];
        b.extend_from_slice(name.as_bytes());
        b.push(0);
        b.extend_from_slice(&score.to_le_bytes());
        b.extend_from_slice(&duration.to_le_bytes());
        b
    }

    #[test]
    fn decodes_challenge_reply() {
        let reply = [0x41, 0x01, 0x02, 0x03, 0x04];
        assert_eq!(decode_challenge(&reply).unwrap(), [1, 2, 3, 4]);
    }

    #[test]
    fn rejects_wrong_challenge_command() {
        let reply = [0x00, 0x01, 0x02, 0x03, 0x04];
        assert!(decode_challenge(&reply).is_err());
    }

    #[test]
    fn decodes_a_normal_roster() {
        let mut p = vec![0x44, 0x02];
        p.extend(player_bytes(0, "Alice", 10, 120.5));
        p.extend(player_bytes(1, "Bob", 20, 300.25));

        let roster = decode(&p, false, false).unwrap();
        match roster {
            PlayerRoster::Players { count, players } => {
                assert_eq!(count, 2);
                assert_eq!(players.len(), 2);
                assert_eq!(players[0].1, "Alice");
                assert_eq!(players[0].0.score, 10);
                assert_eq!(players[1].1, "Bob");
                assert!(players[0].0.deaths.is_none());
            }
            _ => panic!("expected Players"),
        }
    }

    #[test]
    fn tolerates_more_records_than_count_for_non_ship_games() {
        let mut p = vec![0x44, 0x01];
        p.extend(player_bytes(0, "Alice", 10, 1.0));
        p.extend(player_bytes(1, "", 0, 0.0));

        let roster = decode(&p, false, false).unwrap();
        match roster {
            PlayerRoster::Players { count, players } => {
                assert_eq!(count, 1);
                assert_eq!(players.len(), 2);
            }
            _ => panic!("expected Players"),
        }
    }

    #[test]
    fn csgo_degenerate_reply_is_detected() {
        let mut p = vec![0x44];
        p.push(16);
        p.extend_from_slice(&1234.5f32.to_le_bytes());
        let roster = decode(&p, true, false).unwrap();
        assert_eq!(roster, PlayerRoster::Degenerate { max_players: 16, uptime_seconds: 1234.5 });
    }

    #[test]
    fn the_ship_pairs_head_records_with_tail_block_in_order() {
        let mut p = vec![0x44, 0x02];
        p.extend(player_bytes(0, "Alice", 10, 1.0));
        p.extend(player_bytes(1, "Bob", 20, 2.0));
        // tail: Alice (deaths=3, money=400), Bob (deaths=5, money=600)
        p.extend_from_slice(&3i32.to_le_bytes());
        p.extend_from_slice(&400i32.to_le_bytes());
        p.extend_from_slice(&5i32.to_le_bytes());
        p.extend_from_slice(&600i32.to_le_bytes());

        let roster = decode(&p, false, true).unwrap();
        match roster {
            PlayerRoster::Players { players, .. } => {
                assert_eq!(players[0].1, "Alice");
                assert_eq!(players[0].0.deaths, Some(3));
                assert_eq!(players[0].0.money, Some(400));
                assert_eq!(players[1].1, "Bob");
                assert_eq!(players[1].0.deaths, Some(5));
                assert_eq!(players[1].0.money, Some(600));
            }
            _ => panic!("expected Players"),
        }
    }

    #[test]
    fn the_ship_tail_shorter_than_count_is_truncated_error() {
        let mut p = vec![0x44, 0x01];
        p.extend(player_bytes(0, "Alice", 10, 1.0));
        // missing tail block entirely
        assert!(decode(&p, false, true).is_err());
    }

    #[test]
    fn wrong_command_byte_is_rejected() {
        let p = vec![0x00, 0x00];
        assert!(matches!(decode(&p, false, false), Err(DecodeError::WrongCommand { .. })));
    }
}
