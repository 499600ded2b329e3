//! A2S_INFO request/response.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::cursor::ByteCursor;
use crate::errors::DecodeError;

/// `FF FF FF FF 54 "Source Engine Query" 00`
pub const INFO_REQUEST: [u8; 25] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0x54, 0x53, 0x6F, 0x75, 0x72, 0x63, 0x65, 0x20, 0x45, 0x6E, 0x67, 0x69, 0x6E, 0x65, 0x20,
    0x51, 0x75, 0x65, 0x72, 0x79, 0x00,
];

const COMMAND: u8 = 0x49;
const SHIP_GAME_NAME: &str = "The Ship";
const CSGO_GAME_NAME: &str = "Counter-Strike: Global Offensive";

/// The Ship's extra pre-EDF fields, present only when `game == "The Ship"`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TheShipInfo {
    pub mode: u8,
    pub witnesses: u8,
    pub duration: u8,
}

/// A server's self-description, as yielded by a successful Info query.
/// Optional fields are populated according to the EDF bitmask; if
/// `game_id` is present `app_id` has already been overwritten with its low
/// 24 bits.
///
/// `app_id` is widened to `i32` rather than the data model's literal `i16`:
/// the EDF `game_id` overwrite masks to `0x00FF_FFFF`, which can exceed
/// `i16::MAX` (see DESIGN.md).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ServerInfo {
    pub protocol: u8,
    pub name: String,
    pub map: String,
    pub folder: String,
    pub game: String,
    pub app_id: i32,
    pub players: u8,
    pub max_players: u8,
    pub bots: u8,
    pub server_type: u8,
    pub environment: u8,
    pub visibility: u8,
    pub vac: u8,
    pub the_ship: Option<TheShipInfo>,
    pub version: String,
    pub edf: u8,
    pub port: Option<u16>,
    pub steam_id: Option<u64>,
    pub sourcetv_port: Option<u16>,
    pub sourcetv_name: Option<String>,
    pub keywords: Option<String>,
    pub game_id: Option<u64>,
}

impl ServerInfo {
    pub fn is_the_ship(&self) -> bool {
        self.game == SHIP_GAME_NAME
    }

    pub fn is_csgo(&self) -> bool {
        self.game == CSGO_GAME_NAME
    }
}

pub(crate) fn decode(payload: &[u8]) -> Result<ServerInfo, DecodeError> {
    // The raw response must be at least 23 bytes including the 4-byte
    // framing header, i.e. 19 bytes of this already-stripped payload.
    if payload.len() < 19 {
        return Err(DecodeError::Cursor(crate::cursor::CursorError::Truncated));
    }

    let mut cur = ByteCursor::new(payload);
    let command = cur.read_u8()?;
    if command != COMMAND {
        return Err(DecodeError::WrongCommand { expected: COMMAND, got: command });
    }

    let protocol = cur.read_u8()?;
    let name = cur.read_cstring()?;
    let map = cur.read_cstring()?;
    let folder = cur.read_cstring()?;
    let game = cur.read_cstring()?;
    let mut app_id = cur.read_i16_le()? as i32;
    let players = cur.read_u8()?;
    let max_players = cur.read_u8()?;
    let bots = cur.read_u8()?;
    let server_type = cur.read_u8()?;
    let environment = cur.read_u8()?;
    let visibility = cur.read_u8()?;
    let vac = cur.read_u8()?;

    let the_ship = if game == SHIP_GAME_NAME {
        Some(TheShipInfo {
            mode: cur.read_u8()?,
            witnesses: cur.read_u8()?,
            duration: cur.read_u8()?,
        })
    } else {
        None
    };

    let version = cur.read_cstring()?;

    // EDF may be absent on very old servers; treat running off the end here
    // as "no EDF" rather than a hard failure.
    let edf = if cur.is_empty() { 0 } else { cur.read_u8()? };

    let mut port = None;
    let mut steam_id = None;
    let mut sourcetv_port = None;
    let mut sourcetv_name = None;
    let mut keywords = None;
    let mut game_id = None;

    if edf & 0x80 != 0 {
        port = Some(cur.read_u16_le()?);
    }
    if edf & 0x10 != 0 {
        steam_id = Some(cur.read_u64_le()?);
    }
    if edf & 0x40 != 0 {
        sourcetv_port = Some(cur.read_u16_le()?);
        sourcetv_name = Some(cur.read_cstring()?);
    }
    if edf & 0x20 != 0 {
        keywords = Some(cur.read_cstring()?);
    }
    if edf & 0x01 != 0 {
        let gid = cur.read_u64_le()?;
        game_id = Some(gid);
        app_id = (gid & 0x00FF_FFFF) as i32;
    }

    Ok(ServerInfo {
        protocol,
        name,
        map,
        folder,
        game,
        app_id,
        players,
        max_players,
        bots,
        server_type,
        environment,
        visibility,
        vac,
        the_ship,
        version,
        edf,
        port,
        steam_id,
        sourcetv_port,
        sourcetv_name,
        keywords,
        game_id,
    })
}
