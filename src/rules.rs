//! A2S_RULES request/response.

use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::cursor::ByteCursor;
use crate::errors::DecodeError;

/// `FF FF FF FF 56 FF FF FF FF`
pub const RULES_CHALLENGE_REQUEST: [u8; 9] = [0xFF, 0xFF, 0xFF, 0xFF, 0x56, 0xFF, 0xFF, 0xFF, 0xFF];

const CHALLENGE_COMMAND: u8 = 0x41;
const COMMAND: u8 = 0x45;

/// A server's cvar/rule table. Duplicate names in the wire response are
/// resolved last-wins.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RuleSet(pub HashMap<String, String>);

impl RuleSet {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

pub(crate) fn build_request(challenge: [u8; 4]) -> Vec<u8> {
    let mut req = vec![0xFF, 0xFF, 0xFF, 0xFF, 0x56];
    req.extend_from_slice(&challenge);
    req
}

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

/// CS:GO does not support rules queries at all; callers should short-circuit
/// before sending the request rather than calling this with an empty
/// payload.
pub(crate) fn decode(payload: &[u8]) -> Result<RuleSet, DecodeError> {
    if payload.len() < 3 {
        return Err(DecodeError::Cursor(crate::cursor::CursorError::Truncated));
    }
    if payload[0] != COMMAND {
        return Err(DecodeError::WrongCommand { expected: COMMAND, got: payload[0] });
    }

    let mut cur = ByteCursor::new(payload);
    cur.advance();
    let rule_count = cur.read_u16_le()?;

    let mut rules = HashMap::with_capacity(rule_count as usize);
    for _ in 0..rule_count {
        let name = cur.read_cstring()?;
        let value = cur.read_cstring()?;
        rules.insert(name, value);
    }
    Ok(RuleSet(rules))
}
