//! Master Server region codes.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A region code accepted by the Steam Master Server's enumeration request.
/// `All` is not "no region" — Valve documents it as selecting every region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum Region {
    UsEastCoast = 0x00,
    UsWestCoast = 0x01,
    SouthAmerica = 0x02,
    Europe = 0x03,
    Asia = 0x04,
    Australia = 0x05,
    MiddleEast = 0x06,
    Africa = 0x07,
    All = 0xFF,
}

impl Region {
    pub fn code(self) -> u8 {
        self as u8
    }
}
