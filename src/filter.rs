//! Master Server filter-tree serialization.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::Error;

/// `nor`/`nand` group operator, for [`Filter::Group`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum GroupOp {
    Nor,
    Nand,
}

impl GroupOp {
    fn as_str(self) -> &'static str {
        match self {
            GroupOp::Nor => "nor",
            GroupOp::Nand => "nand",
        }
    }
}

/// A node in a Master Server filter tree. Constructed with a key name so a
/// single tagged enum can cover the whole recognised key table rather than
/// one variant per key; [`Filter::serialize`] rejects an unrecognised key or
/// a value type that doesn't match it with [`Error::BadFilter`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Filter {
    Str(String, String),
    Int(String, i64),
    Bool(String, bool),
    StrList(String, Vec<String>),
    Group(GroupOp, Vec<Filter>),
}

const STRING_KEYS: &[&str] = &["gamedir", "map", "name_match", "version_match", "gameaddr"];
const INT_KEYS: &[&str] = &["appid", "napp"];
const STR_LIST_KEYS: &[&str] = &["gametype", "gamedata", "gamedataor"];
const PLAIN_BOOL_KEYS: &[&str] = &["dedicated", "secure", "linux", "proxy", "whitelisted", "collapse_addr_hash"];

impl Filter {
    pub fn serialize(&self) -> Result<String, Error> {
        match self {
            Filter::Str(key, value) => {
                if STRING_KEYS.contains(&key.as_str()) {
                    Ok(format!("\\{key}\\{value}"))
                } else {
                    Err(Error::BadFilter { reason: format!("{key} is not a string-valued filter key") })
                }
            }
            Filter::Int(key, value) => {
                if INT_KEYS.contains(&key.as_str()) {
                    Ok(format!("\\{key}\\{value}"))
                } else {
                    Err(Error::BadFilter { reason: format!("{key} is not an integer-valued filter key") })
                }
            }
            Filter::StrList(key, values) => {
                if STR_LIST_KEYS.contains(&key.as_str()) {
                    Ok(format!("\\{key}\\{}", values.join(",")))
                } else {
                    Err(Error::BadFilter { reason: format!("{key} is not a list-valued filter key") })
                }
            }
            Filter::Bool(key, value) => serialize_bool(key, *value),
            Filter::Group(op, children) => {
                let mut out = format!("\\{}\\{}", op.as_str(), children.len());
                for child in children {
                    out.push_str(&child.serialize()?);
                }
                Ok(out)
            }
        }
    }
}

/// Boolean filters each carry their own sense of "true"/"false" in the wire
/// form: most invert via a `\nor\1` wrapper when false, but `password`
/// inverts on true instead, and `empty`/`full` use entirely different key
/// names for their false case.
fn serialize_bool(key: &str, value: bool) -> Result<String, Error> {
    if PLAIN_BOOL_KEYS.contains(&key) {
        return Ok(if value { format!("\\{key}\\1") } else { format!("\\nor\\1\\{key}\\1") });
    }
    match key {
        "password" => Ok(if value { "\\nor\\1\\password\\0".to_owned() } else { "\\password\\0".to_owned() }),
        "empty" => Ok(if value { "\\empty\\1".to_owned() } else { "\\noplayers\\1".to_owned() }),
        "full" => Ok(if value { "\\full\\1".to_owned() } else { "\\nor\\1\\full\\1".to_owned() }),
        _ => Err(Error::BadFilter { reason: format!("{key} is not a boolean-valued filter key") }),
    }
}
