//! A client for Valve's A2S server query protocol (Source and GoldSrc) and
//! the Steam Master Server protocol.
//!
//! [`ServerQuery`] talks to a single game server: Info, Players, Rules, and
//! a bare Ping. [`MasterEnumeration`] walks the Steam Master Server's server
//! list for a region and filter. Both come in sync and async flavors
//! selected by the `async` feature; enable `serialization` to derive
//! `serde::{Serialize, Deserialize}` on every public data type.

mod cursor;
mod endpoint;
mod errors;
mod filter;
mod framer;
mod info;
mod master;
mod players;
mod query;
mod region;
mod rules;
mod transport;

pub use crate::endpoint::ServerEndpoint;
pub use crate::errors::{Error, Result};
pub use crate::filter::{Filter, GroupOp};
pub use crate::info::{ServerInfo, TheShipInfo};
pub use crate::master::MasterEnumeration;
pub use crate::players::{PlayerRecord, PlayerRoster};
pub use crate::query::ServerQuery;
pub use crate::region::Region;
pub use crate::rules::RuleSet;
pub use crate::transport::TransportConfig;
