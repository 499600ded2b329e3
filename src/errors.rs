use std::io;

use thiserror::Error;

use crate::cursor::CursorError;

/// Error raised while decoding a payload that has already passed through the
/// framer and been stripped of its split/compression framing. Kept separate
/// from [`Error`] because decoders don't know which endpoint produced the
/// bytes; the query facade attaches that via [`Error::from_decode`].
#[derive(Debug, Error)]
pub(crate) enum DecodeError {
    #[error(transparent)]
    Cursor(#[from] CursorError),

    #[error("response command byte {got:#04x} did not match expected {expected:#04x}")]
    WrongCommand { expected: u8, got: u8 },

    #[error("trailing The Ship player block size does not match the player count")]
    ShipTailMismatch,
}

/// All errors the crate can surface to a caller. Every variant that
/// originates from a conversation with a specific server or the master
/// carries that endpoint so the failure is self-describing.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{endpoint}: connection closed")]
    Closed { endpoint: String },

    #[error("{endpoint}: timed out waiting for a response")]
    Timeout { endpoint: String },

    #[error("{endpoint}: transport error")]
    Transport {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    #[error("{endpoint}: invalid packet header")]
    InvalidHeader { endpoint: String },

    #[error("{endpoint}: bad fragment: {reason}")]
    BadFragment { endpoint: String, reason: &'static str },

    #[error("{endpoint}: decompressed payload size did not match the advertised size")]
    CompressionMismatch { endpoint: String },

    #[error("{endpoint}: buffer truncated while reading a response")]
    Truncated { endpoint: String },

    #[error("{endpoint}: string ran off the end of a response before a NUL terminator")]
    StringTruncated { endpoint: String },

    #[error("{endpoint}: invalid utf-8 in a response string field")]
    Encoding { endpoint: String },

    #[error("invalid filter: {reason}")]
    BadFilter { reason: String },

    #[error("{endpoint}: unsupported: {reason}")]
    Unsupported { endpoint: String, reason: &'static str },

    #[error("{endpoint}: response command byte {got:#04x} did not match expected {expected:#04x}")]
    ProtocolHeaderMismatch {
        endpoint: String,
        expected: u8,
        got: u8,
    },

    #[error("invalid connection string {0:?}")]
    InvalidConnectionString(String),

    #[error("master server timed out waiting for a response")]
    MasterTimeout,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn from_decode(endpoint: &str, err: DecodeError) -> Error {
        match err {
            DecodeError::Cursor(CursorError::Truncated) => Error::Truncated {
                endpoint: endpoint.to_owned(),
            },
            DecodeError::Cursor(CursorError::StringTruncated) => Error::StringTruncated {
                endpoint: endpoint.to_owned(),
            },
            DecodeError::Cursor(CursorError::Encoding) => Error::Encoding {
                endpoint: endpoint.to_owned(),
            },
            DecodeError::WrongCommand { expected, got } => Error::ProtocolHeaderMismatch {
                endpoint: endpoint.to_owned(),
                expected,
                got,
            },
            DecodeError::ShipTailMismatch => Error::Truncated {
                endpoint: endpoint.to_owned(),
            },
        }
    }
}
