// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Error types for the RouterOS API client

use thiserror::Error;

/// Main client error type
#[derive(Debug, Error)]
pub enum Error {
    /// Missing, unknown or mistyped configuration parameter
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport could not be brought up within the configured attempts
    #[error("Unable to connect to {address} after {attempts} attempt(s): {source}")]
    Connect {
        address: String,
        attempts: u32,
        #[source]
        source: TransportError,
    },

    /// Router answered `/login` with `!trap`
    #[error("Invalid user name or password")]
    BadCredentials,

    /// Sentence could not be built from the given input
    #[error("Query error: {0}")]
    Query(String),

    /// Read, write or close failure on the byte stream
    #[error("Stream error: {0}")]
    Stream(#[from] std::io::Error),

    /// Wire-level framing or login exchange error
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Export side-channel failure
    #[error("Export error: {0}")]
    Export(String),

    /// Cursor snapshot could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failure to open the transport, carrying the OS error code when there is one
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    pub code: Option<i32>,
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for TransportError {
    fn from(error: std::io::Error) -> Self {
        Self {
            code: error.raw_os_error(),
            message: error.to_string(),
        }
    }
}

/// Errors raised by the wire protocol layer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// First length byte matched `11111xxx`, which is reserved for control words
    #[error("unexpected control word {0:#04X}")]
    ControlWord(u8),

    /// Word is longer than the 5-byte length prefix can express
    #[error("word length {0:#X} exceeds the protocol maximum")]
    LengthOutOfRange(u64),

    /// Decoded length does not fit the platform's native integer
    #[error("word length {0:#X} does not fit in memory on this platform")]
    LengthOverflow(u64),

    /// Buffer ended before the length prefix did
    #[error("truncated length prefix: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    /// Legacy login reply carried no `ret` attribute
    #[error("no challenge 'ret' received")]
    MissingChallenge,

    /// Legacy login challenge is not valid hex
    #[error("malformed login challenge '{0}'")]
    MalformedChallenge(String),

    /// Login reply was neither `!trap` nor a lone `!done`
    #[error("unexpected login reply {0:?}")]
    UnexpectedLoginReply(Vec<String>),
}

/// Convenient alias for Result with client error
pub type Result<T> = std::result::Result<T, Error>;
