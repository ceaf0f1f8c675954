// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! # RouterOS API
//!
//! Client for the MikroTik RouterOS binary API (ports 8728/8729).
//!
//! ```no_run
//! use routeros_api::{Client, Config, Reply};
//!
//! # async fn run() -> routeros_api::Result<()> {
//! let mut client = Client::open(Config::new("192.168.88.1", "admin", "secret")).await?;
//! let reply = client
//!     .query_read("/interface/print", None, None, None, Default::default())
//!     .await?;
//! if let Reply::Data(response) = reply {
//!     for row in &response.rows {
//!         println!("{}", row["name"]);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Main modules
//! - `client`: session with connect/login, query and read
//! - `blocking`: the same session behind a synchronous API
//! - `config`: connection parameters
//! - `query`: sentence and filter construction
//! - `cursor`: lazily parsed view over large replies
//! - `transport`: TCP/TLS stream setup
//! - `protocol`: word length codec and reply parser
//! - `prelude`: commonly used types and traits

pub mod blocking;
mod client;
mod config;
mod connection;
mod cursor;
mod error;
pub mod prelude;
mod query;
mod transport;

/// Word codec and reply parsing
pub mod protocol {
    pub use crate::connection::parse::{DONE, FATAL, RE, TRAP, parse_reply, split_attribute};
    pub use crate::connection::protocol::{
        MAX_WORD_LENGTH, continuation_bytes, decode_length, encode_length, read_length,
        read_word, write_word,
    };
}

/// Session client and read options
pub use client::{Client, ExportChannel, ReadOptions, SessionState};

/// Connection parameters
pub use config::{Config, SocketOptions, TlsOptions, defaults};

/// Error and result types
pub use error::{Error, ProtocolError, Result, TransportError};

/// Parsed replies
pub use connection::parse::{Record, Reply, Response};

/// Sentence construction
pub use query::{OPERATORS, Query, SentenceInput, Where};

pub use cursor::ResponseCursor;

/// Stream setup
pub use transport::{Connector, TcpConnector, Transport};
