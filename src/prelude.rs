// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Prelude module for convenient imports
//!
//! ```rust
//! use routeros_api::prelude::*;
//! ```

// Session
pub use crate::client::{Client, ExportChannel, ReadOptions, SessionState};
pub use crate::config::{Config, SocketOptions, TlsOptions};
pub use crate::error::{Error, Result};

// Requests and replies
pub use crate::connection::parse::{Record, Reply, Response};
pub use crate::cursor::ResponseCursor;
pub use crate::query::{Query, SentenceInput, Where};

// Transport
pub use crate::transport::{Connector, TcpConnector};
