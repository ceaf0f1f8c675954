// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Synchronous wrapper around [`crate::Client`]
//!
//! Every call blocks the current thread on a private current-thread runtime,
//! so this client must not be used from inside an async context.

use tokio::runtime::{Builder, Runtime};

use crate::client::{self, ExportChannel, ReadOptions, SessionState};
use crate::config::Config;
use crate::connection::parse::Reply;
use crate::cursor::ResponseCursor;
use crate::error::Result;
use crate::query::{SentenceInput, Where};
use crate::transport::{Connector, TcpConnector};

/// Blocking `RouterOS` API client
pub struct Client<C: Connector = TcpConnector> {
    runtime: Runtime,
    inner: client::Client<C>,
}

fn runtime() -> Result<Runtime> {
    Ok(Builder::new_current_thread().enable_all().build()?)
}

impl Client<TcpConnector> {
    /// Creates a client over TCP without connecting.
    pub fn new(config: Config) -> Result<Self> {
        Self::with_connector(config, TcpConnector)
    }

    /// Creates a client over TCP and connects it.
    pub fn open(config: Config) -> Result<Self> {
        let mut client = Self::new(config)?;
        client.connect()?;
        Ok(client)
    }
}

impl<C: Connector> Client<C> {
    pub fn with_connector(config: Config, connector: C) -> Result<Self> {
        Ok(Self {
            runtime: runtime()?,
            inner: client::Client::with_connector(config, connector)?,
        })
    }

    #[must_use]
    pub fn with_export_channel(self, channel: impl ExportChannel + 'static) -> Self {
        Self {
            runtime: self.runtime,
            inner: self.inner.with_export_channel(channel),
        }
    }

    pub fn config(&self) -> &Config {
        self.inner.config()
    }

    pub fn state(&self) -> SessionState {
        self.inner.state()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    pub fn connect(&mut self) -> Result<()> {
        self.runtime.block_on(self.inner.connect())
    }

    pub fn query(
        &mut self,
        input: impl Into<SentenceInput>,
        filter: Option<Where>,
        operations: Option<&str>,
        tag: Option<&str>,
    ) -> Result<&mut Self> {
        self.runtime
            .block_on(self.inner.query(input, filter, operations, tag))?;
        Ok(self)
    }

    pub fn read(&mut self, options: ReadOptions) -> Result<Reply> {
        self.runtime.block_on(self.inner.read(options))
    }

    pub fn read_as_iterator(&mut self, count: Option<usize>) -> Result<ResponseCursor> {
        self.runtime.block_on(self.inner.read_as_iterator(count))
    }

    pub fn query_read(
        &mut self,
        input: impl Into<SentenceInput>,
        filter: Option<Where>,
        operations: Option<&str>,
        tag: Option<&str>,
        options: ReadOptions,
    ) -> Result<Reply> {
        self.runtime
            .block_on(self.inner.query_read(input, filter, operations, tag, options))
    }

    pub fn query_iter(
        &mut self,
        input: impl Into<SentenceInput>,
        filter: Option<Where>,
        operations: Option<&str>,
        tag: Option<&str>,
        count: Option<usize>,
    ) -> Result<ResponseCursor> {
        self.runtime
            .block_on(self.inner.query_iter(input, filter, operations, tag, count))
    }

    pub fn export(&mut self, arguments: &str) -> Result<String> {
        self.runtime.block_on(self.inner.export(arguments))
    }

    pub fn close(&mut self) -> Result<()> {
        self.runtime.block_on(self.inner.close())
    }
}
