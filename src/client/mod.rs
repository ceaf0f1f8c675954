// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! RouterOS API session
//!
//! A [`Client`] owns one stream and runs strictly one request at a time:
//! every [`Client::query`] must be followed by a read before the next one.

mod export;

use std::io;

use crate::config::Config;
use crate::connection::Connection;
use crate::connection::parse::{FATAL, Reply, Response, parse_reply};
use crate::cursor::ResponseCursor;
use crate::error::{Error, Result, TransportError};
use crate::query::{SentenceInput, Where, build_sentence};
use crate::transport::{Connector, TcpConnector};
pub use export::ExportChannel;
use export::{export_arguments, is_export};

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Authenticating,
    Ready,
}

/// How a reply should be read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    /// Parse into rows, or hand back the words as received
    pub parse: bool,
    /// Treat the reply as complete after this many `!re` rows
    pub count: Option<usize>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            parse: true,
            count: None,
        }
    }
}

impl ReadOptions {
    /// Unparsed words
    pub fn raw() -> Self {
        Self {
            parse: false,
            count: None,
        }
    }

    #[must_use]
    pub fn count(mut self, rows: usize) -> Self {
        self.count = Some(rows);
        self
    }
}

/// `MikroTik` `RouterOS` API client
pub struct Client<C: Connector = TcpConnector> {
    config: Config,
    connector: C,
    connection: Option<Connection<C::Stream>>,
    state: SessionState,
    export_channel: Option<Box<dyn ExportChannel>>,
    export_output: Option<String>,
    /// A sentence was sent and its reply has not been read yet
    pending: bool,
}

impl Client<TcpConnector> {
    /// Creates a client over TCP without connecting.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is incomplete.
    pub fn new(config: Config) -> Result<Self> {
        Self::with_connector(config, TcpConnector)
    }

    /// Creates a client over TCP and connects it.
    ///
    /// # Errors
    ///
    /// Configuration, connect and bad-credentials errors.
    pub async fn open(config: Config) -> Result<Self> {
        let mut client = Self::new(config)?;
        client.connect().await?;
        Ok(client)
    }
}

impl<C: Connector> Client<C> {
    /// Creates a client that opens its streams through `connector`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is incomplete.
    pub fn with_connector(config: Config, connector: C) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            connector,
            connection: None,
            state: SessionState::Disconnected,
            export_channel: None,
            export_output: None,
            pending: false,
        })
    }

    /// Installs the channel used for `/export` sentences.
    #[must_use]
    pub fn with_export_channel(mut self, channel: impl ExportChannel + 'static) -> Self {
        self.export_channel = Some(Box::new(channel));
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Ready
    }

    /// Opens the stream and logs in, retrying up to `attempts` times.
    ///
    /// Rejected credentials are not retried.
    ///
    /// # Errors
    ///
    /// [`Error::BadCredentials`] right away, [`Error::Connect`] once all
    /// attempts have failed.
    pub async fn connect(&mut self) -> Result<()> {
        self.connection = None;
        self.pending = false;
        let address = self.config.address();
        let attempts = self.config.attempts;
        let mut last_error = TransportError::new("no connection attempt was made");

        for attempt in 1..=attempts {
            self.state = SessionState::Connecting;
            tracing::trace!("Connecting to {} (attempt {}/{})", address, attempt, attempts);

            match self.connector.connect(&self.config).await {
                Ok(stream) => {
                    let mut connection = Connection::new(stream, self.config.read_timeout());
                    self.state = SessionState::Authenticating;
                    let login = connection
                        .login(&self.config.user, &self.config.pass, &mut self.config.legacy)
                        .await;

                    match login {
                        Ok(()) => {
                            tracing::debug!("Connected to {} as {}", address, self.config.user);
                            self.connection = Some(connection);
                            self.state = SessionState::Ready;
                            return Ok(());
                        }
                        Err(Error::BadCredentials) => {
                            self.state = SessionState::Disconnected;
                            return Err(Error::BadCredentials);
                        }
                        Err(e) => {
                            tracing::warn!("Login to {} failed: {}", address, e);
                            last_error = match e {
                                Error::Stream(io) => io.into(),
                                other => TransportError::new(other.to_string()),
                            };
                            // the attempt is over either way
                            if let Err(e) = connection.close().await {
                                tracing::trace!("Closing stream after failed login: {}", e);
                            }
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("Connection to {} failed: {}", address, e);
                    last_error = e;
                }
            }

            self.state = SessionState::Disconnected;
            if attempt < attempts {
                tokio::time::sleep(self.config.retry_delay()).await;
            }
        }

        Err(Error::Connect {
            address,
            attempts,
            source: last_error,
        })
    }

    fn connection(&mut self) -> Result<&mut Connection<C::Stream>> {
        match self.connection.as_mut() {
            Some(connection) if self.state == SessionState::Ready => Ok(connection),
            _ => Err(Error::Stream(io::Error::new(
                io::ErrorKind::NotConnected,
                "RouterOS session is not connected",
            ))),
        }
    }

    /// Builds a sentence and sends it.
    ///
    /// `filter` conditions become `?` words, `operations` a `?#` word and
    /// `tag` a `.tag=` word. Sentences starting with `/export` go to the
    /// export channel instead of the API socket.
    ///
    /// # Errors
    ///
    /// [`Error::Query`] before any I/O for malformed input, otherwise stream
    /// or export errors.
    pub async fn query(
        &mut self,
        input: impl Into<SentenceInput>,
        filter: Option<Where>,
        operations: Option<&str>,
        tag: Option<&str>,
    ) -> Result<&mut Self> {
        let query = build_sentence(input.into(), filter.as_ref(), operations, tag)?;
        // a new request supersedes any unread reply
        self.export_output = None;
        self.pending = false;

        if is_export(query.endpoint()) {
            let output = self.export(&export_arguments(query.endpoint())).await?;
            self.export_output = Some(output);
            return Ok(self);
        }

        let words = query.words();
        tracing::trace!("Sending sentence: {}", words[0]);
        self.connection()?.send_sentence(&words).await?;
        self.pending = true;
        Ok(self)
    }

    /// Reads the reply to the last query.
    ///
    /// A `!fatal` reply is returned as [`Reply::Fatal`] and ends the session.
    /// Without an unread request, including after export output was taken,
    /// an empty [`Reply::Data`] is returned and the stream is not touched.
    ///
    /// # Errors
    ///
    /// Stream and protocol errors, or a stream error of kind `NotConnected`.
    pub async fn read(&mut self, options: ReadOptions) -> Result<Reply> {
        if let Some(output) = self.export_output.take() {
            return Ok(Reply::Export(output));
        }
        if !self.pending {
            return Ok(Reply::Data(Response::default()));
        }

        self.pending = false;
        let raw = self.connection()?.read_raw(options.count).await?;

        if raw.iter().any(|w| w == FATAL) {
            tracing::warn!("Router sent !fatal, closing session: {:?}", raw);
            self.connection = None;
            self.state = SessionState::Disconnected;
            return Ok(Reply::Fatal(raw));
        }

        Ok(if options.parse {
            parse_reply(&raw)
        } else {
            Reply::Raw(raw)
        })
    }

    /// Reads the reply to the last query into a lazily parsed cursor.
    ///
    /// # Errors
    ///
    /// As [`Client::read`]; pending export output must be taken with `read` instead.
    pub async fn read_as_iterator(&mut self, count: Option<usize>) -> Result<ResponseCursor> {
        if self.export_output.is_some() {
            return Err(Error::Query(
                "Export output is pending, take it with read()".to_string(),
            ));
        }
        let options = ReadOptions {
            parse: false,
            count,
        };
        match self.read(options).await? {
            Reply::Raw(words) | Reply::Fatal(words) => Ok(ResponseCursor::new(words)),
            Reply::Data(_) | Reply::Export(_) => Ok(ResponseCursor::default()),
        }
    }

    /// `query` followed by `read`.
    pub async fn query_read(
        &mut self,
        input: impl Into<SentenceInput>,
        filter: Option<Where>,
        operations: Option<&str>,
        tag: Option<&str>,
        options: ReadOptions,
    ) -> Result<Reply> {
        self.query(input, filter, operations, tag)
            .await?
            .read(options)
            .await
    }

    /// `query` followed by `read_as_iterator`.
    pub async fn query_iter(
        &mut self,
        input: impl Into<SentenceInput>,
        filter: Option<Where>,
        operations: Option<&str>,
        tag: Option<&str>,
        count: Option<usize>,
    ) -> Result<ResponseCursor> {
        self.query(input, filter, operations, tag)
            .await?
            .read_as_iterator(count)
            .await
    }

    /// Runs `/export <arguments>` through the export channel.
    ///
    /// # Errors
    ///
    /// [`Error::Export`] when no channel is installed or the channel fails.
    pub async fn export(&mut self, arguments: &str) -> Result<String> {
        let Some(channel) = self.export_channel.as_mut() else {
            return Err(Error::Export(
                "/export needs an export channel, none is configured".to_string(),
            ));
        };
        tracing::debug!("Running export via side-channel: '{}'", arguments);
        channel.run_export(&self.config, arguments).await
    }

    /// Shuts the stream down; a no-op when not connected.
    pub async fn close(&mut self) -> Result<()> {
        self.state = SessionState::Disconnected;
        self.pending = false;
        if let Some(mut connection) = self.connection.take() {
            connection.close().await?;
        }
        Ok(())
    }
}
