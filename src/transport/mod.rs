// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Opening the byte stream to a router
//!
//! [`Connector`] is the seam between the session and the network: the
//! session only needs something readable and writable, so tests plug in
//! in-memory streams while [`TcpConnector`] dials TCP, optionally wrapped in
//! TLS.

#[cfg(feature = "tls")]
mod tls;

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{TcpSocket, TcpStream, lookup_host};
use tokio::time::timeout;

use crate::config::Config;
use crate::error::TransportError;

/// Opens a fresh stream for every connect attempt
pub trait Connector {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send;

    fn connect(
        &self,
        config: &Config,
    ) -> impl Future<Output = Result<Self::Stream, TransportError>> + Send;
}

/// TCP connector honouring `timeout`, `socket_options` and `ssl`
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    type Stream = Transport;

    async fn connect(&self, config: &Config) -> Result<Transport, TransportError> {
        let addr = config.address();
        tracing::trace!("Attempting TCP connection to: {}", addr);
        let stream = timeout(config.connect_timeout(), open_tcp(config))
            .await
            .map_err(|_| TransportError {
                code: None,
                message: format!(
                    "Connection to {addr} timed out after {} seconds",
                    config.timeout
                ),
            })??;
        tracing::trace!("TCP connection established to: {}", addr);

        if !config.ssl {
            return Ok(Transport::Plain(stream));
        }

        #[cfg(feature = "tls")]
        {
            let tls = timeout(config.connect_timeout(), tls::handshake(config, stream))
                .await
                .map_err(|_| TransportError::new(format!("TLS handshake with {addr} timed out")))??;
            tracing::trace!("TLS session established with: {}", addr);
            Ok(Transport::Tls(Box::new(tls)))
        }

        #[cfg(not(feature = "tls"))]
        {
            drop(stream);
            Err(TransportError::new(
                "SSL requested but the crate was built without the `tls` feature",
            ))
        }
    }
}

async fn open_tcp(config: &Config) -> Result<TcpStream, TransportError> {
    let addrs = lookup_host((config.host.as_str(), config.port())).await?;

    let mut last_error = TransportError::new(format!("No address found for {}", config.host));
    for addr in addrs {
        match dial(addr, config).await {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                tracing::trace!("Connection to {} failed: {}", addr, e);
                last_error = e.into();
            }
        }
    }
    Err(last_error)
}

async fn dial(addr: SocketAddr, config: &Config) -> io::Result<TcpStream> {
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    if let Some(bind) = config.socket_options.bind {
        socket.bind(bind)?;
    }
    socket.set_nodelay(config.socket_options.nodelay)?;
    socket.connect(addr).await
}

/// Plain or TLS-wrapped TCP stream
#[derive(Debug)]
pub enum Transport {
    Plain(TcpStream),
    #[cfg(feature = "tls")]
    Tls(Box<tokio_rustls::client::TlsStream<TcpStream>>),
}

impl AsyncRead for Transport {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Transport::Plain(s) => Pin::new(s).poll_read(cx, buf),
            #[cfg(feature = "tls")]
            Transport::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Transport {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Transport::Plain(s) => Pin::new(s).poll_write(cx, buf),
            #[cfg(feature = "tls")]
            Transport::Tls(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Transport::Plain(s) => Pin::new(s).poll_flush(cx),
            #[cfg(feature = "tls")]
            Transport::Tls(s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Transport::Plain(s) => Pin::new(s).poll_shutdown(cx),
            #[cfg(feature = "tls")]
            Transport::Tls(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}
