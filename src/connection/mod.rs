// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Low-level RouterOS API connection handling

mod auth;
pub(crate) mod parse;
pub(crate) mod protocol;

use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

use crate::error::Result;
use parse::{DONE, FATAL, RE};

/// Sentence-level reader/writer over one byte stream
pub(crate) struct Connection<S> {
    stream: S,
    read_timeout: Duration,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub(crate) fn new(stream: S, read_timeout: Duration) -> Self {
        Self {
            stream,
            read_timeout,
        }
    }

    /// Sends a sentence and reads the complete reply.
    pub(crate) async fn command<W: AsRef<str>>(&mut self, words: &[W]) -> Result<Vec<String>> {
        self.send_sentence(words).await?;
        self.read_raw(None).await
    }

    pub(crate) async fn send_sentence<W: AsRef<str>>(&mut self, words: &[W]) -> Result<()> {
        for w in words {
            self.write_word(w.as_ref().trim()).await?;
        }
        // zero length word terminator
        self.write_word("").await?;
        self.stream.flush().await?;
        Ok(())
    }

    async fn write_word(&mut self, word: &str) -> Result<usize> {
        protocol::write_word(&mut self.stream, word.as_bytes()).await
    }

    /// Reads words until the empty word closing a `!done`/`!fatal` block.
    ///
    /// With `count`, the reply is also complete once that many `!re` rows
    /// arrived, which bounds endless commands such as `monitor-traffic`.
    pub(crate) async fn read_raw(&mut self, count: Option<usize>) -> Result<Vec<String>> {
        let mut response = Vec::new();
        let mut last_reply = false;
        let mut rows = 0usize;

        loop {
            let word = self.read_word().await?;

            if count.is_some_and(|limit| rows >= limit) {
                last_reply = true;
            }

            if word.is_empty() {
                if last_reply {
                    break;
                }
                // end of a `!re` or `!trap` block, more to come
                continue;
            }

            tracing::trace!("Received word: {}", word);
            if word == DONE || word == FATAL {
                last_reply = true;
            } else if word == RE {
                rows += 1;
            }
            response.push(word);
        }

        tracing::trace!("Reply complete, {} words, {} rows", response.len(), rows);
        Ok(response)
    }

    async fn read_word(&mut self) -> Result<String> {
        let word = timeout(self.read_timeout, protocol::read_word(&mut self.stream))
            .await
            .map_err(|_| {
                io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!(
                        "RouterOS did not respond within {} seconds",
                        self.read_timeout.as_secs()
                    ),
                )
            })??;
        Ok(String::from_utf8_lossy(&word).into())
    }

    pub(crate) async fn close(&mut self) -> Result<()> {
        self.stream.shutdown().await?;
        Ok(())
    }
}
