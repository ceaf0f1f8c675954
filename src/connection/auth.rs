// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! RouterOS authentication
//!
//! Modern firmware (6.43+) takes the password in plain text. Older firmware
//! answers a bare `/login` with a hex challenge in `=ret=` and expects an MD5
//! response. A modern attempt that is answered with `!done` plus extra words
//! is the signature of old firmware, so the session switches to the legacy
//! scheme and logs in once more.

use md5::compute as md5_compute;
use tokio::io::{AsyncRead, AsyncWrite};

use super::Connection;
use super::parse::{DONE, TRAP, parse_reply};
use crate::error::{Error, ProtocolError, Result};

/// Builds the legacy `response` value: `00` + hex MD5 of `\0` + password + challenge bytes.
///
/// # Errors
///
/// Returns [`ProtocolError::MalformedChallenge`] if the challenge is not even-length hex.
pub(crate) fn challenge_response(password: &str, challenge_hex: &str) -> Result<String> {
    let challenge = hex::decode(challenge_hex)
        .map_err(|_| ProtocolError::MalformedChallenge(challenge_hex.to_string()))?;

    let mut data = Vec::with_capacity(1 + password.len() + challenge.len());
    data.push(0u8);
    data.extend_from_slice(password.as_bytes());
    data.extend_from_slice(&challenge);
    let digest = md5_compute(&data);

    let mut response = String::from("00");
    response.push_str(&hex::encode(digest.0));
    Ok(response)
}

fn is_legacy_signature(reply: &[String]) -> bool {
    reply.len() > 1 && reply[0] == DONE
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Logs in, flipping `legacy` on when old firmware is detected.
    pub(crate) async fn login(
        &mut self,
        username: &str,
        password: &str,
        legacy: &mut bool,
    ) -> Result<()> {
        tracing::trace!("Attempting login for user: {}", username);
        let mut fallback_allowed = false;

        let reply = loop {
            let reply = if *legacy {
                self.legacy_login(username, password).await?
            } else {
                // only a modern attempt may be retried as legacy
                fallback_allowed = true;
                self.command(&[
                    "/login".to_string(),
                    format!("=name={username}"),
                    format!("=password={password}"),
                ])
                .await?
            };

            if fallback_allowed && !*legacy && is_legacy_signature(&reply) {
                tracing::debug!("Router answered like pre-6.43 firmware, retrying legacy login");
                *legacy = true;
                fallback_allowed = false;
                continue;
            }
            break reply;
        };

        if reply.first().is_some_and(|w| w == TRAP) {
            tracing::trace!("Login rejected: {:?}", reply);
            return Err(Error::BadCredentials);
        }

        if reply.len() == 1 && reply[0] == DONE {
            tracing::debug!(
                "Login successful ({} method)",
                if *legacy { "legacy" } else { "new" }
            );
            return Ok(());
        }

        Err(ProtocolError::UnexpectedLoginReply(reply).into())
    }

    async fn legacy_login(&mut self, username: &str, password: &str) -> Result<Vec<String>> {
        tracing::trace!("Requesting challenge for legacy login");
        let challenge = self.command(&["/login"]).await?;
        if challenge.first().is_some_and(|w| w == TRAP) {
            return Ok(challenge);
        }

        let challenge_hex = parse_reply(&challenge)
            .into_response()
            .and_then(|r| r.after_value("ret").map(str::to_string))
            .ok_or(ProtocolError::MissingChallenge)?;
        tracing::trace!("Challenge received, length: {}", challenge_hex.len());

        let response = challenge_response(password, &challenge_hex)?;
        self.command(&[
            "/login".to_string(),
            format!("=name={username}"),
            format!("=response={response}"),
        ])
        .await
    }
}
