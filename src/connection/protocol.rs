// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! RouterOS wire protocol helpers
//!
//! Every word on the wire is prefixed with its byte length, encoded in one to
//! five bytes. The number of leading 1-bits in the first byte selects the tier:
//!
//! | first byte | total bytes | range                         |
//! |------------|-------------|-------------------------------|
//! | `0xxxxxxx` | 1           | `0x00..=0x7F`                 |
//! | `10xxxxxx` | 2           | `0x80..=0x3FFF`               |
//! | `110xxxxx` | 3           | `0x4000..=0x1F_FFFF`          |
//! | `1110xxxx` | 4           | `0x20_0000..=0x0FFF_FFFF`     |
//! | `11110xxx` | 5           | `0x1000_0000..=0x7_FFFF_FFFF` |
//! | `11111xxx` | -           | reserved control byte         |

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{ProtocolError, Result};

/// Largest word length the 5-byte prefix can carry: three bits of the
/// first byte plus four full bytes
pub const MAX_WORD_LENGTH: u64 = 0x7_FFFF_FFFF;

/// Encodes a word length using the smallest tier that holds it.
///
/// # Errors
///
/// Returns [`ProtocolError::LengthOutOfRange`] above [`MAX_WORD_LENGTH`].
// RouterOS protocol length encoding - intentional truncation is part of the wire format
#[allow(clippy::cast_possible_truncation)]
pub fn encode_length(len: u64) -> std::result::Result<Vec<u8>, ProtocolError> {
    let encoded = if len < 0x80 {
        vec![len as u8]
    } else if len < 0x4000 {
        vec![((len >> 8) as u8) | 0x80, (len & 0xFF) as u8]
    } else if len < 0x0020_0000 {
        vec![
            ((len >> 16) as u8) | 0xC0,
            ((len >> 8) & 0xFF) as u8,
            (len & 0xFF) as u8,
        ]
    } else if len < 0x1000_0000 {
        vec![
            ((len >> 24) as u8) | 0xE0,
            ((len >> 16) & 0xFF) as u8,
            ((len >> 8) & 0xFF) as u8,
            (len & 0xFF) as u8,
        ]
    } else if len <= MAX_WORD_LENGTH {
        vec![
            ((len >> 32) as u8) | 0xF0,
            ((len >> 24) & 0xFF) as u8,
            ((len >> 16) & 0xFF) as u8,
            ((len >> 8) & 0xFF) as u8,
            (len & 0xFF) as u8,
        ]
    } else {
        return Err(ProtocolError::LengthOutOfRange(len));
    };
    Ok(encoded)
}

/// Number of bytes that follow a first length byte.
///
/// # Errors
///
/// Returns [`ProtocolError::ControlWord`] for `0xF8..=0xFF`.
pub fn continuation_bytes(first: u8) -> std::result::Result<usize, ProtocolError> {
    match first.leading_ones() {
        n @ 0..=4 => Ok(n as usize),
        _ => Err(ProtocolError::ControlWord(first)),
    }
}

/// Decodes a length prefix from the start of `bytes`.
///
/// Returns the length and the number of prefix bytes consumed.
///
/// # Errors
///
/// Fails on a reserved control byte or when `bytes` ends mid-prefix.
pub fn decode_length(bytes: &[u8]) -> std::result::Result<(u64, usize), ProtocolError> {
    let Some(&first) = bytes.first() else {
        return Err(ProtocolError::Truncated {
            expected: 1,
            actual: 0,
        });
    };
    let extra = continuation_bytes(first)?;
    let total = extra + 1;
    let Some(rest) = bytes.get(1..total) else {
        return Err(ProtocolError::Truncated {
            expected: total,
            actual: bytes.len(),
        });
    };

    // Keep only the bits below the tier marker
    let mut len = u64::from(first & (0xFF >> total));
    for &b in rest {
        len = (len << 8) | u64::from(b);
    }
    Ok((len, total))
}

/// Reads one length prefix from the stream, consuming exactly its bytes.
pub async fn read_length<R>(stream: &mut R) -> Result<u64>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; 5];
    buf[0] = stream.read_u8().await?;
    let extra = continuation_bytes(buf[0])?;
    if extra > 0 {
        stream.read_exact(&mut buf[1..=extra]).await?;
    }
    let (len, _) = decode_length(&buf[..=extra])?;
    Ok(len)
}

/// Reads one word. A zero-length prefix yields an empty word, the block terminator.
pub async fn read_word<R>(stream: &mut R) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let len = read_length(stream).await?;
    let len = usize::try_from(len).map_err(|_| ProtocolError::LengthOverflow(len))?;
    if len == 0 {
        return Ok(Vec::new());
    }
    let mut buf = vec![0u8; len];
    stream.read_exact(&mut buf).await?;
    Ok(buf)
}

/// Writes one word with its length prefix and returns the total bytes written.
pub async fn write_word<W>(stream: &mut W, word: &[u8]) -> Result<usize>
where
    W: AsyncWrite + Unpin,
{
    let prefix = encode_length(word.len() as u64)?;
    stream.write_all(&prefix).await?;
    stream.write_all(word).await?;
    Ok(prefix.len() + word.len())
}
