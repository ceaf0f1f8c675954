// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! RouterOS reply parsing
//!
//! A reply is a flat list of words made of blocks, each opened by a control
//! word (`!re`, `!trap`, `!done`, `!fatal`). Attribute words look like
//! `=key=value` or `.key=value`; only the first `=` after the key splits.

use std::collections::HashMap;

/// Data row marker
pub const RE: &str = "!re";
/// Error block marker
pub const TRAP: &str = "!trap";
/// Successful end of reply
pub const DONE: &str = "!done";
/// Fatal end of reply, followed by the router closing the connection
pub const FATAL: &str = "!fatal";

/// One parsed row: attribute name to value
pub type Record = HashMap<String, String>;

/// Structured result of a reply
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    /// `!re` rows in wire order
    pub rows: Vec<Record>,
    /// Attributes trailing the closing `!trap` or `!done`, such as `ret` or `message`
    pub after: Option<Record>,
}

impl Response {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() && self.after.is_none()
    }

    /// Looks up an attribute of the trailing `!done`/`!trap` block.
    pub fn after_value(&self, key: &str) -> Option<&str> {
        self.after.as_ref()?.get(key).map(String::as_str)
    }
}

/// Outcome of a read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Parsed rows and trailing attributes
    Data(Response),
    /// Words as received, when parsing was not requested
    Raw(Vec<String>),
    /// Words as received up to a `!fatal` block; the connection is gone
    Fatal(Vec<String>),
    /// Output of a redirected `/export` command
    Export(String),
}

impl Reply {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Reply::Fatal(_))
    }

    /// Parsed rows, empty for any non-`Data` reply.
    pub fn rows(&self) -> &[Record] {
        match self {
            Reply::Data(response) => &response.rows,
            _ => &[],
        }
    }

    pub fn into_response(self) -> Option<Response> {
        match self {
            Reply::Data(response) => Some(response),
            _ => None,
        }
    }

    pub fn into_words(self) -> Option<Vec<String>> {
        match self {
            Reply::Raw(words) | Reply::Fatal(words) => Some(words),
            _ => None,
        }
    }
}

fn is_control(word: &str) -> bool {
    matches!(word, RE | TRAP | DONE | FATAL)
}

/// Splits an attribute word into key and value.
///
/// Returns `None` for words without a `=`/`.` sigil, or whose key is empty
/// or holds anything but ASCII letters, digits, `_`, `-` and `.`.
pub fn split_attribute(word: &str) -> Option<(&str, &str)> {
    let stripped = word.strip_prefix('=').or_else(|| word.strip_prefix('.'))?;
    let (key, value) = stripped.split_once('=')?;
    if key.is_empty() || !key.bytes().all(is_key_byte) {
        return None;
    }
    Some((key, value))
}

fn is_key_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.')
}

/// Turns a raw reply into rows and trailing attributes.
///
/// A `!fatal` block short-circuits and hands back the raw words untouched.
pub fn parse_reply<S: AsRef<str>>(raw: &[S]) -> Reply {
    let mut rows: Vec<Record> = Vec::new();
    let mut after: Option<Record> = None;

    let mut words = raw.iter().map(AsRef::as_ref).peekable();
    while let Some(word) = words.next() {
        match word {
            RE => rows.push(Record::new()),
            FATAL => {
                tracing::trace!("Fatal block in reply, returning raw words");
                return Reply::Fatal(raw.iter().map(|w| w.as_ref().to_string()).collect());
            }
            TRAP | DONE => {
                let bucket = after.get_or_insert_with(Record::new);
                while let Some(next) = words.next_if(|w| !is_control(w)) {
                    if let Some((key, value)) = split_attribute(next) {
                        bucket.insert(key.to_string(), value.to_string());
                    }
                }
                // a closing block ends the reply
                break;
            }
            _ => {
                // attributes ahead of any `!re` have no row to land in
                if let (Some(row), Some((key, value))) = (rows.last_mut(), split_attribute(word))
                {
                    row.insert(key.to_string(), value.to_string());
                }
            }
        }
    }

    // `!done` with nothing after it carries no data
    let after = after.filter(|record| !record.is_empty());
    Reply::Data(Response { rows, after })
}
