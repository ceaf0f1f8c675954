// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Lazy view over a raw reply
//!
//! Large prints (thousands of firewall rules) are split into one slice per
//! `!re` row and only parsed when a row is actually looked at.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::connection::parse::{RE, Record, Reply, parse_reply};
use crate::error::Result;

/// Cursor and indexed lookup over the rows of one reply
#[derive(Debug, Clone, Default)]
pub struct ResponseCursor {
    slices: Vec<Option<Vec<String>>>,
    parsed: HashMap<usize, Record>,
    position: isize,
    parses: usize,
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    slices: Vec<Option<Vec<String>>>,
}

fn split_rows(raw: Vec<String>) -> Vec<Option<Vec<String>>> {
    let positions: Vec<usize> = raw
        .iter()
        .enumerate()
        .filter(|(_, w)| *w == RE)
        .map(|(i, _)| i)
        .collect();

    if positions.len() < 2 {
        // `!trap`/`!done`-only replies and single rows stay whole
        return vec![Some(raw)];
    }

    let mut slices = Vec::with_capacity(positions.len());
    for (n, &start) in positions.iter().enumerate() {
        let end = positions.get(n + 1).copied().unwrap_or(raw.len());
        slices.push(Some(raw[start..end].to_vec()));
    }
    slices
}

impl ResponseCursor {
    pub fn new(raw: Vec<String>) -> Self {
        Self {
            slices: split_rows(raw),
            ..Self::default()
        }
    }

    fn parse_slice(&mut self, index: usize) -> Option<&Record> {
        if !self.parsed.contains_key(&index) {
            let slice = self.slices.get(index)?.as_ref()?;
            self.parses += 1;
            let record = match parse_reply(slice) {
                Reply::Data(mut response) => {
                    if response.rows.is_empty() {
                        response.after?
                    } else {
                        response.rows.swap_remove(0)
                    }
                }
                _ => return None,
            };
            self.parsed.insert(index, record);
        }
        self.parsed.get(&index)
    }

    fn index(&self) -> Option<usize> {
        usize::try_from(self.position).ok()
    }

    /// Record at the cursor, parsed on first access.
    pub fn current(&mut self) -> Option<&Record> {
        let index = self.index()?;
        self.parse_slice(index)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) {
        self.position += 1;
    }

    pub fn previous(&mut self) {
        self.position -= 1;
    }

    pub fn reset(&mut self) {
        self.position = 0;
    }

    /// Cursor position; negative after moving before the first row
    pub fn position(&self) -> isize {
        self.position
    }

    /// Whether a slice exists at the cursor
    pub fn valid(&self) -> bool {
        self.index()
            .and_then(|i| self.slices.get(i))
            .is_some_and(Option::is_some)
    }

    /// Number of slices still present
    pub fn count(&self) -> usize {
        self.slices.iter().filter(|s| s.is_some()).count()
    }

    /// Record at `index`, independent of the cursor.
    pub fn get(&mut self, index: usize) -> Option<&Record> {
        self.parse_slice(index)
    }

    /// Replaces the parsed record at `index` without touching the raw slice.
    pub fn set(&mut self, index: usize, record: Record) {
        self.parsed.insert(index, record);
    }

    /// Drops both the raw slice and the parsed record at `index`.
    pub fn unset(&mut self, index: usize) {
        self.parsed.remove(&index);
        if let Some(slot) = self.slices.get_mut(index) {
            *slot = None;
        }
    }

    /// Whether `index` holds a slice with any payload; a bare `!re` counts as absent.
    pub fn exists(&self, index: usize) -> bool {
        match self.slices.get(index) {
            Some(Some(slice)) => !(slice.len() == 1 && slice[0] == RE),
            _ => false,
        }
    }

    /// How many slices have been parsed so far
    pub fn parse_count(&self) -> usize {
        self.parses
    }

    /// Encodes the raw slices; parsed records are not included.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&Snapshot {
            slices: self.slices.clone(),
        })?)
    }

    /// Restores a cursor from [`ResponseCursor::to_bytes`] output.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let snapshot: Snapshot = serde_json::from_slice(bytes)?;
        Ok(Self {
            slices: snapshot.slices,
            ..Self::default()
        })
    }
}
