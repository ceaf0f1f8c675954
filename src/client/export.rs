// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! `/export` side-channel
//!
//! The binary API cannot run `/export`, so such sentences are handed to an
//! [`ExportChannel`] (typically SSH on `ssh_port`) and the text it returns is
//! served by the next read.

use futures_util::future::BoxFuture;

use crate::config::Config;
use crate::error::Result;

/// Runs `/export` out of band and returns its output verbatim
pub trait ExportChannel: Send {
    /// `arguments` is everything after `/export`, space separated.
    fn run_export<'a>(
        &'a mut self,
        config: &'a Config,
        arguments: &'a str,
    ) -> BoxFuture<'a, Result<String>>;
}

/// Whether a sentence must go through the export side-channel
pub(crate) fn is_export(endpoint: &str) -> bool {
    endpoint.trim_start().starts_with("/export")
}

/// Turns `/export/verbose file=x` into `verbose file=x`.
pub(crate) fn export_arguments(endpoint: &str) -> String {
    let rest = endpoint.trim().trim_start_matches("/export");
    rest.trim_start_matches('/')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
