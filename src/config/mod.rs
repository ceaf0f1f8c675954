// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Configuration for a RouterOS API session
//!
//! Loads from code, JSON, string key/value pairs or environment variables.
//! Key/value sources are type-checked per parameter.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};


/// Default configuration values
pub mod defaults {
    pub const PORT: u16 = 8728;
    pub const PORT_SSL: u16 = 8729;
    pub const SSL: bool = false;
    pub const LEGACY: bool = false;
    pub const TIMEOUT_SECS: u64 = 10;
    pub const SOCKET_TIMEOUT_SECS: u64 = 30;
    pub const ATTEMPTS: u32 = 10;
    pub const DELAY_SECS: u64 = 1;
    pub const SSH_PORT: u16 = 22;
    pub const SSH_TIMEOUT_SECS: u64 = 30;
    pub const NODELAY: bool = true;
}

/// Environment variable names used by [`Config::from_env`]
pub mod env_vars {
    /// Prefix for every parameter, e.g. `ROUTEROS_HOST`
    pub const PREFIX: &str = "ROUTEROS_";
}

/// Every parameter name accepted by [`Config::set`]
pub const PARAMETERS: &[&str] = &[
    "host",
    "user",
    "pass",
    "port",
    "ssl",
    "legacy",
    "timeout",
    "socket_timeout",
    "attempts",
    "delay",
    "ssh_port",
    "ssh_timeout",
    "verify_peer",
    "verify_peer_name",
    "allow_self_signed",
    "ca_file",
    "nodelay",
    "bind",
];

/// TLS settings, only used when `ssl` is enabled
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TlsOptions {
    /// Require a certificate chain that verifies against `ca_file`
    pub verify_peer: bool,
    /// Require the certificate to match the host name
    pub verify_peer_name: bool,
    /// Accept a certificate whose issuer is unknown
    pub allow_self_signed: bool,
    /// PEM bundle of trusted roots
    pub ca_file: Option<PathBuf>,
}

/// Options applied to the TCP socket before connecting
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SocketOptions {
    pub nodelay: bool,
    /// Local address to bind before connecting
    pub bind: Option<SocketAddr>,
}

impl Default for SocketOptions {
    fn default() -> Self {
        Self {
            nodelay: defaults::NODELAY,
            bind: None,
        }
    }
}

/// Connection parameters of one router
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub host: String,
    pub user: String,
    pub pass: String,
    /// Explicit API port; see [`Config::port`] for the default
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub ssl: bool,
    #[serde(default)]
    pub ssl_options: TlsOptions,
    /// Use the pre-6.43 challenge/response login
    #[serde(default)]
    pub legacy: bool,
    /// Connect timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Read timeout in seconds, applied to every word
    #[serde(default = "default_socket_timeout")]
    pub socket_timeout: u64,
    /// Number of connect attempts
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    /// Pause between attempts in seconds
    #[serde(default = "default_delay")]
    pub delay: u64,
    #[serde(default = "default_ssh_port")]
    pub ssh_port: u16,
    #[serde(default = "default_ssh_timeout")]
    pub ssh_timeout: u64,
    #[serde(default)]
    pub socket_options: SocketOptions,
}

fn default_timeout() -> u64 {
    defaults::TIMEOUT_SECS
}

fn default_socket_timeout() -> u64 {
    defaults::SOCKET_TIMEOUT_SECS
}

fn default_attempts() -> u32 {
    defaults::ATTEMPTS
}

fn default_delay() -> u64 {
    defaults::DELAY_SECS
}

fn default_ssh_port() -> u16 {
    defaults::SSH_PORT
}

fn default_ssh_timeout() -> u64 {
    defaults::SSH_TIMEOUT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: String::new(),
            user: String::new(),
            pass: String::new(),
            port: None,
            ssl: defaults::SSL,
            ssl_options: TlsOptions::default(),
            legacy: defaults::LEGACY,
            timeout: defaults::TIMEOUT_SECS,
            socket_timeout: defaults::SOCKET_TIMEOUT_SECS,
            attempts: defaults::ATTEMPTS,
            delay: defaults::DELAY_SECS,
            ssh_port: defaults::SSH_PORT,
            ssh_timeout: defaults::SSH_TIMEOUT_SECS,
            socket_options: SocketOptions::default(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("pass", &"***")
            .field("port", &self.port())
            .field("ssl", &self.ssl)
            .field("ssl_options", &self.ssl_options)
            .field("legacy", &self.legacy)
            .field("timeout", &self.timeout)
            .field("socket_timeout", &self.socket_timeout)
            .field("attempts", &self.attempts)
            .field("delay", &self.delay)
            .field("ssh_port", &self.ssh_port)
            .field("ssh_timeout", &self.ssh_timeout)
            .field("socket_options", &self.socket_options)
            .finish()
    }
}

fn parse_value<T: FromStr>(name: &str, value: &str, expected: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        Error::Config(format!(
            "Parameter '{name}' expects {expected}, got '{value}'"
        ))
    })
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(Error::Config(format!(
            "Parameter '{name}' expects a boolean, got '{value}'"
        ))),
    }
}

impl Config {
    pub fn new(host: impl Into<String>, user: impl Into<String>, pass: impl Into<String>) -> Self {
        Config {
            host: host.into(),
            user: user.into(),
            pass: pass.into(),
            ..Config::default()
        }
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    #[must_use]
    pub fn with_ssl(mut self, ssl: bool) -> Self {
        self.ssl = ssl;
        self
    }

    #[must_use]
    pub fn with_ssl_options(mut self, options: TlsOptions) -> Self {
        self.ssl_options = options;
        self
    }

    #[must_use]
    pub fn with_legacy(mut self, legacy: bool) -> Self {
        self.legacy = legacy;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = secs;
        self
    }

    #[must_use]
    pub fn with_socket_timeout(mut self, secs: u64) -> Self {
        self.socket_timeout = secs;
        self
    }

    #[must_use]
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    #[must_use]
    pub fn with_delay(mut self, secs: u64) -> Self {
        self.delay = secs;
        self
    }

    #[must_use]
    pub fn with_ssh(mut self, port: u16, timeout_secs: u64) -> Self {
        self.ssh_port = port;
        self.ssh_timeout = timeout_secs;
        self
    }

    #[must_use]
    pub fn with_socket_options(mut self, options: SocketOptions) -> Self {
        self.socket_options = options;
        self
    }

    /// API port, falling back to 8729 with SSL and 8728 without.
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(if self.ssl {
            defaults::PORT_SSL
        } else {
            defaults::PORT
        })
    }

    /// `host:port` as used in logs and errors
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.socket_timeout)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.delay)
    }

    /// Sets one parameter from its string form.
    ///
    /// # Errors
    ///
    /// Fails for names outside [`PARAMETERS`] and values that do not parse as
    /// the parameter's type.
    pub fn set(&mut self, name: &str, value: &str) -> Result<&mut Self> {
        match name {
            "host" => self.host = value.to_string(),
            "user" => self.user = value.to_string(),
            "pass" => self.pass = value.to_string(),
            "port" => self.port = Some(parse_value(name, value, "a port number")?),
            "ssl" => self.ssl = parse_bool(name, value)?,
            "legacy" => self.legacy = parse_bool(name, value)?,
            "timeout" => self.timeout = parse_value(name, value, "seconds")?,
            "socket_timeout" => self.socket_timeout = parse_value(name, value, "seconds")?,
            "attempts" => self.attempts = parse_value(name, value, "a count")?,
            "delay" => self.delay = parse_value(name, value, "seconds")?,
            "ssh_port" => self.ssh_port = parse_value(name, value, "a port number")?,
            "ssh_timeout" => self.ssh_timeout = parse_value(name, value, "seconds")?,
            "verify_peer" => self.ssl_options.verify_peer = parse_bool(name, value)?,
            "verify_peer_name" => self.ssl_options.verify_peer_name = parse_bool(name, value)?,
            "allow_self_signed" => self.ssl_options.allow_self_signed = parse_bool(name, value)?,
            "ca_file" => self.ssl_options.ca_file = Some(PathBuf::from(value)),
            "nodelay" => self.socket_options.nodelay = parse_bool(name, value)?,
            "bind" => {
                self.socket_options.bind = Some(parse_value(name, value, "a socket address")?);
            }
            _ => {
                return Err(Error::Config(format!("Unknown parameter '{name}'")));
            }
        }
        Ok(self)
    }

    /// Builds and validates a configuration from string key/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Config::default();
        let mut has_pass = false;
        for (name, value) in pairs {
            has_pass |= name.as_ref() == "pass";
            config.set(name.as_ref(), value.as_ref())?;
        }
        // an empty password is valid, an absent one is not
        if !has_pass {
            return Err(Error::Config(
                "One or few parameters 'pass' of Config is not set or empty".to_string(),
            ));
        }
        config.validate()?;
        Ok(config)
    }

    /// Builds and validates a configuration from a JSON object.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("Invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from `ROUTEROS_*` environment variables, reading `.env` first.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let pairs = PARAMETERS.iter().filter_map(|name| {
            let var = format!("{}{}", env_vars::PREFIX, name.to_ascii_uppercase());
            std::env::var(var).ok().map(|value| (*name, value))
        });
        Self::from_pairs(pairs)
    }

    /// Checks that the parameters needed to connect are present.
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = [("host", &self.host), ("user", &self.user)]
            .into_iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| name)
            .collect();
        if !missing.is_empty() {
            return Err(Error::Config(format!(
                "One or few parameters '{}' of Config is not set or empty",
                missing.join(", ")
            )));
        }

        if self.attempts == 0 {
            return Err(Error::Config(
                "Parameter 'attempts' must be at least 1".to_string(),
            ));
        }

        if self.ssl_options.verify_peer && self.ssl_options.ca_file.is_none() {
            tracing::warn!(
                "verify_peer is set without ca_file for {}, no roots will be trusted",
                self.host
            );
        }

        Ok(())
    }
}
