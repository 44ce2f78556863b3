//! # Configuration
//!
//! Plain settings structs with sensible defaults. The crate owns no file
//! format; hosts deserialize these from whatever source they use.

use serde::Deserialize;

/// Route discovery settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// File extension of route files (without the dot)
    pub extension: String,
    /// File names starting with this prefix are skipped by discovery
    pub hidden_prefix: String,
    /// Path segment dropped from discovered routes
    pub index_marker: String,
    /// Placeholder name used by resource routes when none is given
    pub default_identity: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            extension: "route".to_string(),
            hidden_prefix: "_".to_string(),
            index_marker: "index".to_string(),
            default_identity: "id".to_string(),
        }
    }
}

/// Database connection settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Data source name, e.g. `sqlite::memory:` or `postgres://host/db`
    pub dsn: String,
    /// Optional user name
    pub username: Option<String>,
    /// Optional password
    pub password: Option<String>,
    /// Statements executed once, right after the handle is opened
    pub scripts: Vec<String>,
    /// Opening and closing identifier quote
    pub quotes: (String, String),
    /// Marker wrapping raw (unquoted) expressions
    pub raw_identifier: String,
    /// Join clauses with newlines instead of spaces
    pub format_query: bool,
    /// Default page size
    pub pagination_size: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            dsn: "sqlite::memory:".to_string(),
            username: None,
            password: None,
            scripts: Vec::new(),
            quotes: ("\"".to_string(), "\"".to_string()),
            raw_identifier: "```".to_string(),
            format_query: false,
            pagination_size: 20,
        }
    }
}

impl ConnectionConfig {
    /// Settings for the given DSN, everything else defaulted
    #[must_use]
    pub fn new(dsn: impl Into<String>) -> Self {
        Self {
            dsn: dsn.into(),
            ..Self::default()
        }
    }

    /// Add an init script
    #[must_use]
    pub fn script(mut self, sql: impl Into<String>) -> Self {
        self.scripts.push(sql.into());
        self
    }

    /// Set credentials
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }
}

/// Log output settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Emit JSON lines instead of human readable output
    pub json: bool,
    /// Filter directive added on top of `RUST_LOG`
    pub directive: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            json: false,
            directive: "trellis=info".to_string(),
        }
    }
}
