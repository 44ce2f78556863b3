//! # Trellis Core
//!
//! Core library for the Trellis micro-framework.
//! Provides regex routing with file and controller discovery, a SQL
//! statement builder, a database connection and a dirty-tracking row mapper.
//!
//! ## Architecture
//!
//! Routing is synchronous and owned per request: a [`Router`] carries its
//! own [`RouteState`] and file cache, and every `handle` call either runs
//! its handler or returns `None`. The database side is async (SQLx) but
//! sequential: one [`Connection`] owns one handle, and a [`Mapper`] borrows
//! the connection for as long as it lives.
//!
//! ## Modules
//!
//! - `route` - Path pattern compiler
//! - `state` - Match, cancel and stop-propagation flags
//! - `request` - Current method/path sources
//! - `loader` - Load-once route files
//! - `router` - Route dispatcher
//! - `discovery` - Filesystem and REST resource route discovery
//! - `controller` - Controller action tables
//! - `builder` - SQL statement builder
//! - `database` - SQLx connection (SQLite, PostgreSQL)
//! - `mapper` - Row cursor with change tracking
//! - `types` - Row values and column casts
//! - `json` - JSON parsing with simd-json
//! - `config` - Router, connection and log settings
//! - `logging` - Tracing subscriber setup
//! - `error` - Error types and handling

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod builder;
pub mod config;
pub mod controller;
pub mod database;
pub mod discovery;
pub mod error;
pub mod json;
pub mod loader;
pub mod logging;
pub mod mapper;
pub mod request;
pub mod route;
pub mod router;
pub mod state;
pub mod types;

pub use builder::{Builder, Column, Criteria, Driver, Order, SelectOptions, Statement};
pub use config::{ConnectionConfig, LogConfig, RouterConfig};
pub use controller::{Action, ActionTable, Controller, Param};
pub use database::{BoxFuture, Connection, Fetched, Page, SimplePage, Written};
pub use discovery::routify;
pub use error::{Error, Result};
pub use json::{parse_json, to_json};
pub use loader::{Callable, Loaded, Loader, RequireCache, ScriptTable, TextLoader};
pub use logging::init_tracing;
pub use mapper::{Mapper, Record, SaveResult};
pub use request::{RequestSource, Target};
pub use route::{CompiledPattern, Params};
pub use router::{Handler, IntoHandler, RouteFile, Router};
pub use state::RouteState;
pub use types::{Cast, DbValue, Row, Value};

pub use trellis_macros::controller;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(VERSION, "0.1.1");
    }
}
