//! floos: an offline, single-user expense tracker.
//!
//! Transactions are kept in a local SQLite file by [`Db`]. The [`query`] module filters and
//! aggregates them, [`report`] turns a set of them into an expense report, and the [`commands`]
//! module implements the `floos` command line program on top of these.

pub mod args;
mod backup;
pub mod commands;
mod config;
pub mod db;
mod error;
pub mod model;
pub mod query;
pub mod report;
mod utils;


pub use backup::Backup;
pub use config::Config;
pub use db::Db;
pub use error::{Error, Result, StoreError, StoreResult};
