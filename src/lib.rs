//! blogcheck - end-to-end test harness for the blogging application
//!
//! The [`engine`] sequences steps against exclusively-owned sessions
//! provided by the [`driver`] backends; [`suites`] holds the built-in
//! scenarios and [`testing`] runs scenarios written in YAML.

pub mod cli;
pub mod commands;
pub mod common;
pub mod driver;
pub mod engine;
pub mod github;
pub mod suites;
pub mod testing;

// Re-export commonly used types for tests
pub use common::{Error, ErrorKind, Result};
