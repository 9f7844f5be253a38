//! Declarative scenarios
//!
//! Scenarios written as YAML files instead of Rust, run through the same
//! engine as the built-in catalog.

mod config;
mod runner;

pub use config::*;
pub use runner::{load_scenario, run_scenario, validate};
