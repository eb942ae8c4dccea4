//! CLI command implementations.
//!
//! - [`run`] - Read watch records and notify channels
//! - [`config`] - Inspect the config file

pub mod config;
pub mod run;

pub use config::ConfigCommand;
pub use run::{RunCommand, RunSummary};
