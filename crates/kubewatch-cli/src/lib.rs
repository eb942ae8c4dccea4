//! # kubewatch-cli
//!
//! The `kubewatch` command-line tool.
//!
//! `kubewatch run` reads resource changes as newline-delimited JSON from
//! stdin, one watch record per line:
//!
//! ```text
//! {"action": "created", "object": {"apiVersion": "v1", "kind": "Pod", "metadata": {...}}}
//! {"action": "updated", "object": {...}, "oldObject": {...}}
//! ```
//!
//! Each record is normalized into an event, filtered by the resource
//! interest matrix and reason filters in `~/.kubewatch.yaml`, then broadcast
//! to every configured notification channel.
//!
//! `kubewatch config view` and `kubewatch config path` inspect the config
//! file.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod error;
pub mod source;

pub use cli::{Cli, Commands, ConfigCommands, LogFormat, RunArgs};
pub use error::{CliError, Result};
