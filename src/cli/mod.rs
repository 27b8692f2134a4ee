//! CLI module
//!
//! Command-line interface for walking list endpoints.
//!
//! # Commands
//!
//! - `run` - Read stdin and fetch every seed (default)
//! - `validate` - Check the configuration and URL expression
//! - `config` - Print the effective configuration

mod commands;
mod runner;

pub use commands::{Cli, Commands};
pub use runner::Runner;
