//! CLI, configuration, output rendering
//!
//! This crate provides the `slotbook` command-line interface.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod render;
pub mod secret;

pub use cli::Cli;
pub use error::{CliError, CliResult};
