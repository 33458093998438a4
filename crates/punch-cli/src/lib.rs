//! Punch CLI library.
//!
//! This crate provides the command-line front end for the punch stopwatch
//! engine: state persistence, configuration, and one module per subcommand.

mod cli;
pub mod color;
pub mod commands;
mod config;
pub mod state;

pub use cli::{Cli, Commands};
pub use config::Config;
