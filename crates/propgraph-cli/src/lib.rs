//! propgraph CLI library
//!
//! Argument parsing, logging setup, backend construction and the command
//! implementations behind the `propgraph` binary.

pub mod cli;
pub mod commands;
pub mod factories;
pub mod logging;
