//! Operator tooling for the NiCare engine
//!
//! The `nicare` binary wraps these commands; each one builds its own
//! in-memory services so it can run without a database.

pub mod cli;
pub mod commands;

pub use cli::{Cli, Command};
pub use commands::run;
