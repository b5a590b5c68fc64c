//! Command handlers for the `ledger-node` binary

pub mod commands;

pub use commands::{cmd_keygen, cmd_sign, cmd_start, CliResult};
