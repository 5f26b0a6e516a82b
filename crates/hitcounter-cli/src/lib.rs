//! Hit counter CLI library.
//!
//! Subcommand handlers and terminal styling for the `hitcounter-cli` binary.

pub mod commands;
pub mod terminal;
