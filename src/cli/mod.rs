//! CLI module for regrun - command-line interface and subcommands.
//!
//! Thin shell over the library: argument definitions only, all run logic
//! lives in `regrun::runner`.

pub mod commands;

pub use commands::Cli;
