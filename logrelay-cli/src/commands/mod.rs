//! Subcommand handlers.

pub mod rules;
