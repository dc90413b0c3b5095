//! Subcommand implementations.

pub mod roles;
pub mod simulate;
