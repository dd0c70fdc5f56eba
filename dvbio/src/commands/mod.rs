//! Subcommand handlers.

pub(crate) mod dump;
pub(crate) mod list;
pub(crate) mod signal;

pub(crate) type CommandResult = Result<(), Box<dyn std::error::Error>>;
