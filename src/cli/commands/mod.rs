//! Command implementations for the CLI.

pub mod convert;
pub mod init;
pub mod watch;
