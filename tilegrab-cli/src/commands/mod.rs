//! CLI command implementations.
//!
//! The default invocation is a capture run; `init` writes a starter
//! configuration file.

pub mod capture;
pub mod init;
