//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;

use tilegrab::session::SessionError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Capture run aborted before completion
    Session(SessionError),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        // Print additional help for specific errors
        match self {
            CliError::Config(_) => {
                eprintln!();
                eprintln!("Run 'tilegrab init' to create a configuration file, or set:");
                eprintln!("  MAPTILER_API_KEY   your MapTiler API key");
                eprintln!("  MAPTILER_API_URL   API base URL (optional)");
                eprintln!("  MAPTILER_MAP_ID    map style identifier (optional)");
            }
            CliError::Session(SessionError::MissingDestination) => {
                eprintln!();
                eprintln!("Give a place name or an explicit coordinate box:");
                eprintln!("  tilegrab \"Paris\"");
                eprintln!("  tilegrab --coords \"[48.81, 2.22] [48.90, 2.47]\"");
            }
            CliError::Session(SessionError::Geocode(_)) => {
                eprintln!();
                eprintln!("Check that your API key is valid and the network is reachable.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Session(e) => write!(f, "Capture failed: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Session(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SessionError> for CliError {
    fn from(e: SessionError) -> Self {
        CliError::Session(e)
    }
}
