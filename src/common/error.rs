//! Error types for the harness
//!
//! Node rejections travel as [`Error::Command`] so that a test case can tell
//! an expected rejection (inspect the [`CommandFailure`]) apart from a
//! broken harness (everything else).

use std::io;
use thiserror::Error;

use crate::client::CommandFailure;
use crate::harness::session::SessionError;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the harness
#[derive(Error, Debug)]
pub enum Error {
    // === Node Client Errors ===
    #[error("Node client '{name}' not found. Searched: {searched}")]
    ClientNotFound { name: String, searched: String },

    #[error("Failed to run node client '{program}': {error}")]
    ClientSpawn { program: String, error: String },

    #[error("Command failed ({})\n{}", .0.category, .0.raw_output)]
    Command(#[from] CommandFailure),

    // === Session Errors ===
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    // === Harness Errors ===
    #[error("Invalid group transition: cannot {action} while {state}")]
    InvalidTransition { action: String, state: String },

    // === Scenario Errors ===
    #[error("Scenario error: {0}")]
    Scenario(String),

    // === Configuration Errors ===
    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // === Test Errors ===
    #[error("Test assertion failed: {0}")]
    TestAssertion(String),
}

impl Error {
    /// Create a client not found error with search paths
    pub fn client_not_found<S: AsRef<str>>(name: &str, paths: &[S]) -> Self {
        Self::ClientNotFound {
            name: name.to_string(),
            searched: paths.iter().map(|s| s.as_ref()).collect::<Vec<_>>().join(", "),
        }
    }

    /// Create an invalid transition error
    pub fn invalid_transition(action: &str, state: impl std::fmt::Debug) -> Self {
        Self::InvalidTransition {
            action: action.to_string(),
            state: format!("{:?}", state),
        }
    }

    /// Create an assertion failure with expected and observed values
    pub fn assertion(what: &str, expected: impl std::fmt::Display, observed: impl std::fmt::Display) -> Self {
        Self::TestAssertion(format!(
            "{}: expected '{}', got '{}'",
            what, expected, observed
        ))
    }

    /// The node rejection carried by this error, if any
    pub fn command_failure(&self) -> Option<&CommandFailure> {
        match self {
            Self::Command(f) => Some(f),
            _ => None,
        }
    }
}

/// Turn a call that should have been rejected into its failure
///
/// A success becomes an assertion error; errors other than a node rejection
/// are propagated unchanged.
pub fn expect_failure<T: std::fmt::Debug>(result: Result<T>) -> Result<CommandFailure> {
    match result {
        Ok(value) => Err(Error::TestAssertion(format!(
            "expected the command to fail, but it succeeded with {:?}",
            value
        ))),
        Err(Error::Command(failure)) => Ok(failure),
        Err(other) => Err(other),
    }
}
