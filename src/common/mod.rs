//! Utilities shared by the harness CLI and the mock node

pub mod config;
pub mod error;
pub mod logging;
pub mod paths;

pub use error::{expect_failure, Error, Result};
