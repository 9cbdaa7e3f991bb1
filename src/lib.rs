//! chain-harness - incremental end-to-end tests for blockchain node clients
//!
//! Scenarios drive a node through its command line client. Cases that share
//! an incremental group run in order and share session state; the first
//! failure blocks the rest of the group.

pub mod cli;
pub mod client;
pub mod commands;
pub mod common;
pub mod harness;
pub mod scenario;

// Re-export commonly used types for tests
pub use client::{Amount, CommandClient, CommandFailure, FailureCategory};
pub use common::{expect_failure, Error, Result};
pub use harness::{Controller, ExecutionOutcome, SessionStore, TestCase};
