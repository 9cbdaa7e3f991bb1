//! Test cases and their outcomes

use std::fmt;

use async_trait::async_trait;

use super::session::SessionStore;
use crate::client::{CommandClient, CommandFailure};
use crate::common::{Error, Result};

/// Collection-time metadata of a test case
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseMeta {
    pub name: String,
    /// Position in declaration order across the whole collection
    pub index: usize,
    /// Incremental group the case belongs to, `None` for an independent case
    pub incremental: Option<String>,
}

impl CaseMeta {
    pub fn new(name: impl Into<String>, index: usize) -> Self {
        Self {
            name: name.into(),
            index,
            incremental: None,
        }
    }

    pub fn incremental(mut self, group: impl Into<String>) -> Self {
        self.incremental = Some(group.into());
        self
    }
}

/// What a running case may touch
pub struct CaseContext<'a> {
    pub client: &'a CommandClient,
    pub session: &'a mut SessionStore,
}

/// A named unit of work
///
/// Returning an error (including a node rejection propagated with `?`)
/// fails the case.
#[async_trait]
pub trait TestCase: Send + Sync {
    fn meta(&self) -> &CaseMeta;

    async fn run(&self, ctx: &mut CaseContext<'_>) -> Result<()>;
}

/// Why a case failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// An assertion did not hold
    Assertion(String),
    /// A node rejection the case did not handle
    Command(CommandFailure),
    /// The case body panicked
    Panic(String),
    /// The harness itself failed (client missing, bad scenario, ...)
    Harness(String),
}

impl From<Error> for FailureReason {
    fn from(err: Error) -> Self {
        match err {
            Error::TestAssertion(msg) => Self::Assertion(msg),
            Error::Command(failure) => Self::Command(failure),
            other => Self::Harness(other.to_string()),
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Assertion(msg) => write!(f, "assertion failed: {}", msg),
            Self::Command(failure) => write!(
                f,
                "command failed ({}): {:?}",
                failure.category, failure.raw_output
            ),
            Self::Panic(msg) => write!(f, "panicked: {}", msg),
            Self::Harness(msg) => write!(f, "harness error: {}", msg),
        }
    }
}

/// Terminal outcome of one case
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Passed,
    Failed(FailureReason),
    /// Not executed because an earlier case of its group failed
    Blocked,
}

impl ExecutionOutcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked)
    }
}
