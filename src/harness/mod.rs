//! Incremental test execution
//!
//! Test cases are collected into groups, and each group runs in declaration
//! order against its own session store. A failure blocks the remainder of
//! its group; other groups are unaffected.

pub mod case;
pub mod controller;
pub mod group;
pub mod report;
pub mod session;

pub use case::{CaseContext, CaseMeta, ExecutionOutcome, FailureReason, TestCase};
pub use controller::{CaseReport, Controller, GroupReport, GroupState};
pub use group::{collect_groups, Group};
pub use report::{RunReport, Tally};
pub use session::{SessionError, SessionStore};
