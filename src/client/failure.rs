//! Classified failures of node client invocations
//!
//! A failure always carries the verbatim diagnostic text produced by the
//! client process. Scenarios assert on that text byte-for-byte, so nothing
//! in this module trims or rewrites it.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Category of a rejected client invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    /// The requested path or operation does not exist on the node
    NoServiceFound,
    /// A supplied parameter was rejected by the node
    InvalidArgument,
    /// A well-formed request was refused by node policy
    OperationRejected,
    /// Contract validation failed
    TypecheckFailed,
    /// Anything else
    Unclassified,
}

impl FailureCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoServiceFound => "no_service_found",
            Self::InvalidArgument => "invalid_argument",
            Self::OperationRejected => "operation_rejected",
            Self::TypecheckFailed => "typecheck_failed",
            Self::Unclassified => "unclassified",
        }
    }
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operation kinds, used to pick a category for a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Bake,
    Transfer,
    GenerateKey,
    Originate,
    Remember,
    Typecheck,
    ActivateAccount,
    GetBalance,
    Raw,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Bake => "bake",
            Self::Transfer => "transfer",
            Self::GenerateKey => "gen_key",
            Self::Originate => "originate",
            Self::Remember => "remember",
            Self::Typecheck => "typecheck",
            Self::ActivateAccount => "activate_account",
            Self::GetBalance => "get_balance",
            Self::Raw => "raw",
        }
    }
}

/// A rejected client invocation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{category}: {raw_output:?}")]
pub struct CommandFailure {
    pub category: FailureCategory,
    /// Verbatim diagnostic text from the client process
    pub raw_output: String,
}

impl CommandFailure {
    pub fn new(category: FailureCategory, raw_output: impl Into<String>) -> Self {
        Self {
            category,
            raw_output: raw_output.into(),
        }
    }

    /// Classify a diagnostic produced by `kind`
    pub fn classify(kind: OperationKind, raw_output: impl Into<String>) -> Self {
        let raw_output = raw_output.into();
        let category = classify(kind, &raw_output);
        Self {
            category,
            raw_output,
        }
    }

    pub fn is(&self, category: FailureCategory) -> bool {
        self.category == category
    }
}

const NO_SERVICE: &[&str] = &["No service found"];

/// The node's answer to a bad `depth` query parameter
static EXTRACTION_DEPTH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Extraction depth \S+ is invalid").unwrap());

const INVALID_ARGUMENT: &[&str] = &[
    "Invalid argument",
    "Unexpected argument",
    "Erroneous command line argument",
    "Unrecognized command",
];

const REJECTED: &[&str] = &[
    "Balance of contract",
    "balance_too_low",
    "Balance too low",
    "is below the minimum",
    "fee is too low",
    "Fee is too low",
    "counter_in_the_past",
    "The operation will burn",
    "Error while applying operation",
    "rejected",
    "Unregistered delegate",
    "Invalid activation",
    "already activated",
];

/// Pick the failure category for a diagnostic text
///
/// Typecheck failures are always `TypecheckFailed`. Otherwise the text is
/// matched against known diagnostics, most specific first.
pub fn classify(kind: OperationKind, raw_output: &str) -> FailureCategory {
    if kind == OperationKind::Typecheck {
        return FailureCategory::TypecheckFailed;
    }

    let contains_any = |needles: &[&str]| needles.iter().any(|n| raw_output.contains(n));

    if contains_any(NO_SERVICE) {
        FailureCategory::NoServiceFound
    } else if EXTRACTION_DEPTH.is_match(raw_output) || contains_any(INVALID_ARGUMENT) {
        FailureCategory::InvalidArgument
    } else if contains_any(REJECTED) {
        FailureCategory::OperationRejected
    } else {
        FailureCategory::Unclassified
    }
}
