//! Scenario file types
//!
//! Defines the data structures for deserializing YAML scenarios.

use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::path::PathBuf;

use crate::client::{Amount, FailureCategory, SignatureScheme};

/// A scenario loaded from a YAML file
#[derive(Deserialize, Debug)]
pub struct Scenario {
    /// Name of the scenario
    pub name: String,
    /// Optional description of what the scenario covers
    pub description: Option<String>,
    /// Test cases in declaration order
    pub cases: Vec<CaseSpec>,
}

/// One test case
#[derive(Deserialize, Debug)]
pub struct CaseSpec {
    pub name: String,
    /// Incremental group this case belongs to
    pub incremental: Option<String>,
    pub steps: Vec<Step>,
}

/// A single step with an optional failure expectation
#[derive(Deserialize, Debug)]
pub struct Step {
    #[serde(flatten)]
    pub action: Action,
    /// Assert the command is rejected with this category and text
    pub expect_failure: Option<FailureExpectation>,
}

/// Expected classified failure
#[derive(Deserialize, Debug, Clone)]
pub struct FailureExpectation {
    pub category: FailureCategory,
    /// Diagnostic text, compared byte for byte
    pub output: Option<String>,
    /// Regex that must match at least one line of the diagnostic
    #[serde(default, deserialize_with = "deserialize_pattern")]
    pub pattern: Option<Regex>,
}

fn deserialize_pattern<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Regex>, D::Error> {
    Option::<String>::deserialize(deserializer)?
        .map(|p| Regex::new(&p).map_err(serde::de::Error::custom))
        .transpose()
}

/// What a step does
///
/// String fields may reference the session as `$key` or `$key[i]`.
#[derive(Deserialize, Debug)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Read a node state path
    Query {
        path: String,
        depth: Option<i64>,
        /// Expected JSON answer
        expect: Option<Value>,
    },
    /// Produce a block
    Bake {
        delegate: String,
        max_priority: Option<u32>,
        minimal_timestamp: Option<bool>,
        /// Accept operations regardless of fee
        #[serde(default)]
        zero_fees: bool,
    },
    /// Move funds
    Transfer {
        amount: Amount,
        from: String,
        to: String,
        fee: Option<Amount>,
        #[serde(default)]
        force_low_fee: bool,
        burn_cap: Option<Amount>,
        arg: Option<String>,
    },
    /// Generate a key pair
    GenKey {
        alias: String,
        #[serde(default)]
        sig: SignatureScheme,
        #[serde(default)]
        force: bool,
    },
    /// Deploy a contract
    Originate {
        alias: String,
        amount: Amount,
        from: String,
        contract: PathBuf,
        init: Option<String>,
        burn_cap: Option<Amount>,
        fee: Option<Amount>,
        #[serde(default)]
        force: bool,
    },
    /// Register a contract script under an alias
    Remember { alias: String, contract: PathBuf },
    /// Validate a contract
    Typecheck { contract: PathBuf },
    /// Activate a committed account
    ActivateAccount { alias: String, commitment: PathBuf },
    /// Check a balance
    Balance { account: String, expect: Amount },
    /// Store a value in the session
    SessionSet { key: String, value: Value },
    /// Append a value to a session list
    SessionAppend { key: String, value: Value },
}

impl Action {
    /// Short label for progress output
    pub fn describe(&self) -> String {
        match self {
            Self::Query { path, depth, .. } => match depth {
                Some(d) => format!("query {} (depth {})", path, d),
                None => format!("query {}", path),
            },
            Self::Bake { delegate, .. } => format!("bake for {}", delegate),
            Self::Transfer {
                amount, from, to, ..
            } => format!("transfer {} from {} to {}", amount, from, to),
            Self::GenKey { alias, .. } => format!("gen key {}", alias),
            Self::Originate { alias, .. } => format!("originate {}", alias),
            Self::Remember { alias, .. } => format!("remember {}", alias),
            Self::Typecheck { contract } => format!("typecheck {}", contract.display()),
            Self::ActivateAccount { alias, .. } => format!("activate {}", alias),
            Self::Balance { account, expect } => format!("balance of {} is {}", account, expect),
            Self::SessionSet { key, .. } => format!("session set {}", key),
            Self::SessionAppend { key, .. } => format!("session append {}", key),
        }
    }

    /// Whether the step talks to the node
    pub fn is_command(&self) -> bool {
        !matches!(self, Self::SessionSet { .. } | Self::SessionAppend { .. })
    }
}
