//! Structured representation of client output
//!
//! Parsers turn the free-form text printed by the node client into typed
//! payloads. When the expected pattern is missing the whole output is
//! handed back untouched so it can become an `Unclassified` failure.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Number of micro-units in one unit of the chain currency
pub const MUTEZ_PER_TEZ: u64 = 1_000_000;

/// Number of fractional digits an [`Amount`] can carry
const FRACTION_DIGITS: usize = 6;

/// A non-negative amount of tez, stored in mutez
///
/// Integer storage keeps balances such as `999.95` exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_mutez(mutez: u64) -> Self {
        Self(mutez)
    }

    pub const fn from_tez(tez: u64) -> Self {
        Self(tez * MUTEZ_PER_TEZ)
    }

    pub const fn as_mutez(&self) -> u64 {
        self.0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }
}

/// Error returned when a decimal amount cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid amount '{0}'")]
pub struct ParseAmountError(pub String);

impl FromStr for Amount {
    type Err = ParseAmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseAmountError(s.to_string());

        let (whole, fraction) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };

        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(err());
        }
        if fraction.len() > FRACTION_DIGITS || !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return Err(err());
        }

        let whole: u64 = whole.parse().map_err(|_| err())?;
        let mut padded = fraction.to_string();
        while padded.len() < FRACTION_DIGITS {
            padded.push('0');
        }
        let fraction: u64 = padded.parse().map_err(|_| err())?;

        whole
            .checked_mul(MUTEZ_PER_TEZ)
            .and_then(|m| m.checked_add(fraction))
            .map(Amount)
            .ok_or_else(err)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / MUTEZ_PER_TEZ;
        let fraction = self.0 % MUTEZ_PER_TEZ;
        if fraction == 0 {
            write!(f, "{}", whole)
        } else {
            let digits = format!("{:06}", fraction);
            write!(f, "{}.{}", whole, digits.trim_end_matches('0'))
        }
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Scenario files write amounts as bare YAML numbers
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(u64),
            Float(f64),
            Str(String),
        }

        let text = match Raw::deserialize(deserializer)? {
            Raw::Int(i) => i.to_string(),
            Raw::Float(f) => {
                let text = f.to_string();
                if significant_digits(&text) > F64_EXACT_DIGITS {
                    return Err(serde::de::Error::custom(format!(
                        "amount {} has more digits than a bare number keeps exactly; quote it",
                        text
                    )));
                }
                text
            }
            Raw::Str(s) => s,
        };
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Decimal digits an f64 is guaranteed to round-trip
const F64_EXACT_DIGITS: usize = 15;

fn significant_digits(text: &str) -> usize {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    digits.trim_start_matches('0').len()
}

static BALANCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"([\w.]*) ꜩ").unwrap());
static OPERATION_HASH: Lazy<Regex> = Lazy::new(|| Regex::new(r"Operation hash is '?(\w*)").unwrap());
static BRANCH: Lazy<Regex> = Lazy::new(|| Regex::new(r"--branch ?(\w*)").unwrap());
static INJECTED_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"Injected block ?(\w*)").unwrap());
static NEW_CONTRACT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"New contract ?(\w*) originated").unwrap());

fn capture(re: &Regex, output: &str) -> Option<String> {
    re.captures(output)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Result of a `bake for` invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BakeReceipt {
    pub block_hash: String,
}

impl BakeReceipt {
    pub fn parse(output: &str) -> Option<Self> {
        Some(Self {
            block_hash: capture(&INJECTED_BLOCK, output)?,
        })
    }
}

/// Result of a `transfer` invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferReceipt {
    pub operation_hash: String,
    pub branch: String,
}

impl TransferReceipt {
    pub fn parse(output: &str) -> Option<Self> {
        Some(Self {
            operation_hash: capture(&OPERATION_HASH, output)?,
            branch: capture(&BRANCH, output)?,
        })
    }
}

/// Result of an `originate contract` invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OriginationReceipt {
    pub contract: String,
    pub operation_hash: String,
}

impl OriginationReceipt {
    pub fn parse(output: &str) -> Option<Self> {
        Some(Self {
            contract: capture(&NEW_CONTRACT, output)?,
            operation_hash: capture(&OPERATION_HASH, output)?,
        })
    }
}

/// Result of an `activate account` invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivationReceipt {
    pub operation_hash: String,
}

impl ActivationReceipt {
    pub fn parse(output: &str) -> Option<Self> {
        Some(Self {
            operation_hash: capture(&OPERATION_HASH, output)?,
        })
    }
}

/// Extract the balance from `get balance for` output
pub fn extract_balance(output: &str) -> Option<Amount> {
    capture(&BALANCE, output)?.parse().ok()
}

/// Decode the JSON answer of an RPC call
pub fn extract_rpc_answer(output: &str) -> Option<serde_json::Value> {
    serde_json::from_str(output).ok()
}
