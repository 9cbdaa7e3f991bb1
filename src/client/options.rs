//! Per-operation options for the command client
//!
//! Each options struct knows how to render itself as client arguments.

use serde::Deserialize;

use super::output::Amount;

/// Options for a raw context query
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct QueryOptions {
    /// Traversal depth. Passed through unvalidated so that the node's own
    /// diagnostic for bad values reaches the caller.
    pub depth: Option<i64>,
}

impl QueryOptions {
    pub fn depth(depth: i64) -> Self {
        Self { depth: Some(depth) }
    }

    /// Append the query string to an RPC path
    pub fn apply(&self, path: &str) -> String {
        match self.depth {
            Some(depth) => {
                let sep = if path.contains('?') { '&' } else { '?' };
                format!("{}{}depth={}", path, sep, depth)
            }
            None => path.to_string(),
        }
    }
}

/// Options for baking a block
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BakeOptions {
    /// Highest priority the baker may bake at
    pub max_priority: Option<u32>,
    /// Use the smallest timestamp allowed
    pub minimal_timestamp: bool,
    /// Minimal fee an operation needs to be included
    pub minimal_fees: Option<Amount>,
    pub minimal_nanotez_per_byte: Option<u64>,
    pub minimal_nanotez_per_gas_unit: Option<u64>,
}

impl BakeOptions {
    /// Accept every operation regardless of its fee
    pub fn zero_fee_thresholds(mut self) -> Self {
        self.minimal_fees = Some(Amount::ZERO);
        self.minimal_nanotez_per_byte = Some(0);
        self.minimal_nanotez_per_gas_unit = Some(0);
        self
    }

    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(p) = self.max_priority {
            args.push("--max-priority".to_string());
            args.push(p.to_string());
        }
        if self.minimal_timestamp {
            args.push("--minimal-timestamp".to_string());
        }
        if let Some(fees) = self.minimal_fees {
            args.push("--minimal-fees".to_string());
            args.push(fees.to_string());
        }
        if let Some(n) = self.minimal_nanotez_per_byte {
            args.push("--minimal-nanotez-per-byte".to_string());
            args.push(n.to_string());
        }
        if let Some(n) = self.minimal_nanotez_per_gas_unit {
            args.push("--minimal-nanotez-per-gas-unit".to_string());
            args.push(n.to_string());
        }
        args
    }
}

/// Options for a transfer
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TransferOptions {
    /// Explicit fee instead of the client's estimate
    pub fee: Option<Amount>,
    /// Allow a fee below the node's minimal fee
    pub force_low_fee: bool,
    pub burn_cap: Option<Amount>,
    /// Parameter passed to a contract recipient
    pub arg: Option<String>,
}

impl TransferOptions {
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(fee) = self.fee {
            args.push("--fee".to_string());
            args.push(fee.to_string());
        }
        if self.force_low_fee {
            args.push("--force-low-fee".to_string());
        }
        if let Some(cap) = self.burn_cap {
            args.push("--burn-cap".to_string());
            args.push(cap.to_string());
        }
        if let Some(arg) = &self.arg {
            args.push("--arg".to_string());
            args.push(arg.clone());
        }
        args
    }
}

/// Signature scheme for generated keys
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SignatureScheme {
    /// Let the client pick
    #[default]
    Default,
    Ed25519,
    Secp256k1,
    P256,
}

impl SignatureScheme {
    fn flag_value(&self) -> Option<&'static str> {
        match self {
            Self::Default => None,
            Self::Ed25519 => Some("ed25519"),
            Self::Secp256k1 => Some("secp256k1"),
            Self::P256 => Some("p256"),
        }
    }
}

/// Options for key generation
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct KeyOptions {
    pub sig: SignatureScheme,
    /// Overwrite an existing alias
    pub force: bool,
}

impl KeyOptions {
    pub fn with_scheme(sig: SignatureScheme) -> Self {
        Self { sig, force: false }
    }

    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(sig) = self.sig.flag_value() {
            args.push("--sig".to_string());
            args.push(sig.to_string());
        }
        if self.force {
            args.push("--force".to_string());
        }
        args
    }
}

/// Options for contract origination
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OriginateOptions {
    /// Initial storage
    pub init: Option<String>,
    pub burn_cap: Option<Amount>,
    pub fee: Option<Amount>,
    pub force: bool,
}

impl OriginateOptions {
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(init) = &self.init {
            args.push("--init".to_string());
            args.push(init.clone());
        }
        if let Some(cap) = self.burn_cap {
            args.push("--burn-cap".to_string());
            args.push(cap.to_string());
        }
        if let Some(fee) = self.fee {
            args.push("--fee".to_string());
            args.push(fee.to_string());
        }
        if self.force {
            args.push("--force".to_string());
        }
        args
    }
}
