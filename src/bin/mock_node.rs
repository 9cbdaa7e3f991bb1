//! Mock node client binary for integration testing
//!
//! Answers the client commands the harness issues (`rpc get`, `bake for`,
//! `transfer`, `gen keys`, ...) with the same output formats and
//! diagnostics as the real client. A small ledger is kept in
//! `<base-dir>/mock-node.json`; injected operations stay pending until a
//! block is baked.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chain_harness::client::Amount;
use chain_harness::common::logging;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const LEDGER_FILE: &str = "mock-node.json";
const LOG_FILE: &str = "mock-node.log";

const RAW_CONTEXT_PREFIX: &str = "/chains/main/blocks/head/context/raw/bytes";
const NO_SERVICE: &str = "No service found at this URL\n\n";
const UNRECOGNIZED: &str = "Unrecognized command.\nTry using the man command to get more information.\n";

const BOOTSTRAP_BALANCE: Amount = Amount::from_tez(4_000_000);
const DEFAULT_FEE: Amount = Amount::from_mutez(1_282);
const MINIMAL_FEE: Amount = Amount::from_mutez(100);
/// Burned when a transfer funds an account for the first time
const ALLOCATION_BURN: Amount = Amount::from_mutez(257_000);
const ORIGINATION_BURN: Amount = Amount::from_mutez(257_000);

/// alias, public key hash, raw key bytes
const BOOTSTRAP: [(&str, &str, &str); 5] = [
    ("bootstrap1", "tz1KqTpEZ7Yob7QbPE4Hy4Wo8fHG8LhKxZSx", "02298c03ed7d454a101eb7022bc95f7e5f41ac78"),
    ("bootstrap2", "tz1gjaF81ZRRvdzjobyfVNsAeSC6PScjfQwN", "e7670f32038107a59a2b9cfefae36ea21f5aa63c"),
    ("bootstrap3", "tz1faswCTDciRzE4oJ9jn2Vm2dvjeyA9fUzU", "c55cf02dbeecc978d9c84625dcae72bb77ea4fbd"),
    ("bootstrap4", "tz1b7tUupMgCNw2cCLpKTkSD1NZzB5TkP2sv", "dac9f52543da1aed0bc1d6b46bf7c10db7014cd6"),
    ("bootstrap5", "tz1ddb9NMYHZi5UzPdzTZMYQQZoMub195zgv", "a9ceae0d8d8af7b1fd1bf1dc50ccde4c5f15d3e7"),
];

const BASE58: &[u8] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (base_dir, command) = split_global_options(&args);

    if std::fs::create_dir_all(&base_dir).is_ok() {
        logging::init_file(&base_dir.join(LOG_FILE), "mock_node=debug");
    }
    tracing::debug!(?command, "invoked");

    let reply = match Ledger::load(&base_dir) {
        Ok(mut ledger) => {
            let reply = ledger.handle(&command);
            if reply.code == 0 {
                if let Err(e) = ledger.save(&base_dir) {
                    Reply::fatal(&e)
                } else {
                    reply
                }
            } else {
                reply
            }
        }
        Err(e) => Reply::fatal(&e),
    };

    tracing::debug!(code = reply.code, "replied");
    print!("{}", reply.stdout);
    eprint!("{}", reply.stderr);
    std::process::exit(reply.code);
}

/// Strip `--base-dir` / `--endpoint` (and their short forms) from the front
fn split_global_options(args: &[String]) -> (PathBuf, Vec<String>) {
    let mut base_dir = PathBuf::from(".");
    let mut rest = args;
    loop {
        match rest {
            [flag, value, tail @ ..] if flag == "--base-dir" || flag == "-d" => {
                base_dir = PathBuf::from(value);
                rest = tail;
            }
            [flag, _, tail @ ..] if flag == "--endpoint" || flag == "-E" => {
                rest = tail;
            }
            _ => break,
        }
    }
    (base_dir, rest.to_vec())
}

/// What the process prints and how it exits
struct Reply {
    stdout: String,
    stderr: String,
    code: i32,
}

impl Reply {
    fn out(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            code: 0,
        }
    }

    fn err(stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            code: 1,
        }
    }

    fn fatal(error: &str) -> Self {
        Self {
            stdout: String::new(),
            stderr: format!("Fatal error:\n  {}\n", error),
            code: 2,
        }
    }
}

type Handled = Result<String, String>;

/// Options following the positional words of a command
#[derive(Default)]
struct Options {
    values: BTreeMap<String, String>,
    flags: Vec<String>,
}

const VALUE_OPTIONS: &[&str] = &[
    "--fee",
    "--burn-cap",
    "--arg",
    "--init",
    "--sig",
    "--max-priority",
    "--minimal-fees",
    "--minimal-nanotez-per-byte",
    "--minimal-nanotez-per-gas-unit",
];
const FLAG_OPTIONS: &[&str] = &["--force-low-fee", "--force", "--minimal-timestamp"];

impl Options {
    fn parse(words: &[String]) -> Result<(Vec<String>, Self), String> {
        let mut positional = Vec::new();
        let mut options = Self::default();
        let mut iter = words.iter();
        while let Some(word) = iter.next() {
            if VALUE_OPTIONS.contains(&word.as_str()) {
                let value = iter.next().ok_or_else(|| {
                    format!("Erroneous command line argument:\n  option {} expects a value\n", word)
                })?;
                options.values.insert(word.clone(), value.clone());
            } else if FLAG_OPTIONS.contains(&word.as_str()) {
                options.flags.push(word.clone());
            } else if word.starts_with("--") {
                return Err(format!(
                    "Erroneous command line argument:\n  unknown option {}\n",
                    word
                ));
            } else {
                positional.push(word.clone());
            }
        }
        Ok((positional, options))
    }

    fn flag(&self, name: &str) -> bool {
        self.flags.iter().any(|f| f == name)
    }

    fn value(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    fn amount(&self, name: &str) -> Result<Option<Amount>, String> {
        self.value(name).map(parse_amount).transpose()
    }
}

fn parse_amount(text: &str) -> Result<Amount, String> {
    text.parse::<Amount>()
        .map_err(|_| format!("Erroneous command line argument:\n  amount '{}' is invalid\n", text))
}

fn read_file(path: &str) -> Result<String, String> {
    let path = path.strip_prefix("file:").unwrap_or(path);
    std::fs::read_to_string(path)
        .map_err(|e| format!("Error:\n  cannot read file {}: {}\n", path, e))
}

fn check_script(text: &str) -> Result<(), String> {
    for section in ["parameter", "storage", "code"] {
        if !text.contains(section) {
            return Err(format!("Ill typed contract:\n  missing script {}\n", section));
        }
    }
    Ok(())
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct Account {
    address: String,
    balance: Amount,
    /// Funded at least once
    allocated: bool,
    #[serde(default)]
    delegate: bool,
    script: Option<String>,
    storage: Option<String>,
}

impl Account {
    fn implicit(address: String) -> Self {
        Self {
            address,
            balance: Amount::ZERO,
            allocated: false,
            delegate: false,
            script: None,
            storage: None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Pending {
    Transfer {
        hash: String,
        source: String,
        destination: String,
        amount: Amount,
        fee: Amount,
        burn: Amount,
    },
    Origination {
        hash: String,
        source: String,
        contract: String,
        amount: Amount,
        fee: Amount,
        burn: Amount,
    },
    Activation {
        hash: String,
        alias: String,
        amount: Amount,
    },
}

impl Pending {
    /// Whether a block baked with this fee threshold picks the operation up
    ///
    /// Activations carry no fee and are always included.
    fn included_at(&self, minimal_fee: Amount) -> bool {
        match self {
            Self::Transfer { fee, .. } | Self::Origination { fee, .. } => *fee >= minimal_fee,
            Self::Activation { .. } => true,
        }
    }

    /// Amount the operation takes from `alias` once applied
    fn debit_of(&self, alias: &str) -> Amount {
        match self {
            Self::Transfer {
                source,
                amount,
                fee,
                burn,
                ..
            }
            | Self::Origination {
                source,
                amount,
                fee,
                burn,
                ..
            } if source == alias => Amount::from_mutez(amount.as_mutez() + fee.as_mutez() + burn.as_mutez()),
            _ => Amount::ZERO,
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
struct Ledger {
    level: u64,
    seed: u64,
    head: String,
    /// Keyed by alias
    accounts: BTreeMap<String, Account>,
    /// Remembered script aliases
    scripts: BTreeMap<String, String>,
    pending: Vec<Pending>,
    activated: Vec<String>,
}

impl Ledger {
    fn genesis() -> Self {
        let accounts = BOOTSTRAP
            .iter()
            .map(|(alias, pkh, _)| {
                let account = Account {
                    balance: BOOTSTRAP_BALANCE,
                    allocated: true,
                    delegate: true,
                    ..Account::implicit(pkh.to_string())
                };
                (alias.to_string(), account)
            })
            .collect();

        let mut ledger = Self {
            level: 1,
            seed: 0x5eed,
            head: String::new(),
            accounts,
            scripts: BTreeMap::new(),
            pending: Vec::new(),
            activated: Vec::new(),
        };
        ledger.head = ledger.next_hash("BL", 51);
        ledger
    }

    fn load(base_dir: &Path) -> Result<Self, String> {
        let path = base_dir.join(LEDGER_FILE);
        if !path.exists() {
            return Ok(Self::genesis());
        }
        let content = std::fs::read_to_string(&path)
            .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
        serde_json::from_str(&content).map_err(|e| format!("corrupt ledger {}: {}", path.display(), e))
    }

    fn save(&self, base_dir: &Path) -> Result<(), String> {
        let path = base_dir.join(LEDGER_FILE);
        let content = serde_json::to_string_pretty(self).map_err(|e| e.to_string())?;
        std::fs::write(&path, content).map_err(|e| format!("cannot write {}: {}", path.display(), e))
    }

    /// Deterministic base58-looking hash
    fn next_hash(&mut self, prefix: &str, len: usize) -> String {
        self.seed = self
            .seed
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        let mut state = self.seed;
        let mut hash = prefix.to_string();
        while hash.len() < len {
            state ^= state >> 33;
            state = state.wrapping_mul(0xff51afd7ed558ccd);
            hash.push(BASE58[(state % BASE58.len() as u64) as usize] as char);
        }
        hash
    }

    fn handle(&mut self, command: &[String]) -> Reply {
        let (words, options) = match Options::parse(command) {
            Ok(parsed) => parsed,
            Err(e) => return Reply::err(e),
        };
        let words: Vec<&str> = words.iter().map(String::as_str).collect();

        let result = match words.as_slice() {
            ["rpc", "get", path] => return self.rpc_get(path),
            ["bake", "for", delegate] => self.bake(delegate, &options),
            ["transfer", amount, "from", source, "to", destination] => {
                self.transfer(amount, source, destination, &options)
            }
            ["gen", "keys", alias] => self.gen_keys(alias, &options),
            ["originate", "contract", alias, "transferring", amount, "from", source, "running", file] => {
                self.originate(alias, amount, source, file, &options)
            }
            ["remember", "script", alias, file] => self.remember(alias, file),
            ["typecheck", "script", file] => self.typecheck(file),
            ["activate", "account", alias, "with", file] => self.activate(alias, file, &options),
            ["get", "balance", "for", account] => self.balance(account),
            _ => Err(UNRECOGNIZED.to_string()),
        };

        match result {
            Ok(stdout) => Reply::out(stdout),
            Err(stderr) => Reply::err(stderr),
        }
    }

    /// Alias of an account given by alias or address
    fn lookup(&self, name: &str) -> Result<String, String> {
        if self.accounts.contains_key(name) {
            return Ok(name.to_string());
        }
        self.accounts
            .iter()
            .find(|(_, a)| a.address == name)
            .map(|(alias, _)| alias.clone())
            .ok_or_else(|| format!("Error:\n  no contract or key named {}\n", name))
    }

    fn account(&self, alias: &str) -> Result<&Account, String> {
        self.accounts
            .get(alias)
            .ok_or_else(|| format!("Error:\n  no contract or key named {}\n", alias))
    }

    /// Balance minus what pending operations will take
    fn available(&self, alias: &str) -> Result<Amount, String> {
        let balance = self.account(alias)?.balance;
        let reserved: u64 = self.pending.iter().map(|p| p.debit_of(alias).as_mutez()).sum();
        Ok(balance.checked_sub(Amount::from_mutez(reserved)).unwrap_or(Amount::ZERO))
    }

    fn check_fee(&self, fee: Amount, options: &Options) -> Result<(), String> {
        if fee < MINIMAL_FEE && !options.flag("--force-low-fee") {
            return Err(format!(
                "Error:\n  Fee is too low: the proposed fee ({} ꜩ) is lower than the fee that baker expect by default ({} ꜩ).\n  Use `--force-low-fee` to emit this operation anyway.\n",
                fee, MINIMAL_FEE
            ));
        }
        Ok(())
    }

    fn check_burn(&self, burn: Amount, options: &Options) -> Result<(), String> {
        let cap = options.amount("--burn-cap")?.unwrap_or(Amount::ZERO);
        if burn > cap {
            return Err(format!(
                "Error:\n  The operation will burn {} ꜩ which is higher than the configured burn cap ({} ꜩ).\n  Use `--burn-cap {}` to emit this operation.\n",
                burn, cap, burn
            ));
        }
        Ok(())
    }

    fn check_funds(&self, source: &str, amount: Amount, total: Amount) -> Result<(), String> {
        let available = self.available(source)?;
        if available < total {
            return Err(format!(
                "Error:\n  Balance of contract {} too low ({}) to spend {}\n",
                self.account(source)?.address,
                available,
                amount
            ));
        }
        Ok(())
    }

    fn injection_receipt(&self, hash: &str) -> String {
        format!(
            "Node is bootstrapped.\n\
             Operation successfully injected in the node.\n\
             Operation hash is '{hash}'\n\
             Waiting for the operation to be included...\n\
             Use command\n  \
             octez-client wait for {hash} to be included --confirmations 30 --branch {branch}\n\
             and/or an external block explorer to make sure that it has been included.\n",
            hash = hash,
            branch = self.head
        )
    }

    fn raw_context(&self) -> Value {
        let mut delegates = Value::Object(Map::new());
        for (_, _, key) in BOOTSTRAP.iter() {
            let (head, rest) = key.split_at(12);
            let mut path: Vec<String> = head
                .as_bytes()
                .chunks(2)
                .map(|c| String::from_utf8_lossy(c).into_owned())
                .collect();
            path.push(rest.to_string());
            insert_path(&mut delegates, &path, Value::String("00".to_string()));
        }

        let mut root = Map::new();
        root.insert("delegates".to_string(), serde_json::json!({ "ed25519": delegates }));
        root.insert("version".to_string(), Value::String("67656e65736973".to_string()));
        Value::Object(root)
    }

    fn rpc_get(&self, target: &str) -> Reply {
        let (path, query) = match target.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (target, None),
        };

        let mut depth: Option<i64> = None;
        for param in query.unwrap_or("").split('&').filter(|p| !p.is_empty()) {
            if let Some(value) = param.strip_prefix("depth=") {
                match value.parse::<i64>() {
                    Ok(d) if d >= 0 => depth = Some(d),
                    _ => {
                        return Reply::err(format!(
                            "Command failed : Extraction depth {} is invalid\n\n",
                            value
                        ))
                    }
                }
            }
        }

        let answer = if let Some(rest) = path.strip_prefix(RAW_CONTEXT_PREFIX) {
            let mut node = self.raw_context();
            for segment in rest.split('/').filter(|s| !s.is_empty()) {
                match node.get(segment) {
                    Some(child) => node = child.clone(),
                    None => return Reply::out(NO_SERVICE),
                }
            }
            match depth {
                Some(d) => truncate(&node, d as u64),
                None => node,
            }
        } else if path == "/chains/main/blocks/head/header" {
            serde_json::json!({ "level": self.level, "hash": self.head })
        } else {
            return Reply::out(NO_SERVICE);
        };

        match serde_json::to_string_pretty(&answer) {
            Ok(text) => Reply::out(format!("{}\n", text)),
            Err(e) => Reply::fatal(&e.to_string()),
        }
    }

    fn bake(&mut self, delegate: &str, options: &Options) -> Handled {
        let alias = self.lookup(delegate)?;
        if !self.account(&alias)?.delegate {
            return Err(format!(
                "Error:\n  Unregistered delegate {}\n",
                self.account(&alias)?.address
            ));
        }
        let minimal_fee = options.amount("--minimal-fees")?.unwrap_or(MINIMAL_FEE);

        let (included, kept): (Vec<Pending>, Vec<Pending>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|op| op.included_at(minimal_fee));
        self.pending = kept;

        for op in &included {
            self.apply(op);
        }

        self.level += 1;
        self.head = self.next_hash("BL", 51);
        tracing::debug!(level = self.level, included = included.len(), "baked");
        Ok(format!("Injected block {}\n", &self.head[..12]))
    }

    fn apply(&mut self, op: &Pending) {
        match op {
            Pending::Transfer {
                source,
                destination,
                amount,
                ..
            }
            | Pending::Origination {
                source,
                contract: destination,
                amount,
                ..
            } => {
                let debit = op.debit_of(source);
                if let Some(src) = self.accounts.get_mut(source) {
                    src.balance = src.balance.checked_sub(debit).unwrap_or(Amount::ZERO);
                }
                if let Some(dst) = self.accounts.get_mut(destination) {
                    dst.balance = dst.balance.checked_add(*amount).unwrap_or(dst.balance);
                    dst.allocated = true;
                }
            }
            Pending::Activation { alias, amount, .. } => {
                if let Some(account) = self.accounts.get_mut(alias) {
                    account.balance = account.balance.checked_add(*amount).unwrap_or(account.balance);
                    account.allocated = true;
                }
            }
        }
    }

    fn transfer(&mut self, amount: &str, source: &str, destination: &str, options: &Options) -> Handled {
        let amount = parse_amount(amount)?;
        let fee = options.amount("--fee")?.unwrap_or(DEFAULT_FEE);
        self.check_fee(fee, options)?;

        let source = self.lookup(source)?;
        let destination = self.lookup(destination)?;

        let funded_soon = self.pending.iter().any(|p| {
            matches!(p, Pending::Transfer { destination: d, .. } if *d == destination)
        });
        let burn = if self.account(&destination)?.allocated || funded_soon {
            Amount::ZERO
        } else {
            ALLOCATION_BURN
        };
        self.check_burn(burn, options)?;

        let total = Amount::from_mutez(amount.as_mutez() + fee.as_mutez() + burn.as_mutez());
        self.check_funds(&source, amount, total)?;

        let hash = self.next_hash("oo", 51);
        self.pending.push(Pending::Transfer {
            hash: hash.clone(),
            source,
            destination,
            amount,
            fee,
            burn,
        });
        Ok(self.injection_receipt(&hash))
    }

    fn gen_keys(&mut self, alias: &str, options: &Options) -> Handled {
        if self.accounts.contains_key(alias) && !options.flag("--force") {
            return Err(format!(
                "Error:\n  The secret_key alias {} already exists.\n  Use --force to update\n",
                alias
            ));
        }
        let prefix = match options.value("--sig") {
            None | Some("ed25519") => "tz1",
            Some("secp256k1") => "tz2",
            Some("p256") => "tz3",
            Some(other) => {
                return Err(format!(
                    "Erroneous command line argument:\n  signature scheme '{}' is invalid\n",
                    other
                ))
            }
        };
        let address = self.next_hash(prefix, 36);
        self.accounts.insert(alias.to_string(), Account::implicit(address));
        Ok(String::new())
    }

    fn originate(
        &mut self,
        alias: &str,
        amount: &str,
        source: &str,
        file: &str,
        options: &Options,
    ) -> Handled {
        if self.accounts.contains_key(alias) && !options.flag("--force") {
            return Err(format!(
                "Error:\n  The contract alias {} already exists.\n  Use --force to update\n",
                alias
            ));
        }
        let amount = parse_amount(amount)?;
        let fee = options.amount("--fee")?.unwrap_or(DEFAULT_FEE);
        self.check_fee(fee, options)?;
        let source = self.lookup(source)?;

        let script = read_file(file)?;
        check_script(&script)?;
        self.check_burn(ORIGINATION_BURN, options)?;

        let total = Amount::from_mutez(amount.as_mutez() + fee.as_mutez() + ORIGINATION_BURN.as_mutez());
        self.check_funds(&source, amount, total)?;

        let address = self.next_hash("KT1", 36);
        self.accounts.insert(
            alias.to_string(),
            Account {
                script: Some(script),
                storage: options.value("--init").map(str::to_string),
                ..Account::implicit(address.clone())
            },
        );

        let hash = self.next_hash("oo", 51);
        self.pending.push(Pending::Origination {
            hash: hash.clone(),
            source,
            contract: alias.to_string(),
            amount,
            fee,
            burn: ORIGINATION_BURN,
        });

        Ok(format!(
            "{}New contract {} originated.\nContract memorized as {}.\n",
            self.injection_receipt(&hash),
            address,
            alias
        ))
    }

    fn remember(&mut self, alias: &str, file: &str) -> Handled {
        read_file(file)?;
        self.scripts.insert(alias.to_string(), file.to_string());
        Ok(String::new())
    }

    fn typecheck(&self, file: &str) -> Handled {
        let script = read_file(file)?;
        check_script(&script)?;
        Ok("Well typed\nGas remaining: 1039991.000 units remaining\n".to_string())
    }

    fn activate(&mut self, alias: &str, file: &str, options: &Options) -> Handled {
        #[derive(Deserialize)]
        struct Commitment {
            pkh: String,
            amount: String,
        }

        let content = read_file(file)?;
        let commitment: Commitment = serde_json::from_str(&content)
            .map_err(|e| format!("Error:\n  commitment file {} is invalid: {}\n", file, e))?;
        let amount = commitment
            .amount
            .parse::<u64>()
            .map(Amount::from_mutez)
            .map_err(|_| format!("Error:\n  commitment amount {} is invalid\n", commitment.amount))?;

        if self.activated.contains(&commitment.pkh) {
            return Err(format!(
                "Error:\n  Invalid activation. The public key {} has already been activated.\n",
                commitment.pkh
            ));
        }
        if self.accounts.contains_key(alias) && !options.flag("--force") {
            return Err(format!(
                "Error:\n  The secret_key alias {} already exists.\n  Use --force to update\n",
                alias
            ));
        }

        self.accounts
            .insert(alias.to_string(), Account::implicit(commitment.pkh.clone()));
        self.activated.push(commitment.pkh.clone());

        let hash = self.next_hash("oo", 51);
        self.pending.push(Pending::Activation {
            hash: hash.clone(),
            alias: alias.to_string(),
            amount,
        });

        Ok(format!(
            "{}Account {} ({}) activated with {} ꜩ.\n",
            self.injection_receipt(&hash),
            alias,
            commitment.pkh,
            amount
        ))
    }

    fn balance(&self, account: &str) -> Handled {
        let alias = self.lookup(account)?;
        Ok(format!("{} ꜩ\n", self.account(&alias)?.balance))
    }
}

/// Insert `leaf` at `path`, creating intermediate objects
fn insert_path(tree: &mut Value, path: &[String], leaf: Value) {
    let Some((first, rest)) = path.split_first() else {
        *tree = leaf;
        return;
    };
    if !tree.is_object() {
        *tree = Value::Object(Map::new());
    }
    if let Value::Object(map) = tree {
        let child = map.entry(first.clone()).or_insert(Value::Null);
        insert_path(child, rest, leaf);
    }
}

/// Cut the tree at `depth`; subtrees below it become null
fn truncate(node: &Value, depth: u64) -> Value {
    match node {
        Value::Object(_) if depth == 0 => Value::Null,
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), truncate(v, depth - 1)))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(command: &str) -> Vec<String> {
        command.split_whitespace().map(str::to_string).collect()
    }

    fn fixture(path: &str) -> String {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(path)
            .display()
            .to_string()
    }

    fn run(ledger: &mut Ledger, command: &str) -> Reply {
        ledger.handle(&words(command))
    }

    #[test]
    fn test_activation_is_applied_by_next_block() {
        let mut ledger = Ledger::genesis();
        let commitment = fixture("accounts/king_commitment.json");

        let reply = run(&mut ledger, &format!("activate account king with {}", commitment));
        assert_eq!(reply.code, 0, "{}", reply.stderr);
        assert_eq!(run(&mut ledger, "get balance for king").stdout, "0 ꜩ\n");

        let reply = run(&mut ledger, "bake for bootstrap1");
        assert_eq!(reply.code, 0, "{}", reply.stderr);
        assert!(ledger.pending.is_empty());
        assert_eq!(
            run(&mut ledger, "get balance for king").stdout,
            "23932454.669343 ꜩ\n"
        );

        let reply = run(&mut ledger, &format!("activate account king2 with {}", commitment));
        assert_eq!(reply.code, 1);
        assert!(reply.stderr.contains("Invalid activation"));
    }

    #[test]
    fn test_low_fee_transfer_waits_for_zero_fee_block() {
        let mut ledger = Ledger::genesis();

        let reply = run(
            &mut ledger,
            "transfer 10 from bootstrap1 to bootstrap2 --fee 0 --force-low-fee",
        );
        assert_eq!(reply.code, 0, "{}", reply.stderr);

        run(&mut ledger, "bake for bootstrap1");
        assert_eq!(ledger.pending.len(), 1);

        run(&mut ledger, "bake for bootstrap1 --minimal-fees 0");
        assert!(ledger.pending.is_empty());
        assert_eq!(
            run(&mut ledger, "get balance for bootstrap2").stdout,
            "4000010 ꜩ\n"
        );
    }

    #[test]
    fn test_unfunded_transfer_is_rejected() {
        let mut ledger = Ledger::genesis();
        run(&mut ledger, "gen keys foo");

        let reply = run(&mut ledger, "transfer 1 from foo to bootstrap1");
        assert_eq!(reply.code, 1);
        assert!(reply.stderr.contains("too low (0) to spend 1"));
    }
}
