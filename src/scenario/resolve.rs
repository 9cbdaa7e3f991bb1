//! Session references in scenario arguments
//!
//! `$keys` stands for the value stored under `keys`; `$keys[3]` for the
//! fourth item of that list. Any other string is taken literally.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::common::{Error, Result};
use crate::harness::SessionStore;

static REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\$([A-Za-z_][A-Za-z0-9_]*)(?:\[(\d+)\])?$").unwrap());

/// A parsed `$key` / `$key[i]` reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference<'a> {
    pub key: &'a str,
    pub index: Option<usize>,
}

impl<'a> Reference<'a> {
    pub fn parse(text: &'a str) -> Option<Self> {
        let caps = REFERENCE.captures(text)?;
        let key = caps.get(1)?.as_str();
        let index = match caps.get(2) {
            Some(m) => Some(m.as_str().parse().ok()?),
            None => None,
        };
        Some(Self { key, index })
    }
}

/// Resolve a possibly-referencing string to a JSON value
pub fn resolve_value(session: &SessionStore, text: &str) -> Result<Value> {
    let Some(reference) = Reference::parse(text) else {
        return Ok(Value::String(text.to_string()));
    };

    match reference.index {
        None => Ok(session.get(reference.key)?.clone()),
        Some(i) => {
            let items = session.get_list(reference.key)?;
            items.get(i).cloned().ok_or_else(|| {
                Error::Scenario(format!(
                    "'{}' has {} items, no index {}",
                    reference.key,
                    items.len(),
                    i
                ))
            })
        }
    }
}

/// Resolve a possibly-referencing string to a client argument
pub fn resolve_str(session: &SessionStore, text: &str) -> Result<String> {
    match resolve_value(session, text)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(Error::Scenario(format!(
            "'{}' resolves to {}, which is not a scalar",
            text, other
        ))),
    }
}

/// Resolve every string inside `value`, recursing into lists and maps
pub fn resolve_tree(session: &SessionStore, value: &Value) -> Result<Value> {
    Ok(match value {
        Value::String(s) => resolve_value(session, s)?,
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|v| resolve_tree(session, v))
                .collect::<Result<_>>()?,
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| Ok((k.clone(), resolve_tree(session, v)?)))
                .collect::<Result<_>>()?,
        ),
        other => other.clone(),
    })
}
