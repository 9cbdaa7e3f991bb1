//! Group-scoped session state
//!
//! Test cases of one incremental group share a [`SessionStore`]. The
//! controller creates it when the group starts and tears it down when the
//! group ends; cases only ever borrow it while they run.

use serde_json::Value;
use thiserror::Error;

/// Errors raised by the session store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("session key '{0}' not found")]
    KeyNotFound(String),

    #[error("session key '{key}' holds {found}, expected a list")]
    TypeMismatch { key: String, found: &'static str },

    #[error("session store used after teardown ({operation} '{key}')")]
    LifecycleViolation { operation: &'static str, key: String },
}

fn kind_of(value: Option<&Value>) -> &'static str {
    match value {
        None => "nothing",
        Some(Value::Null) => "null",
        Some(Value::Bool(_)) => "a boolean",
        Some(Value::Number(_)) => "a number",
        Some(Value::String(_)) => "a string",
        Some(Value::Array(_)) => "a list",
        Some(Value::Object(_)) => "a map",
    }
}

/// Ordered, mutable key/value namespace for one group run
#[derive(Debug, Default)]
pub struct SessionStore {
    // insertion order is kept so reports list keys the way cases wrote them
    entries: Vec<(String, Value)>,
    closed: bool,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_open(&self, operation: &'static str, key: &str) -> Result<(), SessionError> {
        if self.closed {
            return Err(SessionError::LifecycleViolation {
                operation,
                key: key.to_string(),
            });
        }
        Ok(())
    }

    fn slot(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    fn slot_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Value stored under `key`
    pub fn get(&self, key: &str) -> Result<&Value, SessionError> {
        self.ensure_open("get", key)?;
        self.slot(key)
            .ok_or_else(|| SessionError::KeyNotFound(key.to_string()))
    }

    /// List stored under `key`
    pub fn get_list(&self, key: &str) -> Result<&Vec<Value>, SessionError> {
        match self.get(key)? {
            Value::Array(items) => Ok(items),
            other => Err(SessionError::TypeMismatch {
                key: key.to_string(),
                found: kind_of(Some(other)),
            }),
        }
    }

    /// Store `value` under `key`, replacing any previous value
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<(), SessionError> {
        self.ensure_open("set", key)?;
        let value = value.into();
        match self.slot_mut(key) {
            Some(slot) => *slot = value,
            None => self.entries.push((key.to_string(), value)),
        }
        Ok(())
    }

    /// Push `value` onto the list stored under `key`
    ///
    /// An absent key is a type mismatch: append never creates the list.
    pub fn append(&mut self, key: &str, value: impl Into<Value>) -> Result<(), SessionError> {
        self.ensure_open("append", key)?;
        match self.slot_mut(key) {
            Some(Value::Array(items)) => {
                items.push(value.into());
                Ok(())
            }
            other => Err(SessionError::TypeMismatch {
                key: key.to_string(),
                found: kind_of(other.map(|v| &*v)),
            }),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        !self.closed && self.slot(key).is_some()
    }

    /// Keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Owned copy of every entry, in insertion order
    pub fn snapshot(&self) -> Vec<(String, Value)> {
        self.entries.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Drop all values; any later use is a lifecycle violation
    pub fn teardown(&mut self) {
        self.entries.clear();
        self.closed = true;
    }
}
