//! Configuration file handling

use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::paths::{config_path, looks_like_path};
use super::{Error, Result};
use crate::client::{Amount, BakeOptions};

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Node client settings
    #[serde(default)]
    pub node: NodeConfig,

    /// Default operation settings
    #[serde(default)]
    pub defaults: Defaults,

    /// Regression transcript settings
    #[serde(default)]
    pub transcript: TranscriptConfig,
}

/// How to reach the node under test
#[derive(Debug, Deserialize, Clone)]
pub struct NodeConfig {
    /// Client executable name or path
    #[serde(default = "default_client")]
    pub client: String,

    /// Client base directory (`--base-dir`)
    pub base_dir: Option<PathBuf>,

    /// Node RPC endpoint (`--endpoint`)
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Arguments prepended to every invocation
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            client: default_client(),
            base_dir: None,
            endpoint: default_endpoint(),
            extra_args: Vec::new(),
        }
    }
}

fn default_client() -> String {
    "octez-client".to_string()
}

fn default_endpoint() -> String {
    "http://127.0.0.1:8732".to_string()
}

/// Default settings applied to scenario steps
#[derive(Debug, Deserialize, Clone)]
pub struct Defaults {
    /// `--max-priority` for every bake
    #[serde(default = "default_bake_max_priority")]
    pub bake_max_priority: u32,

    /// `--minimal-timestamp` for every bake
    #[serde(default = "default_true")]
    pub bake_minimal_timestamp: bool,

    /// Burn cap for transfers and originations that don't set one
    pub burn_cap: Option<Amount>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            bake_max_priority: default_bake_max_priority(),
            bake_minimal_timestamp: default_true(),
            burn_cap: None,
        }
    }
}

impl Defaults {
    /// Baking options every bake starts from
    pub fn bake_options(&self) -> BakeOptions {
        BakeOptions {
            max_priority: Some(self.bake_max_priority),
            minimal_timestamp: self.bake_minimal_timestamp,
            ..Default::default()
        }
    }
}

fn default_bake_max_priority() -> u32 {
    512
}

fn default_true() -> bool {
    true
}

/// Regression transcript settings
#[derive(Debug, Deserialize, Clone)]
pub struct TranscriptConfig {
    /// File the transcript is written to; no transcript when unset
    pub path: Option<PathBuf>,

    /// Replace run-variable substrings before writing
    #[serde(default = "default_true")]
    pub scrub: bool,
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            path: None,
            scrub: default_true(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from the default config file
    ///
    /// Returns default configuration if the default file doesn't exist. An
    /// explicit path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => match config_path() {
                Some(path) if path.exists() => Self::load_from(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| Error::ConfigParse(e.to_string()))
    }

    /// Locate the client executable
    ///
    /// A value containing a path separator is used as is; anything else is
    /// searched on PATH.
    pub fn resolve_client(&self) -> Result<PathBuf> {
        let client = &self.node.client;
        if looks_like_path(client) {
            let path = PathBuf::from(client);
            if path.exists() {
                return Ok(path);
            }
            return Err(Error::client_not_found(client, &[path.display().to_string()]));
        }

        which::which(client).map_err(|_| {
            let searched: Vec<String> = std::env::var_os("PATH")
                .map(|p| {
                    std::env::split_paths(&p)
                        .map(|d| d.display().to_string())
                        .collect()
                })
                .unwrap_or_default();
            Error::client_not_found(client, &searched)
        })
    }
}
