//! Configuration paths
//!
//! Locations come from the directories crate:
//! - Linux: `~/.config/chain-harness/`
//! - macOS: `~/Library/Application Support/chain-harness/`
//! - Windows: `%APPDATA%\chain-harness\`

use std::path::{Path, PathBuf};

/// Directory name under the platform config root
const APP_NAME: &str = "chain-harness";

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Resolve `path` against `base` unless it is already absolute
pub fn resolve_relative(base: &Path, path: &Path) -> PathBuf {
    if path.is_relative() {
        base.join(path)
    } else {
        path.to_path_buf()
    }
}

/// Whether a client setting names a file rather than something to look up on PATH
pub fn looks_like_path(program: &str) -> bool {
    program.contains(std::path::MAIN_SEPARATOR) || program.contains('/')
}
