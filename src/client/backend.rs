//! Execution backends for client invocations
//!
//! A backend runs one client invocation and reports what the process
//! printed. The real backend spawns the node client executable; tests plug
//! in scripted doubles behind the same trait.

use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command as TokioCommand;

use crate::common::{Error, Result};

/// Arguments of one client invocation, without the executable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Leading words of the command, e.g. `gen keys`
    pub fn starts_with(&self, words: &[&str]) -> bool {
        self.args.len() >= words.len() && self.args.iter().zip(words).all(|(a, w)| a == w)
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.args.join(" "))
    }
}

/// What a client process printed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was killed by a signal
    pub exit_code: Option<i32>,
}

impl RawOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: Some(0),
        }
    }

    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code: Some(1),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Diagnostic text of a failed invocation
    ///
    /// stderr when the client wrote anything there, stdout otherwise.
    pub fn diagnostic(&self) -> &str {
        if self.stderr.is_empty() {
            &self.stdout
        } else {
            &self.stderr
        }
    }
}

/// Executes client invocations
#[async_trait]
pub trait Backend: Send + Sync {
    async fn execute(&self, invocation: &Invocation) -> Result<RawOutput>;
}

/// Backend spawning the node client executable
#[derive(Debug, Clone)]
pub struct ProcessBackend {
    program: PathBuf,
    base_dir: Option<PathBuf>,
    endpoint: Option<String>,
    extra_args: Vec<String>,
}

impl ProcessBackend {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            base_dir: None,
            endpoint: None,
            extra_args: Vec::new(),
        }
    }

    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    pub fn program(&self) -> &PathBuf {
        &self.program
    }

    /// Full argument vector passed to the executable
    fn command_line(&self, invocation: &Invocation) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(dir) = &self.base_dir {
            args.push("--base-dir".to_string());
            args.push(dir.display().to_string());
        }
        if let Some(endpoint) = &self.endpoint {
            args.push("--endpoint".to_string());
            args.push(endpoint.clone());
        }
        args.extend(self.extra_args.iter().cloned());
        args.extend(invocation.args.iter().cloned());
        args
    }
}

#[async_trait]
impl Backend for ProcessBackend {
    async fn execute(&self, invocation: &Invocation) -> Result<RawOutput> {
        let args = self.command_line(invocation);
        tracing::debug!(program = %self.program.display(), "$ {}", args.join(" "));

        let output = TokioCommand::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| Error::ClientSpawn {
                program: self.program.display().to_string(),
                error: e.to_string(),
            })?;

        let raw = RawOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
        };
        tracing::trace!(exit_code = ?raw.exit_code, stdout = %raw.stdout, stderr = %raw.stderr, "client output");

        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_prefixes() {
        let backend = ProcessBackend::new("octez-client")
            .base_dir("/tmp/client")
            .endpoint("http://127.0.0.1:18731")
            .extra_args(vec!["--wait".to_string(), "none".to_string()]);
        let args = backend.command_line(&Invocation::new(["get", "balance", "for", "foo"]));
        assert_eq!(
            args,
            vec![
                "--base-dir",
                "/tmp/client",
                "--endpoint",
                "http://127.0.0.1:18731",
                "--wait",
                "none",
                "get",
                "balance",
                "for",
                "foo"
            ]
        );
    }

    #[test]
    fn test_diagnostic_prefers_stderr() {
        let out = RawOutput {
            stdout: "partial\n".to_string(),
            stderr: "Error:\n  boom\n".to_string(),
            exit_code: Some(1),
        };
        assert_eq!(out.diagnostic(), "Error:\n  boom\n");
        assert_eq!(RawOutput::failed("").diagnostic(), "");
        assert!(!out.success());
        assert!(RawOutput::ok("x").success());
    }

    #[tokio::test]
    async fn test_missing_executable_is_spawn_error() {
        let backend = ProcessBackend::new("/nonexistent/chain-harness-client");
        let err = backend
            .execute(&Invocation::new(["rpc", "get", "/"]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ClientSpawn { .. }));
    }
}
