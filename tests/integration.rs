//! End-to-end integration tests for the harness CLI
//!
//! These tests run the `chain-harness` binary against the `mock-node`
//! client binary:
//! 1. Each test gets a fresh client base directory (fresh ledger)
//! 2. Scenario fixtures are run through `chain-harness run`
//! 3. Exit codes, progress output and transcripts are checked

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Test context with paths and cleanup
struct TestContext {
    /// Temporary directory for this test, removed on drop
    temp_dir: tempfile::TempDir,
    /// Path to the harness binary
    harness_bin: PathBuf,
    /// Path to the mock node client binary
    mock_bin: PathBuf,
    /// Path to fixtures directory
    fixtures_dir: PathBuf,
}

impl TestContext {
    fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let manifest_dir = env!("CARGO_MANIFEST_DIR");

        Self {
            temp_dir,
            harness_bin: PathBuf::from(env!("CARGO_BIN_EXE_chain-harness")),
            mock_bin: PathBuf::from(env!("CARGO_BIN_EXE_mock-node")),
            fixtures_dir: PathBuf::from(manifest_dir).join("tests").join("fixtures"),
        }
    }

    fn base_dir(&self) -> PathBuf {
        self.temp_dir.path().join("client")
    }

    fn config_home(&self) -> PathBuf {
        self.temp_dir.path().join("config")
    }

    fn scenario(&self, name: &str) -> PathBuf {
        self.fixtures_dir.join("scenarios").join(format!("{}.yaml", name))
    }

    fn harness(&self) -> Command {
        let mut cmd = Command::new(&self.harness_bin);
        cmd.env("XDG_CONFIG_HOME", self.config_home())
            .env("NO_COLOR", "1")
            .env("RUST_LOG", "off");
        cmd
    }

    /// Run a harness command
    fn run_harness(&self, args: &[&str]) -> HarnessOutput {
        let output = self
            .harness()
            .args(args)
            .output()
            .expect("Failed to run chain-harness");
        HarnessOutput::from(output)
    }

    /// Run `chain-harness run` with the mock node as its client
    fn run_scenarios(&self, args: &[&str]) -> HarnessOutput {
        let output = self
            .harness()
            .arg("run")
            .args(args)
            .arg("--client")
            .arg(&self.mock_bin)
            .arg("--base-dir")
            .arg(self.base_dir())
            .output()
            .expect("Failed to run chain-harness");
        HarnessOutput::from(output)
    }

    /// Run the mock node directly
    fn run_mock(&self, args: &[&str]) -> HarnessOutput {
        let output = Command::new(&self.mock_bin)
            .arg("--base-dir")
            .arg(self.base_dir())
            .args(args)
            .output()
            .expect("Failed to run mock-node");
        HarnessOutput::from(output)
    }
}

/// Output from a harness or mock node run
#[derive(Debug)]
struct HarnessOutput {
    stdout: String,
    stderr: String,
    code: Option<i32>,
}

impl From<Output> for HarnessOutput {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            code: output.status.code(),
        }
    }
}

fn path_arg(path: &Path) -> &str {
    path.to_str().expect("non UTF-8 fixture path")
}

#[test]
fn test_raw_context_scenario_passes() {
    let ctx = TestContext::new();
    let scenario = ctx.scenario("raw_context");

    let out = ctx.run_scenarios(&[path_arg(&scenario)]);

    assert_eq!(out.code, Some(0), "harness failed:\n{}\n{}", out.stdout, out.stderr);
    assert!(out.stdout.contains("Running Scenario: raw_context"));
    assert!(out.stdout.contains("✓ test_delegates"));
    assert!(out.stdout.contains("✓ test_transfer_king_queen"));
    assert!(out.stdout.contains("19 passed, 0 failed, 0 blocked (19 total)"));
    assert!(ctx.base_dir().join("mock-node.json").exists());
}

#[test]
fn test_failure_blocks_rest_of_group_only() {
    let ctx = TestContext::new();
    let scenario = ctx.scenario("broken_chain");

    let out = ctx.run_scenarios(&[path_arg(&scenario)]);

    assert_eq!(out.code, Some(1), "unexpected exit:\n{}\n{}", out.stdout, out.stderr);
    assert!(out.stdout.contains("✓ test_gen_keys"));
    assert!(out.stdout.contains("✗ test_spend_unfunded"));
    assert!(out.stdout.contains("operation_rejected"));
    assert!(out.stdout.contains("test_never_runs (blocked)"));
    assert!(out.stdout.contains("test_also_never_runs (blocked)"));
    assert!(out.stdout.contains("✓ test_typecheck_ill_typed"));
    assert!(out.stdout.contains("✓ test_independent_balance"));
    assert!(out.stdout.contains("3 passed, 1 failed, 2 blocked (6 total)"));
}

#[test]
fn test_logs_go_to_stderr() {
    let ctx = TestContext::new();
    let scenario = ctx.scenario("broken_chain");

    let output = ctx
        .harness()
        .env("RUST_LOG", "chain_harness=info")
        .arg("run")
        .arg(&scenario)
        .arg("--client")
        .arg(&ctx.mock_bin)
        .arg("--base-dir")
        .arg(ctx.base_dir())
        .output()
        .expect("Failed to run chain-harness");
    let out = HarnessOutput::from(output);

    assert_eq!(out.code, Some(1));
    assert!(out.stderr.contains("using node client"), "{}", out.stderr);
    assert!(out.stderr.contains("blocked by earlier failure"));
    assert!(!out.stdout.contains("using node client"));
    assert!(!out.stdout.contains("blocked by earlier failure"));
    assert!(out.stdout.contains("3 passed, 1 failed, 2 blocked (6 total)"));
}

#[test]
fn test_list_shows_groups() {
    let ctx = TestContext::new();
    let scenario = ctx.scenario("broken_chain");

    let out = ctx.run_harness(&["list", path_arg(&scenario)]);

    assert_eq!(out.code, Some(0), "{}", out.stderr);
    assert!(out.stdout.contains("group broken_chain/overdraft"));
    assert!(out.stdout.contains("    test_spend_unfunded"));
    assert!(out.stdout.contains("  test_independent_balance"));
    // Listing never talks to the node
    assert!(!ctx.base_dir().join("mock-node.json").exists());
}

#[test]
fn test_transcript_is_scrubbed() {
    let ctx = TestContext::new();
    let scenario = ctx.scenario("raw_context");
    let transcript = ctx.temp_dir.path().join("regression.out");

    let out = ctx.run_scenarios(&[path_arg(&scenario), "--transcript", path_arg(&transcript)]);
    assert_eq!(out.code, Some(0), "{}\n{}", out.stdout, out.stderr);

    let text = fs::read_to_string(&transcript).expect("transcript written");
    assert!(text.contains("# rpc get /chains/main/blocks/head/context/raw/bytes/delegates/?depth=3"));
    assert!(text.contains("No service found at this URL\n\n"));
    assert!(text.contains("Command failed : Extraction depth -1 is invalid\n\n"));
    assert!(text.contains("Injected block [BLOCK_HASH]"));
    assert!(text.contains("--branch [BLOCK_HASH]"));
    assert!(text.contains("New contract [CONTRACT_HASH] originated."));
}

#[test]
fn test_missing_client_is_reported() {
    let ctx = TestContext::new();
    let scenario = ctx.scenario("raw_context");

    let out = ctx.run_harness(&["run", path_arg(&scenario), "--client", "/nonexistent/octez-client"]);

    assert_eq!(out.code, Some(2));
    assert!(out.stderr.contains("Node client '/nonexistent/octez-client' not found"));
}

#[test]
fn test_mock_node_diagnostics() {
    let ctx = TestContext::new();

    let out = ctx.run_mock(&[
        "rpc",
        "get",
        "/chains/main/blocks/head/context/raw/bytes/non-existent?depth=-1",
    ]);
    assert_eq!(out.code, Some(1));
    assert_eq!(out.stderr, "Command failed : Extraction depth -1 is invalid\n\n");

    let out = ctx.run_mock(&["rpc", "get", "/chains/main/blocks/head/context/raw/bytes/non-existent"]);
    assert_eq!(out.code, Some(0));
    assert_eq!(out.stdout, "No service found at this URL\n\n");

    let out = ctx.run_mock(&["get", "balance", "for", "bootstrap3"]);
    assert_eq!(out.stdout, "4000000 ꜩ\n");

    let out = ctx.run_mock(&["frobnicate"]);
    assert_eq!(out.code, Some(1));
    assert!(out.stderr.starts_with("Unrecognized command."));
}
