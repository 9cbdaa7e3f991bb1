//! Regression transcripts
//!
//! Wraps a backend and appends everything the client prints to a transcript
//! file, so that two runs can be diffed. Substrings that change from run to
//! run (hashes, counters, timestamps) are replaced with fixed tokens first.

use std::fs::OpenOptions;
use std::path::Path;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::backend::{Backend, Invocation, RawOutput};
use crate::common::{Error, Result};

/// Ordered scrub rules, applied top to bottom
static SCRUB_RULES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        // hashes
        (r"sig\w{93}", "[SIGNATURE]"),
        (r"\w{53}", "[OPERATION_HASH]"),
        (r"\w{51}", "[BLOCK_HASH]"),
        (r"tz\w{34}", "[CONTRACT_HASH]"),
        (r"fees\(\[CONTRACT_HASH\],\d+\)", "fees([CONTRACT_HASH],[CTR])"),
        // receipts
        (r"Operation hash is '\w+'", "Operation hash is '[OPERATION_HASH]'"),
        (r"wait for \w+", "wait for [OPERATION_HASH]"),
        (r"--branch \w+", "--branch [BRANCH_HASH]"),
        (r"KT\w{34}", "[CONTRACT_HASH]"),
        (r"Injected block \w{12}", "Injected block [BLOCK_HASH]"),
        (r"Expected counter: \w+", "Expected counter: [EXPECTED_COUNTER]"),
        // constants
        (r#""proof_of_work_nonce": "\w{16}""#, r#""proof_of_work_nonce": "[NONCE]""#),
        (r#""context": "\w{52}""#, r#""context": "[CONTEXT]""#),
        (r#""level": \d+"#, r#""level": [LEVEL]"#),
        (r#""priority": \d+"#, r#""priority": "[PRIORITY]""#),
        (r#""fitness": \[.*\]"#, r#""fitness": "[FITNESS]""#),
        // timestamps
        (r"\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}Z", "[TIMESTAMP]"),
    ]
    .into_iter()
    .map(|(pattern, token)| (Regex::new(pattern).unwrap(), token))
    .collect()
});

static RUNTIME_ERROR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Runtime error in contract \w+:").unwrap());

/// Replace run-variable substrings with stable tokens
pub fn scrub(output: &str) -> String {
    let mut text = scrub_always(output);
    for (re, token) in SCRUB_RULES.iter() {
        text = re.replace_all(&text, *token).into_owned();
    }
    text
}

/// Rewrites applied even when scrubbing is disabled
pub fn scrub_always(output: &str) -> String {
    RUNTIME_ERROR
        .replace_all(output, "Runtime error in contract [CONTRACT_HASH]:")
        .into_owned()
}

/// Backend decorator writing a regression transcript
pub struct TranscriptBackend {
    inner: Box<dyn Backend>,
    file: Mutex<File>,
    scrub: bool,
}

impl TranscriptBackend {
    pub fn create(inner: Box<dyn Backend>, path: &Path, scrub: bool) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| Error::FileRead {
                path: path.display().to_string(),
                error: e.to_string(),
            })?;

        Ok(Self {
            inner,
            file: Mutex::new(File::from_std(file)),
            scrub,
        })
    }

    async fn record(&self, invocation: &Invocation, output: &RawOutput) -> Result<()> {
        let convert = |s: &str| {
            if self.scrub {
                scrub(s)
            } else {
                scrub_always(s)
            }
        };

        let mut entry = format!("# {}\n", convert(&invocation.to_string()));
        entry.push_str(&convert(&output.stdout));
        entry.push_str(&convert(&output.stderr));

        let mut file = self.file.lock().await;
        file.write_all(entry.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl Backend for TranscriptBackend {
    async fn execute(&self, invocation: &Invocation) -> Result<RawOutput> {
        let output = self.inner.execute(invocation).await?;
        // Failed invocations are recorded too; the caller still sees the failure
        self.record(invocation, &output).await?;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl Backend for Echo {
        async fn execute(&self, invocation: &Invocation) -> Result<RawOutput> {
            if invocation.starts_with(&["fail"]) {
                Ok(RawOutput::failed("Error at 2019-09-23T10:59:00Z\n"))
            } else {
                Ok(RawOutput::ok("Injected block BLx8tKjDRfGv\n"))
            }
        }
    }

    #[test]
    fn test_scrub_hashes_and_timestamps() {
        let text = "Operation hash is 'ooVk3bGDaXGu'\n\
                    Injected block BLx8tKjDRfGv at 2019-09-23T10:59:00Z\n\
                    \"level\": 12, \"priority\": 0\n";
        let scrubbed = scrub(text);
        assert_eq!(
            scrubbed,
            "Operation hash is '[OPERATION_HASH]'\n\
             Injected block [BLOCK_HASH] at [TIMESTAMP]\n\
             \"level\": [LEVEL], \"priority\": \"[PRIORITY]\"\n"
        );
    }

    #[test]
    fn test_scrub_contract_addresses() {
        let kt = format!("KT1{}", "a".repeat(33));
        let tz = format!("tz1{}", "b".repeat(33));
        let scrubbed = scrub(&format!("{} -> {}\n", tz, kt));
        assert_eq!(scrubbed, "[CONTRACT_HASH] -> [CONTRACT_HASH]\n");
    }

    #[test]
    fn test_runtime_error_is_always_scrubbed() {
        assert_eq!(
            scrub_always("Runtime error in contract KT1abc:\n"),
            "Runtime error in contract [CONTRACT_HASH]:\n"
        );
    }

    #[tokio::test]
    async fn test_transcript_records_success_and_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("regress").join("basic.out");
        let backend = TranscriptBackend::create(Box::new(Echo), &path, true).unwrap();

        let ok = backend.execute(&Invocation::new(["bake", "for", "bootstrap1"])).await.unwrap();
        assert!(ok.success());
        let failed = backend.execute(&Invocation::new(["fail"])).await.unwrap();
        assert!(!failed.success());

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "# bake for bootstrap1\nInjected block [BLOCK_HASH]\n# fail\nError at [TIMESTAMP]\n"
        );
    }

    #[tokio::test]
    async fn test_concurrent_entries_stay_whole() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("concurrent.out");
        let backend = TranscriptBackend::create(Box::new(Echo), &path, false).unwrap();

        let bake = Invocation::new(["bake", "for", "bootstrap1"]);
        let fail = Invocation::new(["fail"]);
        let (a, b) = tokio::join!(backend.execute(&bake), backend.execute(&fail));
        assert!(a.is_ok() && b.is_ok());

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("# bake for bootstrap1\nInjected block BLx8tKjDRfGv\n"));
        assert!(content.contains("# fail\nError at 2019-09-23T10:59:00Z\n"));
    }
}
