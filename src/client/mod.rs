//! Command client for the node under test
//!
//! Turns high-level intents (bake, transfer, originate, ...) into client
//! invocations and turns what the client prints into typed payloads or
//! classified [`CommandFailure`]s. The client never retries and never hides
//! a failure from its caller.

pub mod backend;
pub mod failure;
pub mod options;
pub mod output;
pub mod transcript;

use std::path::Path;

use crate::common::{Error, Result};

pub use backend::{Backend, Invocation, ProcessBackend, RawOutput};
pub use failure::{CommandFailure, FailureCategory, OperationKind};
pub use options::{
    BakeOptions, KeyOptions, OriginateOptions, QueryOptions, SignatureScheme, TransferOptions,
};
pub use output::{
    ActivationReceipt, Amount, BakeReceipt, OriginationReceipt, TransferReceipt,
};
pub use transcript::TranscriptBackend;

/// Outcome of one client call
///
/// A node rejection surfaces as [`Error::Command`]; other variants mean the
/// harness itself could not talk to the client.
pub type CommandResult<T> = Result<T>;

/// Client for issuing operations against the node
pub struct CommandClient {
    backend: Box<dyn Backend>,
}

impl CommandClient {
    pub fn new(backend: Box<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Run an invocation and return stdout, or the classified diagnostic
    async fn invoke(&self, kind: OperationKind, args: Vec<String>) -> CommandResult<String> {
        let invocation = Invocation { args };
        tracing::debug!(op = kind.as_str(), "invoking client: {}", invocation);

        let output = self.backend.execute(&invocation).await?;

        if output.success() {
            Ok(output.stdout)
        } else {
            let failure = CommandFailure::classify(kind, output.diagnostic());
            tracing::debug!(op = kind.as_str(), category = %failure.category, "client rejected");
            Err(Error::Command(failure))
        }
    }

    /// Run an invocation whose stdout must match a pattern
    async fn invoke_parsed<T>(
        &self,
        kind: OperationKind,
        args: Vec<String>,
        parse: impl FnOnce(&str) -> Option<T>,
    ) -> CommandResult<T> {
        let stdout = self.invoke(kind, args).await?;
        parse(&stdout).ok_or_else(|| Error::Command(CommandFailure::classify(kind, stdout)))
    }

    /// Read a node state path, optionally bounded in depth
    pub async fn query(&self, path: &str, options: &QueryOptions) -> CommandResult<serde_json::Value> {
        let args = vec!["rpc".to_string(), "get".to_string(), options.apply(path)];
        self.invoke_parsed(OperationKind::Query, args, output::extract_rpc_answer)
            .await
    }

    /// Produce one block credited to `delegate`
    pub async fn bake(&self, delegate: &str, options: &BakeOptions) -> CommandResult<BakeReceipt> {
        let mut args = vec!["bake".to_string(), "for".to_string(), delegate.to_string()];
        args.extend(options.to_args());
        self.invoke_parsed(OperationKind::Bake, args, BakeReceipt::parse)
            .await
    }

    /// Move `amount` from `source` to `destination`
    pub async fn transfer(
        &self,
        amount: Amount,
        source: &str,
        destination: &str,
        options: &TransferOptions,
    ) -> CommandResult<TransferReceipt> {
        let mut args = vec![
            "transfer".to_string(),
            amount.to_string(),
            "from".to_string(),
            source.to_string(),
            "to".to_string(),
            destination.to_string(),
        ];
        args.extend(options.to_args());
        self.invoke_parsed(OperationKind::Transfer, args, TransferReceipt::parse)
            .await
    }

    /// Generate a new key under `alias`
    pub async fn generate_key(&self, alias: &str, options: &KeyOptions) -> CommandResult<()> {
        let mut args = vec!["gen".to_string(), "keys".to_string(), alias.to_string()];
        args.extend(options.to_args());
        self.invoke(OperationKind::GenerateKey, args).await?;
        Ok(())
    }

    /// Deploy a contract and remember it under `alias`
    ///
    /// Callers are expected to [`typecheck`](Self::typecheck) the contract
    /// first; this is not enforced here.
    pub async fn originate(
        &self,
        alias: &str,
        amount: Amount,
        source: &str,
        contract: &Path,
        options: &OriginateOptions,
    ) -> CommandResult<OriginationReceipt> {
        let mut args = vec![
            "originate".to_string(),
            "contract".to_string(),
            alias.to_string(),
            "transferring".to_string(),
            amount.to_string(),
            "from".to_string(),
            source.to_string(),
            "running".to_string(),
            contract.display().to_string(),
        ];
        args.extend(options.to_args());
        self.invoke_parsed(OperationKind::Originate, args, OriginationReceipt::parse)
            .await
    }

    /// Register a contract script under a local alias without deploying it
    pub async fn remember(&self, alias: &str, contract: &Path) -> CommandResult<()> {
        let args = vec![
            "remember".to_string(),
            "script".to_string(),
            alias.to_string(),
            format!("file:{}", contract.display()),
        ];
        self.invoke(OperationKind::Remember, args).await?;
        Ok(())
    }

    /// Validate a contract against the node's type system
    pub async fn typecheck(&self, contract: &Path) -> CommandResult<()> {
        let args = vec![
            "typecheck".to_string(),
            "script".to_string(),
            contract.display().to_string(),
        ];
        self.invoke(OperationKind::Typecheck, args).await?;
        Ok(())
    }

    /// Activate a pre-committed balance under `alias`
    pub async fn activate_account(
        &self,
        alias: &str,
        commitment: &Path,
    ) -> CommandResult<ActivationReceipt> {
        let args = vec![
            "activate".to_string(),
            "account".to_string(),
            alias.to_string(),
            "with".to_string(),
            commitment.display().to_string(),
        ];
        self.invoke_parsed(OperationKind::ActivateAccount, args, ActivationReceipt::parse)
            .await
    }

    /// Current balance of an identity or alias
    pub async fn get_balance(&self, account: &str) -> CommandResult<Amount> {
        let args = vec![
            "get".to_string(),
            "balance".to_string(),
            "for".to_string(),
            account.to_string(),
        ];
        self.invoke_parsed(OperationKind::GetBalance, args, output::extract_balance)
            .await
    }

    /// Run arbitrary client arguments and return stdout
    pub async fn run(&self, args: Vec<String>) -> CommandResult<String> {
        self.invoke(OperationKind::Raw, args).await
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedBackend;
    use super::*;

    fn client(backend: &ScriptedBackend) -> CommandClient {
        CommandClient::new(Box::new(backend.clone()))
    }

    fn failure(err: Error) -> CommandFailure {
        match err {
            Error::Command(f) => f,
            other => panic!("expected command failure, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_query_decodes_json() {
        let backend = ScriptedBackend::new();
        backend.reply(RawOutput::ok(r#"{ "ed25519": { "02": { "29": null } } }"#));
        let res = client(&backend)
            .query("/chains/main/blocks/head/context/raw/bytes/delegates/", &QueryOptions::depth(3))
            .await
            .unwrap();
        assert_eq!(res, serde_json::json!({ "ed25519": { "02": { "29": null } } }));
        assert_eq!(
            backend.calls()[0].args,
            vec![
                "rpc",
                "get",
                "/chains/main/blocks/head/context/raw/bytes/delegates/?depth=3"
            ]
        );
    }

    #[tokio::test]
    async fn test_query_no_service_on_stdout() {
        let backend = ScriptedBackend::new();
        backend.reply(RawOutput::ok("No service found at this URL\n\n"));
        let err = client(&backend)
            .query("/chains/main/blocks/head/context/raw/bytes/non-existent", &QueryOptions::depth(0))
            .await
            .unwrap_err();
        let f = failure(err);
        assert_eq!(f.category, FailureCategory::NoServiceFound);
        assert_eq!(f.raw_output, "No service found at this URL\n\n");
    }

    #[tokio::test]
    async fn test_query_negative_depth_keeps_exact_text() {
        let backend = ScriptedBackend::new();
        backend.reply(RawOutput::failed(
            "Command failed : Extraction depth -1 is invalid\n\n",
        ));
        let err = client(&backend)
            .query("/chains/main/blocks/head/context/raw/bytes/non-existent", &QueryOptions::depth(-1))
            .await
            .unwrap_err();
        let f = failure(err);
        assert_eq!(f.category, FailureCategory::InvalidArgument);
        assert_eq!(f.raw_output, "Command failed : Extraction depth -1 is invalid\n\n");
    }

    #[tokio::test]
    async fn test_transfer_renders_arguments() {
        let backend = ScriptedBackend::new();
        backend.reply(RawOutput::ok(
            "Operation hash is 'ooAbc'\nUse command\n  wait for ooAbc --branch BLxyz\n",
        ));
        let receipt = client(&backend)
            .transfer(
                Amount::from_tez(1000),
                "bar",
                "foo",
                &TransferOptions {
                    fee: Some(Amount::ZERO),
                    force_low_fee: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(receipt.operation_hash, "ooAbc");
        assert_eq!(receipt.branch, "BLxyz");
        assert_eq!(
            backend.calls()[0].args,
            vec!["transfer", "1000", "from", "bar", "to", "foo", "--fee", "0", "--force-low-fee"]
        );
    }

    #[tokio::test]
    async fn test_transfer_rejection_is_operation_rejected() {
        let backend = ScriptedBackend::new();
        backend.reply(RawOutput::failed(
            "Error:\n  Balance of contract foo too low (999.95) to spend 999.95\n",
        ));
        let err = client(&backend)
            .transfer("999.95".parse().unwrap(), "foo", "bar", &TransferOptions::default())
            .await
            .unwrap_err();
        assert_eq!(failure(err).category, FailureCategory::OperationRejected);
    }

    #[tokio::test]
    async fn test_balance_parse_failure_is_unclassified() {
        let backend = ScriptedBackend::new();
        backend.reply(RawOutput::ok("999.95 ꜩ\n"));
        backend.reply(RawOutput::ok("garbage\n"));
        let c = client(&backend);
        assert_eq!(c.get_balance("foo").await.unwrap(), "999.95".parse().unwrap());
        let f = failure(c.get_balance("foo").await.unwrap_err());
        assert_eq!(f.category, FailureCategory::Unclassified);
        assert_eq!(f.raw_output, "garbage\n");
    }

    #[tokio::test]
    async fn test_typecheck_failure_category() {
        let backend = ScriptedBackend::new();
        backend.reply(RawOutput::failed("Ill typed contract:\n  01: parameter unit\n"));
        let err = client(&backend)
            .typecheck(Path::new("contracts/broken.tz"))
            .await
            .unwrap_err();
        let f = failure(err);
        assert_eq!(f.category, FailureCategory::TypecheckFailed);
        assert_eq!(f.raw_output, "Ill typed contract:\n  01: parameter unit\n");
    }

    #[tokio::test]
    async fn test_gen_key_and_remember_arguments() {
        let backend = ScriptedBackend::new();
        backend.reply(RawOutput::ok(""));
        backend.reply(RawOutput::ok(""));
        let c = client(&backend);
        c.generate_key("bar", &KeyOptions::with_scheme(SignatureScheme::Secp256k1))
            .await
            .unwrap();
        c.remember("noop", Path::new("/c/noop.tz")).await.unwrap();
        let calls = backend.calls();
        assert_eq!(calls[0].args, vec!["gen", "keys", "bar", "--sig", "secp256k1"]);
        assert_eq!(calls[1].args, vec!["remember", "script", "noop", "file:/c/noop.tz"]);
    }
}
