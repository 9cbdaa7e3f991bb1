//! Scenario execution
//!
//! Each YAML case becomes a [`TestCase`] whose body runs the case's steps
//! through the command client. Steps stop at the first error, which fails
//! the case and, inside an incremental group, blocks the rest of it.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use colored::Colorize;

use super::config::{Action, FailureExpectation, Scenario, Step};
use super::resolve::{resolve_str, resolve_tree};
use crate::client::{KeyOptions, OriginateOptions, QueryOptions, TransferOptions};
use crate::common::config::Defaults;
use crate::common::paths::resolve_relative;
use crate::common::{expect_failure, Error, Result};
use crate::harness::{CaseContext, CaseMeta, TestCase};

/// Settings shared by every case of a run
#[derive(Debug, Clone, Default)]
pub struct RunSettings {
    pub defaults: Defaults,
    /// Print every step as it completes
    pub verbose: bool,
}

/// A scenario file turned into runnable cases
pub struct LoadedScenario {
    pub name: String,
    pub description: Option<String>,
    pub path: PathBuf,
    pub cases: Vec<Box<dyn TestCase>>,
}

/// A YAML case
pub struct ScenarioCase {
    meta: CaseMeta,
    steps: Vec<Step>,
    /// Directory relative contract and commitment paths resolve against
    base_dir: PathBuf,
    settings: RunSettings,
}

/// Load one scenario; its cases get indices from `first_index` on
pub fn load_scenario(path: &Path, first_index: usize, settings: &RunSettings) -> Result<LoadedScenario> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
        path: path.display().to_string(),
        error: e.to_string(),
    })?;

    let scenario: Scenario = serde_yaml::from_str(&content).map_err(|e| {
        Error::Scenario(format!(
            "Failed to parse scenario '{}': {}",
            path.display(),
            e
        ))
    })?;

    let base_dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
    let cases = scenario
        .cases
        .into_iter()
        .enumerate()
        .map(|(i, spec)| {
            let mut meta = CaseMeta::new(spec.name, first_index + i);
            if let Some(group) = spec.incremental {
                // Group names are scoped to their file
                meta = meta.incremental(format!("{}/{}", scenario.name, group));
            }
            Box::new(ScenarioCase {
                meta,
                steps: spec.steps,
                base_dir: base_dir.clone(),
                settings: settings.clone(),
            }) as Box<dyn TestCase>
        })
        .collect();

    tracing::debug!(path = %path.display(), "loaded scenario '{}'", scenario.name);

    Ok(LoadedScenario {
        name: scenario.name,
        description: scenario.description,
        path: path.to_path_buf(),
        cases,
    })
}

/// Load several scenarios with one running case index
pub fn load_scenarios(paths: &[PathBuf], settings: &RunSettings) -> Result<Vec<LoadedScenario>> {
    let mut next_index = 0;
    let mut scenarios = Vec::with_capacity(paths.len());
    for path in paths {
        let scenario = load_scenario(path, next_index, settings)?;
        next_index += scenario.cases.len();
        scenarios.push(scenario);
    }
    Ok(scenarios)
}

#[async_trait]
impl TestCase for ScenarioCase {
    fn meta(&self) -> &CaseMeta {
        &self.meta
    }

    async fn run(&self, ctx: &mut CaseContext<'_>) -> Result<()> {
        for (i, step) in self.steps.iter().enumerate() {
            let step_num = i + 1;
            let label = step.action.describe();

            let result = self.execute_action(ctx, &step.action).await;
            match &step.expect_failure {
                Some(expectation) => {
                    check_failure(expectation, expect_failure(result)?)?;
                    if self.settings.verbose {
                        println!(
                            "    {} Step {}: {} (expected failure)",
                            "✓".green(),
                            step_num,
                            label.dimmed()
                        );
                    }
                }
                None => {
                    if let Err(e) = result {
                        if self.settings.verbose {
                            println!("    {} Step {}: {}", "✗".red(), step_num, label);
                        }
                        return Err(e);
                    }
                    if self.settings.verbose {
                        println!("    {} Step {}: {}", "✓".green(), step_num, label.dimmed());
                    }
                }
            }
        }
        Ok(())
    }
}

fn check_failure(expected: &FailureExpectation, failure: crate::client::CommandFailure) -> Result<()> {
    if failure.category != expected.category {
        return Err(Error::assertion(
            "failure category",
            expected.category,
            format!("{} ({:?})", failure.category, failure.raw_output),
        ));
    }
    if let Some(output) = &expected.output {
        if failure.raw_output != *output {
            return Err(Error::assertion(
                "failure output",
                format!("{:?}", output),
                format!("{:?}", failure.raw_output),
            ));
        }
    }
    if let Some(pattern) = &expected.pattern {
        if !failure.raw_output.lines().any(|line| pattern.is_match(line)) {
            return Err(Error::assertion(
                "failure output",
                format!("a line matching /{}/", pattern),
                format!("{:?}", failure.raw_output),
            ));
        }
    }
    Ok(())
}

impl ScenarioCase {
    fn path(&self, path: &Path) -> PathBuf {
        resolve_relative(&self.base_dir, path)
    }

    async fn execute_action(&self, ctx: &mut CaseContext<'_>, action: &Action) -> Result<()> {
        let client = ctx.client;
        let defaults = &self.settings.defaults;

        match action {
            Action::Query {
                path,
                depth,
                expect,
            } => {
                let path = resolve_str(ctx.session, path)?;
                let answer = client.query(&path, &QueryOptions { depth: *depth }).await?;
                if let Some(expected) = expect {
                    let expected = resolve_tree(ctx.session, expected)?;
                    if answer != expected {
                        return Err(Error::assertion(&format!("answer of {}", path), expected, answer));
                    }
                }
            }

            Action::Bake {
                delegate,
                max_priority,
                minimal_timestamp,
                zero_fees,
            } => {
                let delegate = resolve_str(ctx.session, delegate)?;
                let mut options = defaults.bake_options();
                if let Some(p) = max_priority {
                    options.max_priority = Some(*p);
                }
                if let Some(t) = minimal_timestamp {
                    options.minimal_timestamp = *t;
                }
                if *zero_fees {
                    options = options.zero_fee_thresholds();
                }
                let receipt = client.bake(&delegate, &options).await?;
                tracing::debug!(block = %receipt.block_hash, "baked");
            }

            Action::Transfer {
                amount,
                from,
                to,
                fee,
                force_low_fee,
                burn_cap,
                arg,
            } => {
                let from = resolve_str(ctx.session, from)?;
                let to = resolve_str(ctx.session, to)?;
                let options = TransferOptions {
                    fee: *fee,
                    force_low_fee: *force_low_fee,
                    burn_cap: burn_cap.or(defaults.burn_cap),
                    arg: arg.clone(),
                };
                let receipt = client.transfer(*amount, &from, &to, &options).await?;
                tracing::debug!(operation = %receipt.operation_hash, "transfer injected");
            }

            Action::GenKey { alias, sig, force } => {
                let alias = resolve_str(ctx.session, alias)?;
                let options = KeyOptions {
                    sig: *sig,
                    force: *force,
                };
                client.generate_key(&alias, &options).await?;
            }

            Action::Originate {
                alias,
                amount,
                from,
                contract,
                init,
                burn_cap,
                fee,
                force,
            } => {
                let alias = resolve_str(ctx.session, alias)?;
                let from = resolve_str(ctx.session, from)?;
                let options = OriginateOptions {
                    init: init.clone(),
                    burn_cap: burn_cap.or(defaults.burn_cap),
                    fee: *fee,
                    force: *force,
                };
                let receipt = client
                    .originate(&alias, *amount, &from, &self.path(contract), &options)
                    .await?;
                tracing::debug!(contract = %receipt.contract, "originated");
            }

            Action::Remember { alias, contract } => {
                let alias = resolve_str(ctx.session, alias)?;
                client.remember(&alias, &self.path(contract)).await?;
            }

            Action::Typecheck { contract } => {
                client.typecheck(&self.path(contract)).await?;
            }

            Action::ActivateAccount { alias, commitment } => {
                let alias = resolve_str(ctx.session, alias)?;
                client
                    .activate_account(&alias, &self.path(commitment))
                    .await?;
            }

            Action::Balance { account, expect } => {
                let account = resolve_str(ctx.session, account)?;
                let balance = client.get_balance(&account).await?;
                if balance != *expect {
                    return Err(Error::assertion(
                        &format!("balance of {}", account),
                        expect,
                        balance,
                    ));
                }
            }

            Action::SessionSet { key, value } => {
                let value = resolve_tree(ctx.session, value)?;
                ctx.session.set(key, value)?;
            }

            Action::SessionAppend { key, value } => {
                let value = resolve_tree(ctx.session, value)?;
                ctx.session.append(key, value)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::ScriptedBackend;
    use crate::client::{CommandClient, RawOutput};
    use crate::harness::{collect_groups, Controller, ExecutionOutcome, FailureReason};
    use serde_json::json;
    use std::io::Write;

    fn write_scenario(dir: &Path, yaml: &str) -> PathBuf {
        let path = dir.join("scenario.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(yaml.as_bytes()).unwrap();
        path
    }

    async fn run(yaml: &str, backend: &ScriptedBackend) -> crate::harness::RunReport {
        let dir = tempfile::tempdir().unwrap();
        let path = write_scenario(dir.path(), yaml);
        let scenario = load_scenario(&path, 0, &RunSettings::default()).unwrap();
        let groups = collect_groups(scenario.cases);
        let controller = Controller::new(CommandClient::new(Box::new(backend.clone())));
        controller.run(&groups).await.unwrap()
    }

    #[tokio::test]
    async fn test_session_references_reach_the_client() {
        let backend = ScriptedBackend::new();
        backend.reply(RawOutput::ok(""));
        backend.reply(RawOutput::ok(""));
        backend.reply(RawOutput::ok("1000 ꜩ\n"));

        let report = run(
            r#"
name: keys
cases:
  - name: gen_keys
    incremental: raw
    steps:
      - action: session_set
        key: keys
        value: [foo, bar]
      - action: gen_key
        alias: $keys[0]
      - action: gen_key
        alias: $keys[1]
        sig: secp256k1
  - name: balances
    incremental: raw
    steps:
      - action: balance
        account: $keys[0]
        expect: 1000
"#,
            &backend,
        )
        .await;

        assert!(report.success(), "{:?}", report);
        let calls: Vec<_> = backend.calls().into_iter().map(|c| c.to_string()).collect();
        assert_eq!(
            calls,
            vec![
                "gen keys foo",
                "gen keys bar --sig secp256k1",
                "get balance for foo"
            ]
        );
        assert_eq!(report.groups[0].id, "keys/raw");
        assert_eq!(report.groups[0].session[0].1, json!(["foo", "bar"]));
    }

    #[tokio::test]
    async fn test_expected_failure_passes_on_exact_text() {
        let backend = ScriptedBackend::new();
        backend.reply(RawOutput::ok("No service found at this URL\n\n"));
        backend.reply(RawOutput::failed(
            "Command failed : Extraction depth -1 is invalid\n\n",
        ));

        let report = run(
            r#"
name: no service
cases:
  - name: missing
    steps:
      - action: query
        path: /chains/main/blocks/head/context/raw/bytes/non-existent
        depth: 0
        expect_failure:
          category: no_service_found
          output: "No service found at this URL\n\n"
  - name: negative_depth
    steps:
      - action: query
        path: /chains/main/blocks/head/context/raw/bytes/non-existent
        depth: -1
        expect_failure:
          category: invalid_argument
          output: "Command failed : Extraction depth -1 is invalid\n\n"
"#,
            &backend,
        )
        .await;

        assert!(report.success(), "{:?}", report);
        assert_eq!(report.groups.len(), 2);
    }

    #[tokio::test]
    async fn test_expected_failure_pattern_searches_lines() {
        let backend = ScriptedBackend::new();
        let rejection = "Error:\n  Balance of contract tz1foo too low (999.95) to spend 999.95\n";
        backend.reply(RawOutput::failed(rejection));
        backend.reply(RawOutput::failed(rejection));

        let report = run(
            r#"
name: overdraft
cases:
  - name: matching
    steps:
      - action: transfer
        amount: 999.95
        from: foo
        to: bar
        expect_failure:
          category: operation_rejected
          pattern: "^  Balance of contract .* too low"
  - name: not_matching
    steps:
      - action: transfer
        amount: 999.95
        from: foo
        to: bar
        expect_failure:
          category: operation_rejected
          pattern: "counter .* already used"
"#,
            &backend,
        )
        .await;

        assert!(report.groups[0].cases[0].outcome.is_passed());
        assert!(matches!(
            report.groups[1].cases[0].outcome,
            ExecutionOutcome::Failed(FailureReason::Assertion(_))
        ));
    }

    #[tokio::test]
    async fn test_unexpected_success_fails_the_case() {
        let backend = ScriptedBackend::new();
        backend.reply(RawOutput::ok("Operation hash is 'ooX'\n--branch BLy\n"));

        let report = run(
            r#"
name: overdraft
cases:
  - name: transfer_failure
    incremental: raw
    steps:
      - action: transfer
        amount: 999.95
        from: foo
        to: bar
        expect_failure:
          category: operation_rejected
  - name: after
    incremental: raw
    steps:
      - action: bake
        delegate: bootstrap1
"#,
            &backend,
        )
        .await;

        let cases = &report.groups[0].cases;
        assert!(matches!(
            cases[0].outcome,
            ExecutionOutcome::Failed(FailureReason::Assertion(_))
        ));
        assert_eq!(cases[1].outcome, ExecutionOutcome::Blocked);
        assert_eq!(backend.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_balance_mismatch_and_relative_paths() {
        let backend = ScriptedBackend::new();
        backend.reply(RawOutput::ok(""));
        backend.reply(RawOutput::ok("999.9 ꜩ\n"));

        let dir = tempfile::tempdir().unwrap();
        let path = write_scenario(
            dir.path(),
            r#"
name: paths
cases:
  - name: check
    incremental: g
    steps:
      - action: typecheck
        contract: contracts/noop.tz
      - action: balance
        account: foo
        expect: 999.95
"#,
        );
        let scenario = load_scenario(&path, 7, &RunSettings::default()).unwrap();
        assert_eq!(scenario.cases[0].meta().index, 7);
        let groups = collect_groups(scenario.cases);
        let controller = Controller::new(CommandClient::new(Box::new(backend.clone())));
        let report = controller.run(&groups).await.unwrap();

        let calls = backend.calls();
        assert_eq!(
            calls[0].args[2],
            dir.path().join("contracts/noop.tz").display().to_string()
        );
        match &report.groups[0].cases[0].outcome {
            ExecutionOutcome::Failed(FailureReason::Assertion(msg)) => {
                assert_eq!(msg, "balance of foo: expected '999.95', got '999.9'");
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.yaml");
        assert!(matches!(
            load_scenario(&missing, 0, &RunSettings::default()),
            Err(Error::FileRead { .. })
        ));

        let bad = write_scenario(dir.path(), "name: x\ncases: 3\n");
        assert!(matches!(
            load_scenario(&bad, 0, &RunSettings::default()),
            Err(Error::Scenario(_))
        ));
    }
}
