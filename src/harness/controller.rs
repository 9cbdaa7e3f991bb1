//! Incremental execution controller
//!
//! Runs the cases of a group one after another against a fresh
//! [`SessionStore`]. The first failing case moves the group into
//! `GroupFailed`; every case after it is recorded `Blocked` and its body
//! never runs, so no client call is issued on its behalf.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use futures_util::FutureExt;
use serde_json::Value;
use tracing::Instrument;

use super::case::{CaseContext, CaseMeta, ExecutionOutcome, FailureReason, TestCase};
use super::group::Group;
use super::report::RunReport;
use super::session::SessionStore;
use crate::client::CommandClient;
use crate::common::{Error, Result};

/// Lifecycle of one group run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupState {
    Pending,
    Running,
    GroupFailed,
    GroupDone,
}

/// Outcome of one case, as reported
#[derive(Debug, Clone)]
pub struct CaseReport {
    pub name: String,
    pub index: usize,
    pub outcome: ExecutionOutcome,
    pub duration: Duration,
}

/// Outcome of one group
#[derive(Debug, Clone)]
pub struct GroupReport {
    pub id: String,
    pub incremental: bool,
    pub cases: Vec<CaseReport>,
    /// Session contents just before teardown, in insertion order
    pub session: Vec<(String, Value)>,
}

impl GroupReport {
    pub fn passed(&self) -> bool {
        self.cases.iter().all(|c| c.outcome.is_passed())
    }

    /// The case that failed the group, if any
    pub fn failure(&self) -> Option<&CaseReport> {
        self.cases.iter().find(|c| c.outcome.is_failed())
    }

    pub fn blocked(&self) -> usize {
        self.cases.iter().filter(|c| c.outcome.is_blocked()).count()
    }
}

/// State machine bookkeeping for one group
struct GroupRun<'g> {
    group: &'g Group,
    state: GroupState,
    cases: Vec<CaseReport>,
}

impl<'g> GroupRun<'g> {
    fn new(group: &'g Group) -> Self {
        Self {
            group,
            state: GroupState::Pending,
            cases: Vec::with_capacity(group.len()),
        }
    }

    fn state(&self) -> GroupState {
        self.state
    }

    fn transition(&mut self, to: GroupState) {
        tracing::debug!(group = %self.group.id, from = ?self.state, to = ?to, "group transition");
        self.state = to;
    }

    /// Pending → Running; hands out the group's session store
    fn begin(&mut self) -> Result<SessionStore> {
        if self.state != GroupState::Pending {
            return Err(Error::invalid_transition("begin", self.state));
        }
        self.transition(GroupState::Running);
        Ok(SessionStore::new())
    }

    fn record(&mut self, meta: &CaseMeta, outcome: ExecutionOutcome, duration: Duration) -> Result<()> {
        match (self.state, &outcome) {
            (GroupState::Running, ExecutionOutcome::Failed(_)) => {
                self.transition(GroupState::GroupFailed);
            }
            (GroupState::Running, ExecutionOutcome::Passed)
            | (GroupState::GroupFailed, ExecutionOutcome::Blocked) => {}
            (state, outcome) => {
                return Err(Error::invalid_transition(
                    &format!("record {:?} for '{}'", outcome, meta.name),
                    state,
                ));
            }
        }

        self.cases.push(CaseReport {
            name: meta.name.clone(),
            index: meta.index,
            outcome,
            duration,
        });
        Ok(())
    }

    /// Running | GroupFailed → GroupDone; tears the session down
    fn finish(mut self, mut session: SessionStore) -> Result<GroupReport> {
        if !matches!(self.state, GroupState::Running | GroupState::GroupFailed) {
            return Err(Error::invalid_transition("finish", self.state));
        }

        let snapshot = session.snapshot();
        session.teardown();
        self.transition(GroupState::GroupDone);

        Ok(GroupReport {
            id: self.group.id.clone(),
            incremental: self.group.incremental,
            cases: self.cases,
            session: snapshot,
        })
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Runs groups of test cases against one command client
pub struct Controller {
    client: CommandClient,
}

impl Controller {
    pub fn new(client: CommandClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &CommandClient {
        &self.client
    }

    /// Run every case of `group` in order, blocking the rest after a failure
    pub async fn run_group(&self, group: &Group) -> Result<GroupReport> {
        let span = tracing::info_span!("group", id = %group.id);
        async move {
            let mut run = GroupRun::new(group);
            let mut session = run.begin()?;

            for case in group.cases() {
                let meta = case.meta();

                if run.state() == GroupState::GroupFailed {
                    tracing::info!(case = %meta.name, "blocked by earlier failure");
                    run.record(meta, ExecutionOutcome::Blocked, Duration::ZERO)?;
                    continue;
                }

                let started = Instant::now();
                let outcome = self.execute(case.as_ref(), &mut session).await;
                run.record(meta, outcome, started.elapsed())?;
            }

            run.finish(session)
        }
        .instrument(span)
        .await
    }

    /// Run groups one after another
    pub async fn run(&self, groups: &[Group]) -> Result<RunReport> {
        let mut report = RunReport::default();
        for group in groups {
            report.groups.push(self.run_group(group).await?);
        }
        Ok(report)
    }

    async fn execute(&self, case: &dyn TestCase, session: &mut SessionStore) -> ExecutionOutcome {
        let meta = case.meta();
        let span = tracing::info_span!("case", name = %meta.name, index = meta.index);

        let mut ctx = CaseContext {
            client: &self.client,
            session,
        };
        let result = AssertUnwindSafe(case.run(&mut ctx))
            .catch_unwind()
            .instrument(span)
            .await;

        match result {
            Ok(Ok(())) => {
                tracing::info!(case = %meta.name, "passed");
                ExecutionOutcome::Passed
            }
            Ok(Err(e)) => {
                tracing::warn!(case = %meta.name, error = %e, "failed");
                ExecutionOutcome::Failed(e.into())
            }
            Err(payload) => {
                let msg = panic_message(payload);
                tracing::warn!(case = %meta.name, panic = %msg, "panicked");
                ExecutionOutcome::Failed(FailureReason::Panic(msg))
            }
        }
    }
}
