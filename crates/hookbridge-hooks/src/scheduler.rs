//! Fan-out of matched hook groups into one decision.
//!
//! Any decision other than `continue` (deny, modify or inject context) ends
//! the dispatch. Sequential groups run hooks in list order and stop there.
//! Parallel groups start every hook at once, wait for all of them, then read
//! the results in list order so the first stopping index wins regardless of
//! finish order. Messages from `continue` results accumulate in list order.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use hookbridge_types::{Decision, HookDefinition, HookInvocationResult};
use serde_json::Value;

use crate::executor::{ExecutionContext, HookExecutor, TimeoutPolicy};
use crate::ledger::RunOnceLedger;
use crate::registry::MatcherGroup;
use crate::translator::translate;

/// Slack allowed past a hook's timeout before the scheduler gives up on an
/// executor that does not enforce it.
const EXECUTOR_GRACE: Duration = Duration::from_millis(250);

/// Collects warning messages from `continue` results in order.
#[derive(Debug, Default)]
struct Accumulator {
    messages: Vec<String>,
}

impl Accumulator {
    /// Record a decision. Returns it back if it ends the dispatch.
    fn absorb(&mut self, decision: Decision) -> Option<Decision> {
        match decision {
            Decision::Continue { message } => {
                self.messages.extend(message);
                None
            }
            stop => Some(stop),
        }
    }

    fn finish(self) -> Decision {
        Decision::Continue {
            message: (!self.messages.is_empty()).then(|| self.messages.join("\n")),
        }
    }
}

/// Runs matcher groups through a [`HookExecutor`].
#[derive(Clone)]
pub struct FanOutScheduler {
    executor: Arc<dyn HookExecutor>,
    ledger: Arc<RunOnceLedger>,
    timeouts: TimeoutPolicy,
}

impl FanOutScheduler {
    pub fn new(
        executor: Arc<dyn HookExecutor>,
        ledger: Arc<RunOnceLedger>,
        timeouts: TimeoutPolicy,
    ) -> Self {
        Self {
            executor,
            ledger,
            timeouts,
        }
    }

    pub fn ledger(&self) -> &Arc<RunOnceLedger> {
        &self.ledger
    }

    /// Run one group.
    pub async fn run_group(
        &self,
        group: &MatcherGroup,
        payload: &Value,
        ctx: &ExecutionContext,
    ) -> Decision {
        let mut acc = Accumulator::default();
        match self.run_into(group, payload, ctx, &mut acc).await {
            Some(blocking) => blocking,
            None => acc.finish(),
        }
    }

    /// Run groups in order with the same short-circuit rule across groups.
    pub async fn run_groups(
        &self,
        groups: &[Arc<MatcherGroup>],
        payload: &Value,
        ctx: &ExecutionContext,
    ) -> Decision {
        let mut acc = Accumulator::default();
        for group in groups {
            if let Some(blocking) = self.run_into(group, payload, ctx, &mut acc).await {
                return blocking;
            }
        }
        acc.finish()
    }

    async fn run_into(
        &self,
        group: &MatcherGroup,
        payload: &Value,
        ctx: &ExecutionContext,
        acc: &mut Accumulator,
    ) -> Option<Decision> {
        if group.parallel && group.hooks.len() > 1 {
            let decisions = join_all(
                group
                    .hooks
                    .iter()
                    .map(|hook| self.run_hook(hook, group, payload, ctx)),
            )
            .await;
            decisions.into_iter().find_map(|d| acc.absorb(d))
        } else {
            for hook in &group.hooks {
                let decision = self.run_hook(hook, group, payload, ctx).await;
                if let Some(blocking) = acc.absorb(decision) {
                    return Some(blocking);
                }
            }
            None
        }
    }

    async fn run_hook(
        &self,
        hook: &HookDefinition,
        group: &MatcherGroup,
        payload: &Value,
        ctx: &ExecutionContext,
    ) -> Decision {
        let owner = group.origin.owner.as_str();
        let identity = hook.identity();

        let claim = if hook.once {
            match self.ledger.try_claim(owner, &identity) {
                Some(claim) => Some(claim),
                None => {
                    if self.ledger.has_fired(owner, &identity) {
                        tracing::debug!(owner = %owner, hook = %identity, "run-once hook already fired, skipping");
                    } else {
                        tracing::debug!(owner = %owner, hook = %identity, "run-once hook running elsewhere, skipping");
                    }
                    return Decision::allow();
                }
            }
        } else {
            None
        };

        let timeout = self.timeouts.resolve(hook);
        let hook_ctx = ExecutionContext {
            plugin_root: group.origin.base_dir.clone(),
            timeout,
            ..ctx.clone()
        };

        let started = Instant::now();
        let result = match tokio::time::timeout(
            timeout + EXECUTOR_GRACE,
            self.executor.execute(hook, payload, &hook_ctx),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => HookInvocationResult::timed_out(),
        };

        if let Some(claim) = claim {
            self.ledger.complete(claim, result.ran());
        }

        let decision = translate(&result);
        tracing::debug!(
            owner = %owner,
            hook = %identity,
            exit_code = ?result.exit_code,
            timed_out = result.timed_out,
            action = decision.action(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "hook result"
        );
        if let Some(fault) = &result.exception {
            tracing::warn!(owner = %owner, hook = %identity, error = %fault, "hook failed to run");
        }
        decision
    }
}
