//! Autoscaler: one reconciliation pass per fleet.
//!
//! A pass resolves the floor, fetches the queue for the polled
//! repositories, computes demand, and plans against the fleet's history.
//! Nothing is written until the pass succeeds; a failed pass leaves the
//! history exactly as it was.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use tracing::{debug, info, warn};

use runnerscale_core::{Fleet, FleetKey, MetricSpec, ScaleHistory};
use runnerscale_provider::{WorkflowProvider, fetch_snapshot};

use crate::demand::{Demand, compute_demand, reserved_capacity};
use crate::error::{AutoscaleError, AutoscaleResult};
use crate::floor::{Floor, resolve_floor};
use crate::ledger::HistoryLedger;
use crate::planner::{Plan, PlanDecision, ReplicaPlanner};
use crate::schedule::remaining;

/// Result of one successful pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaleOutcome {
    pub fleet: FleetKey,
    /// Desired replica count for the fleet.
    pub replicas: u32,
    /// Record to persist for the next pass.
    pub history: ScaleHistory,
    /// `None` when the fleet is fixed or has no demand metric.
    pub demand: Option<Demand>,
    /// Replicas added by unexpired capacity reservations.
    pub reserved: u32,
    pub floor: Floor,
    pub decision: PlanDecision,
}

/// Computes desired replica counts for CI runner fleets.
pub struct Autoscaler {
    provider: Arc<dyn WorkflowProvider>,
    planner: ReplicaPlanner,
}

impl Autoscaler {
    /// Create an autoscaler reading queues through `provider`.
    pub fn new(provider: Arc<dyn WorkflowProvider>, planner: ReplicaPlanner) -> Self {
        Self { provider, planner }
    }

    /// Run one pass for `fleet`.
    ///
    /// `history` is the record returned by the previous successful pass, or
    /// `None` for a fleet seen for the first time.
    pub async fn reconcile(
        &self,
        now: DateTime<Utc>,
        fleet: &Fleet,
        history: Option<&ScaleHistory>,
    ) -> AutoscaleResult<ScaleOutcome> {
        let target = &fleet.target;
        let policy = &fleet.policy;
        let floor = resolve_floor(now, policy, target)?;

        if let Some(window) = &floor.overrides.active {
            debug!(
                fleet = %target.key(),
                remaining_secs = remaining(now, window).num_seconds(),
                "min_replicas taken from scheduled override"
            );
        }

        if let Some(fixed) = floor.fixed {
            let plan = self.planner.plan_fixed(now, history, fixed, &floor);
            info!(
                fleet = %target.key(),
                fixed,
                replicas = plan.replicas,
                "fixed replica count applied"
            );
            return Ok(outcome(target.key(), plan, None, 0, floor));
        }

        let demand = match &floor.repositories {
            Some(repos) => {
                let snapshot = fetch_snapshot(self.provider.as_ref(), repos).await?;
                Some(compute_demand(target, &snapshot))
            }
            None => None,
        };

        let reserved = reserved_capacity(now, policy);
        let raw = demand
            .map(|d| d.replicas)
            .unwrap_or(0)
            .saturating_add(reserved);

        let plan = self.planner.plan(now, policy, history, raw, &floor);

        match plan.decision {
            PlanDecision::ScaleDownDelayed { held, wanted, until } => debug!(
                fleet = %target.key(),
                held,
                wanted,
                %until,
                "scale-down delayed"
            ),
            PlanDecision::Steady => debug!(
                fleet = %target.key(),
                replicas = plan.replicas,
                "no change"
            ),
            _ => info!(
                fleet = %target.key(),
                replicas = plan.replicas,
                raw,
                reserved,
                min = floor.min_replicas,
                max = ?floor.max_replicas,
                metric = ?policy.primary_metric().map(MetricSpec::name),
                job_level = demand.is_some_and(|d| d.used_job_level()),
                decision = ?plan.decision,
                "desired replicas computed"
            ),
        }

        Ok(outcome(target.key(), plan, demand, reserved, floor))
    }

    /// Run a pass for every fleet concurrently.
    ///
    /// History is loaded from and stored back to `ledger`. A failing fleet
    /// is logged and reported; its history stays as it was and the other
    /// fleets are unaffected. A fleet whose key repeats an earlier one in
    /// `fleets` fails validation without running, so each ledger record has
    /// a single writer per call.
    pub async fn reconcile_all(
        &self,
        now: DateTime<Utc>,
        fleets: &[Fleet],
        ledger: &HistoryLedger,
    ) -> Vec<(FleetKey, AutoscaleResult<ScaleOutcome>)> {
        let mut seen = HashSet::new();
        let duplicates: Vec<bool> = fleets
            .iter()
            .map(|fleet| !seen.insert(fleet.target.key()))
            .collect();

        let passes = fleets.iter().zip(duplicates).map(|(fleet, duplicate)| async move {
            let key = fleet.target.key().to_string();
            if duplicate {
                let err = AutoscaleError::Validation(format!(
                    "validating fleets: duplicate fleet key {key:?}"
                ));
                warn!(fleet = %key, error = %err, "reconcile skipped");
                return (key, Err(err));
            }

            let history = ledger.load(&key).await;
            let result = self.reconcile(now, fleet, history.as_ref()).await;

            match &result {
                Ok(outcome) => ledger.store(&key, outcome.history).await,
                Err(e) => warn!(
                    fleet = %key,
                    error = %e,
                    retriable = e.is_retriable(),
                    "reconcile failed"
                ),
            }
            (key, result)
        });

        join_all(passes).await
    }
}

fn outcome(
    fleet: &str,
    plan: Plan,
    demand: Option<Demand>,
    reserved: u32,
    floor: Floor,
) -> ScaleOutcome {
    ScaleOutcome {
        fleet: fleet.to_string(),
        replicas: plan.replicas,
        history: plan.history,
        demand,
        reserved,
        floor,
        decision: plan.decision,
    }
}
