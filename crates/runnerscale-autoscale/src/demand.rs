//! Raw replica demand from a queue snapshot.
//!
//! Two tiers. When no run carries an id the provider gave us nothing to
//! link runs to jobs, so each pending run counts as one runner. As soon as
//! one run has an id, run totals are ignored and only pending jobs this
//! fleet's labels can satisfy are counted, even if that count is zero.

use chrono::{DateTime, Utc};

use runnerscale_core::{AutoscalingPolicy, QueueSnapshot, RunStatus, ScaleTarget};

use crate::labels::matches;

/// Which tier produced a demand figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemandMode {
    /// Queued plus in-progress run totals.
    RunLevel,
    /// Pending jobs matching the fleet's labels.
    JobLevel,
}

/// Counts behind a demand figure, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DemandBreakdown {
    pub queued: u32,
    pub in_progress: u32,
    pub completed: u32,
    /// Pending jobs whose labels this fleet cannot satisfy.
    pub unmatched: u32,
    pub unknown: u32,
}

/// Raw replica demand before the floor, ceiling, and reservations apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Demand {
    pub replicas: u32,
    pub mode: DemandMode,
    pub breakdown: DemandBreakdown,
}

impl Demand {
    /// Whether demand came from label-matched jobs rather than run totals.
    pub fn used_job_level(&self) -> bool {
        self.mode == DemandMode::JobLevel
    }
}

/// Compute raw demand for `target` from `snapshot`.
pub fn compute_demand(target: &ScaleTarget, snapshot: &QueueSnapshot) -> Demand {
    if !snapshot.has_job_linkage() {
        let breakdown = DemandBreakdown {
            queued: snapshot.queued_total,
            in_progress: snapshot.in_progress_total,
            ..DemandBreakdown::default()
        };
        return Demand {
            replicas: snapshot
                .queued_total
                .saturating_add(snapshot.in_progress_total),
            mode: DemandMode::RunLevel,
            breakdown,
        };
    }

    let fleet_labels = target.effective_labels();
    let mut breakdown = DemandBreakdown::default();

    let linked = snapshot
        .runs
        .iter()
        .filter(|run| run.id != 0 && run.status.is_pending());
    for run in linked {
        for job in snapshot.jobs_for(run.id) {
            match job.status {
                RunStatus::Completed => breakdown.completed += 1,
                RunStatus::Other => breakdown.unknown += 1,
                _ if !matches(&job.labels, &fleet_labels) => breakdown.unmatched += 1,
                RunStatus::Queued => breakdown.queued += 1,
                RunStatus::InProgress => breakdown.in_progress += 1,
            }
        }
    }

    Demand {
        replicas: breakdown.queued.saturating_add(breakdown.in_progress),
        mode: DemandMode::JobLevel,
        breakdown,
    }
}

/// Replicas held by capacity reservations that have not yet expired.
pub fn reserved_capacity(now: DateTime<Utc>, policy: &AutoscalingPolicy) -> u32 {
    policy
        .capacity_reservations
        .iter()
        .filter(|r| r.expiration_time > now)
        .fold(0u32, |acc, r| acc.saturating_add(r.replicas))
}
