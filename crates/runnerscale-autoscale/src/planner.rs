//! Replica planner: hysteresis between passes.
//!
//! Scale-out commits immediately. Scale-down waits until the scale-down
//! delay has passed since the last scale-out; the clock is never reset by a
//! scale-down, so a queue oscillating around the floor cannot flap the fleet.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use runnerscale_core::{AutoscalingPolicy, ScaleHistory};

use crate::floor::Floor;

/// What the planner did with the demand it was given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanDecision {
    /// No history yet; the clamped demand was committed.
    Initial,
    ScaleOut { from: u32, to: u32 },
    /// Clamped demand equals the committed count.
    Steady,
    ScaleDown { from: u32, to: u32 },
    /// A scale-down was held back by the cooldown.
    ScaleDownDelayed {
        held: u32,
        wanted: u32,
        until: DateTime<Utc>,
    },
    /// The fleet's fixed replica count was applied.
    Fixed,
}

/// Outcome of planning one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Plan {
    pub replicas: u32,
    /// Record to persist for the next pass.
    pub history: ScaleHistory,
    pub decision: PlanDecision,
}

/// Applies floor, ceiling, and cooldown rules to raw demand.
#[derive(Debug, Clone, Copy)]
pub struct ReplicaPlanner {
    default_scale_down_delay: Duration,
}

impl ReplicaPlanner {
    /// Create a planner whose cooldown defaults to `default_scale_down_delay`.
    pub fn new(default_scale_down_delay: Duration) -> Self {
        Self {
            default_scale_down_delay,
        }
    }

    /// The policy's scale-down delay, or the planner default.
    pub fn scale_down_delay(&self, policy: &AutoscalingPolicy) -> Duration {
        policy
            .scale_down_delay_secs
            .map(Duration::from_secs)
            .unwrap_or(self.default_scale_down_delay)
    }

    /// Plan the replica count for `raw_demand`.
    pub fn plan(
        &self,
        now: DateTime<Utc>,
        policy: &AutoscalingPolicy,
        history: Option<&ScaleHistory>,
        raw_demand: u32,
        floor: &Floor,
    ) -> Plan {
        let clamped = floor.clamp(raw_demand);

        let Some(prev) = history else {
            return Plan {
                replicas: clamped,
                history: ScaleHistory {
                    committed_replicas: clamped,
                    last_scale_out_time: (clamped > 0).then_some(now),
                },
                decision: PlanDecision::Initial,
            };
        };
        let committed = prev.committed_replicas;

        if clamped >= committed {
            let decision = if clamped > committed {
                PlanDecision::ScaleOut {
                    from: committed,
                    to: clamped,
                }
            } else {
                PlanDecision::Steady
            };
            return Plan {
                replicas: clamped,
                history: ScaleHistory {
                    committed_replicas: clamped,
                    last_scale_out_time: Some(now),
                },
                decision,
            };
        }

        let scale_down = Plan {
            replicas: clamped,
            history: ScaleHistory {
                committed_replicas: clamped,
                last_scale_out_time: prev.last_scale_out_time,
            },
            decision: PlanDecision::ScaleDown {
                from: committed,
                to: clamped,
            },
        };

        // A lowered ceiling can force the committed count down; that is
        // not a demand-driven scale-down and is not delayed.
        let held = floor.clamp(committed);
        if held <= clamped {
            return scale_down;
        }

        let Some(last_scale_out) = prev.last_scale_out_time else {
            return scale_down;
        };

        let delay = TimeDelta::from_std(self.scale_down_delay(policy)).unwrap_or(TimeDelta::MAX);
        let until = last_scale_out
            .checked_add_signed(delay)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        if now < until {
            return Plan {
                replicas: held,
                history: ScaleHistory {
                    committed_replicas: held,
                    last_scale_out_time: prev.last_scale_out_time,
                },
                decision: PlanDecision::ScaleDownDelayed {
                    held,
                    wanted: clamped,
                    until,
                },
            };
        }

        scale_down
    }

    /// Apply a fixed replica count, clamped to the floor and ceiling.
    ///
    /// The cooldown does not apply. History is still updated so a later
    /// switch back to demand-driven scaling starts from the right baseline.
    pub fn plan_fixed(
        &self,
        now: DateTime<Utc>,
        history: Option<&ScaleHistory>,
        fixed: u32,
        floor: &Floor,
    ) -> Plan {
        let replicas = floor.clamp(fixed);
        let last_scale_out_time = match history {
            Some(prev) if replicas < prev.committed_replicas => prev.last_scale_out_time,
            _ if replicas == 0 => None,
            _ => Some(now),
        };
        Plan {
            replicas,
            history: ScaleHistory {
                committed_replicas: replicas,
                last_scale_out_time,
            },
            decision: PlanDecision::Fixed,
        }
    }
}
