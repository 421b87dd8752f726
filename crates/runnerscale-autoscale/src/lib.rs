//! runnerscale-autoscale: decides how many CI runner replicas a fleet needs.
//!
//! One pass per fleet: resolve the floor, fetch the queue, compute demand,
//! plan against the fleet's history. The caller persists the returned
//! `ScaleHistory` and feeds it back on the next pass.
//!
//! # Scaling Algorithm
//!
//! ```text
//! floor    = resolve_floor(policy, target)        // min, max, fixed
//! if fixed: replicas = clamp(fixed, min, max)     // no queue lookup
//!
//! demand   = every run id == 0
//!              ? queued_total + in_progress_total            // run level
//!              : count(pending jobs whose labels ⊆ fleet)    // job level
//! clamped  = clamp(demand + reserved, min, max)
//!
//! if no history or clamped >= committed:
//!     commit clamped, last_scale_out = now        // scale out immediately
//! elif now - last_scale_out < scale_down_delay:
//!     keep committed                              // cooldown
//! else:
//!     commit clamped
//! ```

pub mod autoscaler;
pub mod demand;
pub mod error;
pub mod floor;
pub mod labels;
pub mod ledger;
pub mod planner;
pub mod schedule;

pub use autoscaler::{Autoscaler, ScaleOutcome};
pub use demand::{Demand, DemandBreakdown, DemandMode, compute_demand, reserved_capacity};
pub use error::{AutoscaleError, AutoscaleResult};
pub use floor::{Floor, resolve_floor};
pub use labels::matches;
pub use ledger::HistoryLedger;
pub use planner::{Plan, PlanDecision, ReplicaPlanner};
pub use schedule::{OverrideMatch, OverrideWindow, match_overrides};
